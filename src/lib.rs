//! # db-facade
//!
//! One helper API over SQLite, PostgreSQL and MariaDB.
//!
//! [`DatabaseClient`] owns a single connection to the configured backend and
//! offers schema management, parameterized CRUD, explicit transactions,
//! user/permission bookkeeping in application tables, backup and restore,
//! CSV import/export and an audit log. Callers always write `?` placeholders;
//! the backend engine translates them where its dialect differs.
//!
//! ```no_run
//! use db_facade::{DatabaseClient, DatabaseConfig, Value};
//!
//! # async fn run() -> db_facade::Result<()> {
//! let mut client = DatabaseClient::connect(&DatabaseConfig::sqlite("app.db")).await?;
//! client
//!     .create_table("items", &[("id", "INT PRIMARY KEY"), ("name", "TEXT")])
//!     .await?;
//! client
//!     .insert("items", &["id", "name"], &[Value::Int(1), Value::from("apple")])
//!     .await?;
//! let rows = client.fetch("items", &["name"], Some("id = ?"), &[Value::Int(1)]).await?;
//! assert_eq!(rows[0][0], Value::from("apple"));
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod password;

pub use client::{AuditEntry, DatabaseClient};
pub use config::{BackupConfig, ConfigLoader, ConnectionConfig, DatabaseConfig};
pub use database::{
    ColumnDef, ColumnInfo, ConnectionInfo, DatabaseFeature, DatabaseType, ExecuteResult, Row,
    TableSchema, Value,
};
pub use error::{DatabaseError, Result};
pub use logging::{init_logging, LogConfig, LogFormat, LogRotation};
pub use password::PasswordScheme;
