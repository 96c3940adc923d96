//! Database Engines Module
//!
//! SQLite and PostgreSQL run on sqlx; MariaDB uses mysql_async

pub(crate) mod dump;
#[cfg(feature = "mysql-backend")]
pub mod mariadb;
pub mod postgresql;
pub mod sqlite;

#[cfg(feature = "mysql-backend")]
pub use mariadb::MariaDbEngine;
pub use postgresql::PostgreSqlEngine;
pub use sqlite::SqliteEngine;
