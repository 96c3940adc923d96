//! Database Module
//!
//! Engine abstraction, per-backend engines and the SQL helpers the facade uses

pub mod engine;
pub mod engines;
pub mod query_builder;
pub mod schema;
pub mod types;

pub use engine::{DatabaseConnection, DatabaseEngine, DatabaseEngineBuilder};
pub use schema::{ColumnDef, TableSchema};
pub use types::{
    ColumnInfo, ConnectionInfo, DatabaseFeature, DatabaseType, ExecuteResult, QueryResult, Row,
    Value,
};
