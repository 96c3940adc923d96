//! Database Engine Abstraction Layer
//!
//! One `DatabaseEngine` per backend describes its dialect and opens sessions;
//! a `DatabaseConnection` is the single session a facade owns.

use super::types::{
    ColumnInfo, ConnectionInfo, DatabaseFeature, DatabaseType, ExecuteResult, QueryResult, Value,
};
use crate::config::DatabaseConfig;
use crate::error::DatabaseError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Database engine abstraction trait
///
/// Dialect knowledge lives here so the facade never branches on the backend kind.
#[async_trait]
pub trait DatabaseEngine: Send + Sync {
    /// Backend kind handled by this engine
    fn engine_type(&self) -> DatabaseType;

    /// Open a new session
    async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn DatabaseConnection>, DatabaseError>;

    /// Optional capabilities
    fn supported_features(&self) -> Vec<DatabaseFeature>;

    /// Engine-specific configuration checks
    fn validate_config(&self, config: &DatabaseConfig) -> Result<(), DatabaseError>;

    /// Allow-list of primitive column types accepted by `create_table`
    fn supported_types(&self) -> Vec<&'static str>;

    /// Upper bound on bind parameters in a single statement
    fn max_bind_params(&self) -> usize;

    fn drop_index_sql(&self, index_name: &str, _table_name: &str) -> String {
        format!("DROP INDEX IF EXISTS {}", index_name)
    }
}

/// Single database session
///
/// Every method needs `&mut self`: the session is owned by exactly one facade
/// and is never shared without external locking.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Run a statement that returns rows
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError>;

    /// Run INSERT/UPDATE/DELETE/DDL
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError>;

    async fn begin_transaction(&mut self) -> Result<(), DatabaseError>;

    async fn commit(&mut self) -> Result<(), DatabaseError>;

    async fn rollback(&mut self) -> Result<(), DatabaseError>;

    /// Base tables visible in the current database/schema
    async fn list_tables(&mut self) -> Result<Vec<String>, DatabaseError>;

    /// Columns of `table_name` in declaration order (empty when the table is unknown)
    async fn table_columns(&mut self, table_name: &str) -> Result<Vec<ColumnInfo>, DatabaseError>;

    /// Write a backend-native backup to `path`
    async fn backup(&mut self, path: &Path) -> Result<(), DatabaseError>;

    /// Replace the database contents from a backup made by `backup`
    async fn restore(&mut self, path: &Path) -> Result<(), DatabaseError>;

    async fn ping(&mut self) -> Result<(), DatabaseError>;

    /// Close the session
    async fn close(self: Box<Self>) -> Result<(), DatabaseError>;

    fn connection_info(&self) -> ConnectionInfo;
}

/// Database engine builder
///
/// Builds the engine for the backend named in the configuration
pub struct DatabaseEngineBuilder;

impl DatabaseEngineBuilder {
    pub fn build(config: &DatabaseConfig) -> Result<Arc<dyn DatabaseEngine>, DatabaseError> {
        match config.database_type {
            DatabaseType::SQLite => Ok(Arc::new(super::engines::sqlite::SqliteEngine::new())),
            DatabaseType::PostgreSQL => Ok(Arc::new(
                super::engines::postgresql::PostgreSqlEngine::new(),
            )),
            #[cfg(feature = "mysql-backend")]
            DatabaseType::MariaDB => Ok(Arc::new(super::engines::mariadb::MariaDbEngine::new())),
            #[cfg(not(feature = "mysql-backend"))]
            DatabaseType::MariaDB => Err(DatabaseError::UnsupportedOperation(
                "MariaDB support not compiled. Enable mysql-backend feature.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_selects_engine() {
        let engine = DatabaseEngineBuilder::build(&DatabaseConfig::sqlite_memory()).unwrap();
        assert_eq!(engine.engine_type(), DatabaseType::SQLite);

        let pg = DatabaseConfig::postgresql("localhost", 5432, "app", "user", "pw");
        let engine = DatabaseEngineBuilder::build(&pg).unwrap();
        assert_eq!(engine.engine_type(), DatabaseType::PostgreSQL);
    }

    #[cfg(feature = "mysql-backend")]
    #[test]
    fn test_builder_mariadb() {
        let config = DatabaseConfig::mariadb("localhost", 3306, "app", "user", "pw");
        let engine = DatabaseEngineBuilder::build(&config).unwrap();
        assert_eq!(engine.engine_type(), DatabaseType::MariaDB);
        assert_eq!(
            engine.drop_index_sql("idx_name", "users"),
            "DROP INDEX IF EXISTS idx_name ON users"
        );
    }

    #[test]
    fn test_default_drop_index_sql() {
        let engine = DatabaseEngineBuilder::build(&DatabaseConfig::sqlite_memory()).unwrap();
        assert_eq!(
            engine.drop_index_sql("idx_name", "users"),
            "DROP INDEX IF EXISTS idx_name"
        );
    }
}
