//! MariaDB Database Engine Implementation

use crate::config::DatabaseConfig;
use crate::database::{
    engine::{DatabaseConnection, DatabaseEngine},
    schema::COMMON_TYPES,
    types::{DatabaseFeature, DatabaseType},
};
use crate::error::DatabaseError;
use async_trait::async_trait;

use super::MariaDbConnection;

const MARIADB_TYPES: &[&str] = &[
    "TINYINT",
    "MEDIUMINT",
    "DATETIME",
    "BLOB",
    "TINYBLOB",
    "MEDIUMBLOB",
    "LONGBLOB",
    "TINYTEXT",
    "MEDIUMTEXT",
    "LONGTEXT",
    "JSON",
    "ENUM",
    "SET",
    "YEAR",
    "BINARY",
    "VARBINARY",
];

/// Prepared statements carry a u16 parameter count
const MARIADB_MAX_PARAMS: usize = 65535;

/// MariaDB Database Engine
#[derive(Clone, Default)]
pub struct MariaDbEngine;

impl MariaDbEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseEngine for MariaDbEngine {
    fn engine_type(&self) -> DatabaseType {
        DatabaseType::MariaDB
    }

    async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn DatabaseConnection>, DatabaseError> {
        self.validate_config(config)?;
        let connection = MariaDbConnection::new(config.clone()).await?;
        Ok(Box::new(connection))
    }

    fn supported_features(&self) -> Vec<DatabaseFeature> {
        vec![
            DatabaseFeature::Transactions,
            DatabaseFeature::PreparedStatements,
            DatabaseFeature::MultiRowInsert,
            DatabaseFeature::JsonSupport,
            DatabaseFeature::NativeDump,
        ]
    }

    fn validate_config(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        if config.database_type != DatabaseType::MariaDB {
            return Err(DatabaseError::ConfigurationError(format!(
                "MariaDB engine cannot serve a {} configuration",
                config.database_type
            )));
        }
        config.validate()
    }

    fn supported_types(&self) -> Vec<&'static str> {
        COMMON_TYPES.iter().chain(MARIADB_TYPES).copied().collect()
    }

    fn max_bind_params(&self) -> usize {
        MARIADB_MAX_PARAMS
    }

    /// Indexes are scoped to their table on this backend
    fn drop_index_sql(&self, index_name: &str, table_name: &str) -> String {
        format!("DROP INDEX IF EXISTS {} ON {}", index_name, table_name)
    }
}
