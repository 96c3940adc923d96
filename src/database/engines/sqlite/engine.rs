//! SQLite Database Engine Implementation

use crate::config::DatabaseConfig;
use crate::database::{
    engine::{DatabaseConnection, DatabaseEngine},
    schema::COMMON_TYPES,
    types::{DatabaseFeature, DatabaseType},
};
use crate::error::DatabaseError;
use async_trait::async_trait;

use super::SqliteConnection;

/// Types accepted on top of the common set
const SQLITE_TYPES: &[&str] = &[
    "BLOB",
    "DATETIME",
    "TINYINT",
    "MEDIUMINT",
    "NVARCHAR",
    "CLOB",
];

/// Compile-time default of SQLITE_MAX_VARIABLE_NUMBER before 3.32
const SQLITE_MAX_VARIABLES: usize = 999;

/// SQLite Database Engine
#[derive(Clone, Default)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseEngine for SqliteEngine {
    fn engine_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn DatabaseConnection>, DatabaseError> {
        self.validate_config(config)?;
        let connection = SqliteConnection::new(config.clone()).await?;
        Ok(Box::new(connection))
    }

    fn supported_features(&self) -> Vec<DatabaseFeature> {
        vec![
            DatabaseFeature::Transactions,
            DatabaseFeature::PreparedStatements,
            DatabaseFeature::MultiRowInsert,
            DatabaseFeature::FileCopyBackup,
        ]
    }

    fn validate_config(&self, config: &DatabaseConfig) -> Result<(), DatabaseError> {
        if config.database_type != DatabaseType::SQLite {
            return Err(DatabaseError::ConfigurationError(format!(
                "SQLite engine cannot serve a {} configuration",
                config.database_type
            )));
        }
        config.validate()
    }

    fn supported_types(&self) -> Vec<&'static str> {
        COMMON_TYPES.iter().chain(SQLITE_TYPES).copied().collect()
    }

    fn max_bind_params(&self) -> usize {
        SQLITE_MAX_VARIABLES
    }
}
