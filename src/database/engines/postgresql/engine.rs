//! PostgreSQL Database Engine Implementation

use crate::config::DatabaseConfig;
use crate::database::{
    engine::{DatabaseConnection, DatabaseEngine},
    schema::COMMON_TYPES,
    types::{DatabaseFeature, DatabaseType},
};
use crate::error::DatabaseError;
use async_trait::async_trait;

use super::PostgreSqlConnection;

const POSTGRESQL_TYPES: &[&str] = &[
    "SERIAL",
    "BIGSERIAL",
    "SMALLSERIAL",
    "BYTEA",
    "JSON",
    "JSONB",
    "UUID",
    "TIMESTAMPTZ",
    "INTERVAL",
];

/// Protocol limit: the Bind message carries an i16 parameter count
const POSTGRESQL_MAX_PARAMS: usize = 65535;

/// PostgreSQL Database Engine
#[derive(Clone, Default)]
pub struct PostgreSqlEngine;

impl PostgreSqlEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseEngine for PostgreSqlEngine {
    fn engine_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn DatabaseConnection>, DatabaseError> {
        self.validate_config(config)?;
        let connection = PostgreSqlConnection::new(config.clone()).await?;
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
        if config.database_type != DatabaseType::PostgreSQL {
            return Err(DatabaseError::ConfigurationError(format!(
                "PostgreSQL engine cannot serve a {} configuration",
                config.database_type
            )));
        }
        config.validate()
    }

    fn supported_types(&self) -> Vec<&'static str> {
        COMMON_TYPES.iter().chain(POSTGRESQL_TYPES).copied().collect()
    }

    fn max_bind_params(&self) -> usize {
        POSTGRESQL_MAX_PARAMS
    }
}
