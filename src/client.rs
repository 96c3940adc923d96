//! Database facade
//!
//! [`DatabaseClient`] owns exactly one backend session and exposes the helper
//! surface (schema, CRUD, users, backup, CSV, audit). Operations are split
//! across the submodules by concern; this file holds the lifecycle,
//! transaction control and the raw statement entry points they share.

mod audit;
mod backup;
mod csv_io;
mod data;
mod introspection;
mod schema;
mod users;

pub use audit::AuditEntry;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::database::{
    query_builder::placeholder_count, ConnectionInfo, DatabaseConnection, DatabaseEngine,
    DatabaseEngineBuilder, DatabaseFeature, DatabaseType, ExecuteResult, QueryResult, Row, Value,
};
use crate::error::{DatabaseError, Result};

/// Unified helper facade over a single database session
///
/// Every operation takes `&mut self`; share a client between tasks only
/// behind a lock such as `tokio::sync::Mutex`.
pub struct DatabaseClient {
    engine: Arc<dyn DatabaseEngine>,
    connection: Option<Box<dyn DatabaseConnection>>,
    config: DatabaseConfig,
    in_transaction: bool,
}

impl std::fmt::Debug for DatabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseClient")
            .field("database_type", &self.config.database_type)
            .field("connected", &self.connection.is_some())
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

impl DatabaseClient {
    /// Validate `config` and open a session to the backend it names.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let engine = DatabaseEngineBuilder::build(config)?;
        let connection = engine.connect(config).await?;

        info!(
            database_type = %config.database_type,
            connection_id = %connection.connection_info().connection_id,
            "Database client connected"
        );

        Ok(Self {
            engine,
            connection: Some(connection),
            config: config.clone(),
            in_transaction: false,
        })
    }

    /// Close the session. An open transaction is discarded by the backend.
    pub async fn close(mut self) -> Result<()> {
        if self.in_transaction {
            warn!("Closing database client with an open transaction");
            self.in_transaction = false;
        }
        if let Some(connection) = self.connection.take() {
            connection.close().await?;
            info!(database_type = %self.config.database_type, "Database client closed");
        }
        Ok(())
    }

    pub fn database_type(&self) -> DatabaseType {
        self.engine.engine_type()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn supported_features(&self) -> Vec<DatabaseFeature> {
        self.engine.supported_features()
    }

    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection.as_ref().map(|c| c.connection_info())
    }

    /// Whether `begin_transaction` was called without a matching commit/rollback
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.conn()?.ping().await
    }

    pub async fn begin_transaction(&mut self) -> Result<()> {
        debug!("BEGIN");
        self.conn()?.begin_transaction().await?;
        self.in_transaction = true;
        Ok(())
    }

    pub async fn commit_transaction(&mut self) -> Result<()> {
        debug!("COMMIT");
        let result = self.conn()?.commit().await;
        self.in_transaction = false;
        result
    }

    pub async fn rollback_transaction(&mut self) -> Result<()> {
        debug!("ROLLBACK");
        let result = self.conn()?.rollback().await;
        self.in_transaction = false;
        result
    }

    /// Run a raw parameterized command (`?` placeholders on every backend)
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult> {
        self.check_params(sql, params)?;
        debug!(sql = %sql, params = params.len(), "execute");
        self.conn()?.execute(sql, params).await
    }

    /// Run a raw parameterized query and return its rows
    pub async fn execute_query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        Ok(self.query(sql, params).await?.rows)
    }

    /// Like [`execute_query`](Self::execute_query) but keeps column metadata
    pub async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.check_params(sql, params)?;
        debug!(sql = %sql, params = params.len(), "query");
        self.conn()?.query(sql, params).await
    }

    /// DDL goes through here so backend rejections surface as schema errors
    async fn execute_ddl(&mut self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "ddl");
        self.conn()?
            .execute(sql, &[])
            .await
            .map(|_| ())
            .map_err(DatabaseError::into_schema_error)
    }

    fn conn(&mut self) -> Result<&mut Box<dyn DatabaseConnection>> {
        self.connection
            .as_mut()
            .ok_or_else(|| DatabaseError::ConnectionFailed("Database client is closed".to_string()))
    }

    fn check_params(&self, sql: &str, params: &[Value]) -> Result<()> {
        let expected = placeholder_count(sql, self.database_type());
        if expected != params.len() {
            return Err(DatabaseError::ValidationError(format!(
                "Parameter count mismatch: expected {}, provided {}",
                expected,
                params.len()
            )));
        }
        Ok(())
    }
}

impl Drop for DatabaseClient {
    fn drop(&mut self) {
        if self.in_transaction && self.connection.is_some() {
            warn!("Database client dropped with an open transaction; the backend will discard it");
        }
    }
}
