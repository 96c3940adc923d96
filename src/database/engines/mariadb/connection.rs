//! MariaDB Database Connection
//!
//! Single `mysql_async` session. Queries use the binary protocol so numeric
//! and temporal columns come back typed.

use crate::config::DatabaseConfig;
use crate::database::{
    engine::DatabaseConnection,
    types::{ColumnInfo, ConnectionInfo, DatabaseType, ExecuteResult, QueryResult, Value},
};
use crate::error::DatabaseError;
use async_trait::async_trait;
use chrono::Utc;
use mysql_async::{prelude::*, Conn, OptsBuilder};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::MariaDbParamConverter;
use crate::database::engines::dump::ToolInvocation;

/// MariaDB Database Connection
pub struct MariaDbConnection {
    conn: Option<Conn>,
    config: DatabaseConfig,
    info: ConnectionInfo,
}

impl MariaDbConnection {
    /// Connect with the parameters in `config.connection`
    pub async fn new(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let c = &config.connection;
        let opts = OptsBuilder::default()
            .ip_or_hostname(c.host.clone())
            .tcp_port(c.port)
            .db_name(Some(c.database.clone()))
            .user(Some(c.username.clone()))
            .pass(Some(c.password.clone()));

        let conn = tokio::time::timeout(
            Duration::from_secs(c.connect_timeout_seconds),
            Conn::new(opts),
        )
        .await
        .map_err(|_| {
            DatabaseError::ConnectionFailed(format!(
                "Timed out connecting to {}:{}",
                c.host, c.port
            ))
        })?
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(host = %c.host, port = c.port, database = %c.database, "Connected to MariaDB");

        let info = ConnectionInfo {
            connection_id: conn.id().to_string(),
            database_type: DatabaseType::MariaDB,
            database_name: c.database.clone(),
            user_name: c.username.clone(),
            connected_at: Utc::now(),
        };

        Ok(Self {
            conn: Some(conn),
            config,
            info,
        })
    }

    fn conn(&mut self) -> Result<&mut Conn, DatabaseError> {
        self.conn.as_mut().ok_or_else(|| {
            DatabaseError::ConnectionFailed("MariaDB connection is closed".to_string())
        })
    }

    async fn run_raw(&mut self, sql: &str) -> Result<(), DatabaseError> {
        self.conn()?
            .query_drop(sql)
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    fn path_arg(path: &Path) -> Result<String, DatabaseError> {
        path.to_str().map(String::from).ok_or_else(|| {
            DatabaseError::BackupFailed(format!("Path is not valid UTF-8: {}", path.display()))
        })
    }

    /// Connection arguments shared by the dump and client programs
    fn tool(&self, override_program: Option<&str>, defaults: &[&str]) -> ToolInvocation {
        let c = &self.config.connection;
        ToolInvocation::new(override_program, defaults)
            .arg("-h")
            .arg(c.host.as_str())
            .arg("-P")
            .arg(c.port.to_string())
            .arg("-u")
            .arg(c.username.as_str())
            .env("MYSQL_PWD", c.password.as_str())
    }
}

#[async_trait]
impl DatabaseConnection for MariaDbConnection {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        let start = std::time::Instant::now();
        debug!(params = %MariaDbParamConverter::create_param_summary(params), "MariaDB query");
        let mysql_params = MariaDbParamConverter::convert_params(params);

        let result: Vec<mysql_async::Row> = self
            .conn()?
            .exec(sql, mysql_params)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let columns = result
            .first()
            .map(|first_row| {
                first_row
                    .columns_ref()
                    .iter()
                    .map(|col| ColumnInfo {
                        name: col.name_str().to_string(),
                        data_type: format!("{:?}", col.column_type()),
                        nullable: !col
                            .flags()
                            .contains(mysql_async::consts::ColumnFlags::NOT_NULL_FLAG),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows = result
            .into_iter()
            .map(|row| {
                let meta = row.columns();
                let values: Vec<mysql_async::Value> = row.unwrap();
                values
                    .into_iter()
                    .enumerate()
                    .map(|(idx, value)| {
                        MariaDbParamConverter::convert_from_mysql_value(value, meta.get(idx))
                    })
                    .collect()
            })
            .collect();

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        let start = std::time::Instant::now();
        debug!(params = %MariaDbParamConverter::create_param_summary(params), "MariaDB execute");
        let conn = self.conn()?;

        // Some DDL cannot be prepared, so parameterless statements use the text protocol
        let outcome = if params.is_empty() {
            conn.query_drop(sql).await
        } else {
            conn.exec_drop(sql, MariaDbParamConverter::convert_params(params))
                .await
        };
        outcome.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(ExecuteResult {
            rows_affected: conn.affected_rows(),
            last_insert_id: conn
                .last_insert_id()
                .filter(|id| *id != 0)
                .map(|id| id as i64),
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn begin_transaction(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("ROLLBACK").await
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, DatabaseError> {
        let result = self
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                &[],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str).map(String::from))
            .collect())
    }

    async fn table_columns(&mut self, table_name: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let (schema, table) = match table_name.split_once('.') {
            Some((schema, table)) => (Value::from(schema), table),
            None => (Value::Null, table_name),
        };

        let result = self
            .query(
                "SELECT column_name, data_type, is_nullable FROM information_schema.columns \
                 WHERE table_schema = COALESCE(?, DATABASE()) AND table_name = ? \
                 ORDER BY ordinal_position",
                &[schema, Value::from(table)],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.first().and_then(Value::as_str)?;
                Some(ColumnInfo {
                    name: name.to_string(),
                    data_type: row
                        .get(1)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    nullable: row.get(2).and_then(Value::as_str) != Some("NO"),
                })
            })
            .collect())
    }

    async fn backup(&mut self, path: &Path) -> Result<(), DatabaseError> {
        let output = Self::path_arg(path)?;
        self.tool(
            self.config.backup.dump_command.as_deref(),
            &["mariadb-dump", "mysqldump"],
        )
        .arg("--single-transaction")
        .arg("--routines")
        .arg("--add-drop-table")
        .arg(format!("--result-file={}", output))
        .arg(self.config.connection.database.as_str())
        .run()
        .await?;

        debug!(target = %path.display(), "MariaDB dump finished");
        Ok(())
    }

    async fn restore(&mut self, path: &Path) -> Result<(), DatabaseError> {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| DatabaseError::BackupFailed(format!("{}: {}", path.display(), e)))?;

        self.tool(
            self.config.backup.restore_command.as_deref(),
            &["mariadb", "mysql"],
        )
        .arg(self.config.connection.database.as_str())
        .stdin_from(path)
        .run()
        .await?;

        debug!(source = %path.display(), "MariaDB restore finished");
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), DatabaseError> {
        self.conn()?
            .ping()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), DatabaseError> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect()
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn connection_info(&self) -> ConnectionInfo {
        self.info.clone()
    }
}
