//! SQLite Connection Implementation
//!
//! Single sqlx session to a database file (or a private in-memory database)

use crate::config::DatabaseConfig;
use crate::database::{
    engine::DatabaseConnection,
    types::{
        parse_timestamp, ColumnInfo, ConnectionInfo, DatabaseType, ExecuteResult, QueryResult,
        Value, SQL_DATETIME_FORMAT,
    },
};
use crate::error::DatabaseError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, Sqlite, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

type SqlxConnection = sqlx::sqlite::SqliteConnection;
type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

const MEMORY_PATH: &str = ":memory:";

/// SQLite Connection
pub struct SqliteConnection {
    conn: Option<SqlxConnection>,
    options: SqliteConnectOptions,
    path: String,
    info: ConnectionInfo,
}

impl SqliteConnection {
    /// Open the database named by `config.connection.path`, creating the file if missing
    pub async fn new(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let path = config
            .connection
            .path
            .clone()
            .unwrap_or_else(|| MEMORY_PATH.to_string());
        let options = Self::build_options(&path, config.connection.connect_timeout_seconds)?;

        let conn = options
            .connect()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(path = %path, "Opened SQLite database");

        Ok(Self {
            conn: Some(conn),
            options,
            info: ConnectionInfo {
                connection_id: uuid::Uuid::new_v4().to_string(),
                database_type: DatabaseType::SQLite,
                database_name: path.clone(),
                user_name: String::new(),
                connected_at: Utc::now(),
            },
            path,
        })
    }

    fn build_options(path: &str, timeout_seconds: u64) -> Result<SqliteConnectOptions, DatabaseError> {
        let options = if path == MEMORY_PATH {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DatabaseError::ConfigurationError(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        Ok(options.busy_timeout(Duration::from_secs(timeout_seconds)))
    }

    fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    fn conn(&mut self) -> Result<&mut SqlxConnection, DatabaseError> {
        self.conn
            .as_mut()
            .ok_or_else(|| DatabaseError::ConnectionFailed("SQLite connection is closed".to_string()))
    }

    fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q [Value]) -> SqliteQuery<'q> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b as i64),
                Value::Int(i) => query.bind(*i),
                Value::Float(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Binary(b) => query.bind(b.as_slice()),
                Value::DateTime(dt) => query.bind(dt.format(SQL_DATETIME_FORMAT).to_string()),
                Value::Json(j) => query.bind(j.to_string()),
            };
        }
        query
    }

    /// Convert sqlx rows to QueryResult
    fn rows_to_query_result(
        rows: Vec<SqliteRow>,
        execution_time_ms: u64,
    ) -> Result<QueryResult, DatabaseError> {
        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo {
                        name: col.name().to_string(),
                        data_type: col.type_info().name().to_string(),
                        nullable: true,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|idx| Self::extract_value(row, idx))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    /// Extract value from SQLite row
    ///
    /// The storage class of the value picks the variant. Table columns
    /// declared BOOLEAN or DATETIME/TIMESTAMP map their integers and text
    /// back to `Bool` and `DateTime`; expressions carry no declared type.
    fn extract_value(row: &SqliteRow, idx: usize) -> Result<Value, DatabaseError> {
        let value_ref = row.try_get_raw(idx).map_err(|e| {
            DatabaseError::QueryFailed(format!("Failed to get value at index {}: {}", idx, e))
        })?;

        if value_ref.is_null() {
            return Ok(Value::Null);
        }

        let storage = value_ref.type_info().name().to_string();
        let declared = row.columns()[idx].type_info().name();

        let value = match (storage.as_str(), declared) {
            ("INTEGER", "BOOLEAN") => row.try_get_unchecked::<i64, _>(idx).map(|v| Value::Bool(v != 0)),
            ("TEXT", "DATETIME") => row.try_get_unchecked::<String, _>(idx).map(|s| {
                parse_timestamp(&s)
                    .map(Value::DateTime)
                    .unwrap_or(Value::String(s))
            }),
            ("INTEGER" | "BOOLEAN", _) => row.try_get_unchecked::<i64, _>(idx).map(Value::Int),
            ("REAL" | "NUMERIC", _) => row.try_get_unchecked::<f64, _>(idx).map(Value::Float),
            ("BLOB", _) => row.try_get_unchecked::<Vec<u8>, _>(idx).map(Value::Binary),
            _ => row.try_get_unchecked::<String, _>(idx).map(Value::String),
        };

        value.map_err(|e| {
            DatabaseError::QueryFailed(format!("Failed to decode {} at index {}: {}", storage, idx, e))
        })
    }

    async fn run_raw(&mut self, sql: &str) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    fn sql_literal(path: &Path) -> Result<String, DatabaseError> {
        let path = path.to_str().ok_or_else(|| {
            DatabaseError::BackupFailed(format!("Path is not valid UTF-8: {}", path.display()))
        })?;
        Ok(format!("'{}'", path.replace('\'', "''")))
    }

    async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn sidecar(path: &str, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", path, suffix))
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        let start = std::time::Instant::now();
        let conn = self.conn()?;

        let rows = Self::bind_params(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Self::rows_to_query_result(rows, start.elapsed().as_millis() as u64)
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        let start = std::time::Instant::now();
        let conn = self.conn()?;

        let result = Self::bind_params(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let last_insert_id = Some(result.last_insert_rowid()).filter(|id| *id != 0);

        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
            last_insert_id,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn begin_transaction(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("BEGIN").await
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
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
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
        let (schema, table) = table_name.split_once('.').unwrap_or(("main", table_name));
        let conn = self.conn()?;

        let rows = sqlx::query(
            "SELECT name, type, \"notnull\" FROM pragma_table_info(?1, ?2) ORDER BY cid",
        )
        .bind(table)
        .bind(schema)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get(0)
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
                let data_type: String = row.try_get(1).unwrap_or_default();
                let not_null: i64 = row.try_get(2).unwrap_or(0);
                Ok(ColumnInfo {
                    name,
                    data_type,
                    nullable: not_null == 0,
                })
            })
            .collect()
    }

    async fn backup(&mut self, path: &Path) -> Result<(), DatabaseError> {
        let target = Self::sql_literal(path)?;
        Self::remove_if_exists(path)
            .await
            .map_err(|e| DatabaseError::BackupFailed(format!("{}: {}", path.display(), e)))?;

        let conn = self.conn()?;
        sqlx::query(&format!("VACUUM INTO {}", target))
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::BackupFailed(e.to_string()))?;

        debug!(target = %path.display(), "SQLite database copied");
        Ok(())
    }

    async fn restore(&mut self, path: &Path) -> Result<(), DatabaseError> {
        if self.is_memory() {
            return Err(DatabaseError::BackupFailed(
                "An in-memory database cannot be restored from a file".to_string(),
            ));
        }

        tokio::fs::metadata(path)
            .await
            .map_err(|e| DatabaseError::BackupFailed(format!("{}: {}", path.display(), e)))?;

        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| DatabaseError::BackupFailed(e.to_string()))?;
        }

        let copied = async {
            tokio::fs::copy(path, &self.path).await?;
            Self::remove_if_exists(&Self::sidecar(&self.path, "-wal")).await?;
            Self::remove_if_exists(&Self::sidecar(&self.path, "-shm")).await
        }
        .await;

        // Reopen even when the copy failed so the session stays usable.
        let conn = self
            .options
            .connect()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        self.conn = Some(conn);

        copied.map_err(|e| DatabaseError::BackupFailed(format!("{}: {}", path.display(), e)))
    }

    async fn ping(&mut self) -> Result<(), DatabaseError> {
        self.conn()?
            .ping()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), DatabaseError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn connection_info(&self) -> ConnectionInfo {
        self.info.clone()
    }
}
