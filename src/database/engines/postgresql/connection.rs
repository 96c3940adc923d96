//! PostgreSQL Database Connection Implementation
//!
//! Provides PostgreSQL connectivity using a single sqlx connection

use crate::config::DatabaseConfig;
use crate::database::{
    engine::DatabaseConnection,
    query_builder::placeholder_positions,
    types::{ColumnInfo, ConnectionInfo, DatabaseType, ExecuteResult, QueryResult, Value},
};
use crate::error::DatabaseError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgConnectOptions, PgRow, PgTypeInfo};
use sqlx::{Column, ConnectOptions, Connection, Postgres, Row, Type, TypeInfo};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::database::engines::dump::ToolInvocation;

type PgConnection = sqlx::postgres::PgConnection;
type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Rewrite `?` placeholders to PostgreSQL's `$1, $2, ...`
///
/// Question marks inside quoted literals, identifiers or comments are left alone.
pub fn rewrite_placeholders(sql: &str) -> String {
    let positions = placeholder_positions(sql, DatabaseType::PostgreSQL);
    if positions.is_empty() {
        return sql.to_string();
    }

    let mut rewritten = String::with_capacity(sql.len() + positions.len() * 2);
    let mut last = 0;
    for (n, pos) in positions.iter().enumerate() {
        rewritten.push_str(&sql[last..*pos]);
        rewritten.push_str(&format!("${}", n + 1));
        last = pos + 1;
    }
    rewritten.push_str(&sql[last..]);
    rewritten
}

/// NULL parameter with an unspecified type; the server infers it from context
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// PostgreSQL Database Connection
pub struct PostgreSqlConnection {
    conn: Option<PgConnection>,
    config: DatabaseConfig,
    info: ConnectionInfo,
}

impl PostgreSqlConnection {
    /// Connect with the parameters in `config.connection`
    pub async fn new(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let c = &config.connection;
        let options = PgConnectOptions::new()
            .host(&c.host)
            .port(c.port)
            .database(&c.database)
            .username(&c.username)
            .password(&c.password);

        let conn = tokio::time::timeout(
            Duration::from_secs(c.connect_timeout_seconds),
            options.connect(),
        )
        .await
        .map_err(|_| {
            DatabaseError::ConnectionFailed(format!(
                "Timed out connecting to {}:{}",
                c.host, c.port
            ))
        })?
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(host = %c.host, port = c.port, database = %c.database, "Connected to PostgreSQL");

        let info = ConnectionInfo {
            connection_id: uuid::Uuid::new_v4().to_string(),
            database_type: DatabaseType::PostgreSQL,
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

    fn conn(&mut self) -> Result<&mut PgConnection, DatabaseError> {
        self.conn.as_mut().ok_or_else(|| {
            DatabaseError::ConnectionFailed("PostgreSQL connection is closed".to_string())
        })
    }

    fn bind_params<'q>(mut query: PgQuery<'q>, params: &'q [Value]) -> PgQuery<'q> {
        for param in params {
            query = match param {
                Value::Null => query.bind(UntypedNull),
                Value::Bool(b) => query.bind(*b),
                Value::Int(i) => query.bind(*i),
                Value::Float(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Binary(b) => query.bind(b.as_slice()),
                Value::Json(j) => query.bind(j),
                Value::DateTime(dt) => query.bind(*dt),
            };
        }
        query
    }

    fn rows_to_query_result(
        rows: Vec<PgRow>,
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
                (0..row.len())
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

    fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, DatabaseError>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(idx).map_err(|e| {
            DatabaseError::QueryFailed(format!("Failed to decode column {}: {}", idx, e))
        })
    }

    /// Extract value from PostgreSQL row, driven by the column's declared type
    fn extract_value(row: &PgRow, idx: usize) -> Result<Value, DatabaseError> {
        let type_name = row.columns()[idx].type_info().name().to_string();

        let value = match type_name.as_str() {
            "BOOL" => Self::get::<bool>(row, idx)?.map(Value::Bool),
            "INT2" => Self::get::<i16>(row, idx)?.map(|v| Value::Int(v as i64)),
            "INT4" => Self::get::<i32>(row, idx)?.map(|v| Value::Int(v as i64)),
            "INT8" => Self::get::<i64>(row, idx)?.map(Value::Int),
            "FLOAT4" => Self::get::<f32>(row, idx)?.map(|v| Value::Float(v as f64)),
            "FLOAT8" => Self::get::<f64>(row, idx)?.map(Value::Float),
            "NUMERIC" => Self::get::<Decimal>(row, idx)?.map(|d| match d.to_f64() {
                Some(f) => Value::Float(f),
                None => Value::String(d.to_string()),
            }),
            "BYTEA" => Self::get::<Vec<u8>>(row, idx)?.map(Value::Binary),
            "JSON" | "JSONB" => Self::get::<serde_json::Value>(row, idx)?.map(Value::Json),
            "TIMESTAMPTZ" => Self::get::<DateTime<Utc>>(row, idx)?.map(Value::DateTime),
            "TIMESTAMP" => {
                Self::get::<NaiveDateTime>(row, idx)?.map(|dt| Value::DateTime(dt.and_utc()))
            }
            "DATE" => Self::get::<NaiveDate>(row, idx)?.map(|d| Value::String(d.to_string())),
            "TIME" => Self::get::<NaiveTime>(row, idx)?.map(|t| Value::String(t.to_string())),
            "UUID" => Self::get::<uuid::Uuid>(row, idx)?.map(|u| Value::String(u.to_string())),
            _ => {
                check_text_type(&type_name, idx)?;
                Self::get::<String>(row, idx)?.map(Value::String)
            }
        };

        Ok(value.unwrap_or(Value::Null))
    }

    async fn run_raw(&mut self, sql: &str) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    fn path_arg(path: &Path) -> Result<String, DatabaseError> {
        path.to_str().map(String::from).ok_or_else(|| {
            DatabaseError::BackupFailed(format!("Path is not valid UTF-8: {}", path.display()))
        })
    }

    /// Connection arguments shared by pg_dump and psql
    fn tool(&self, override_program: Option<&str>, default: &str) -> ToolInvocation {
        let c = &self.config.connection;
        ToolInvocation::new(override_program, &[default])
            .arg("-h")
            .arg(c.host.as_str())
            .arg("-p")
            .arg(c.port.to_string())
            .arg("-U")
            .arg(c.username.as_str())
            .arg("-d")
            .arg(c.database.as_str())
            .env("PGPASSWORD", c.password.as_str())
    }
}

/// Column types decoded as plain strings
const TEXT_TYPES: &[&str] = &["TEXT", "VARCHAR", "BPCHAR", "NAME", "CITEXT", "UNKNOWN"];

/// Types without a typed arm in `extract_value` must be textual
fn check_text_type(type_name: &str, idx: usize) -> Result<(), DatabaseError> {
    if TEXT_TYPES.contains(&type_name) {
        Ok(())
    } else {
        Err(DatabaseError::QueryFailed(format!(
            "Unsupported column type {} at index {}; cast it to text in the query",
            type_name, idx
        )))
    }
}

#[async_trait]
impl DatabaseConnection for PostgreSqlConnection {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        let start = std::time::Instant::now();
        let sql = rewrite_placeholders(sql);
        let conn = self.conn()?;

        let rows = Self::bind_params(sqlx::query(&sql), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Self::rows_to_query_result(rows, start.elapsed().as_millis() as u64)
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        let start = std::time::Instant::now();
        let sql = rewrite_placeholders(sql);
        let conn = self.conn()?;

        let result = Self::bind_params(sqlx::query(&sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
            // Generated keys need RETURNING on this backend
            last_insert_id: None,
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
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
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
            Some((schema, table)) => (Some(schema), table),
            None => (None, table_name),
        };
        let conn = self.conn()?;

        let rows = sqlx::query(
            "SELECT column_name::text, data_type::text, is_nullable = 'YES' \
             FROM information_schema.columns \
             WHERE table_schema = COALESCE($1, current_schema()) AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get(0)
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
                let data_type: String = row.try_get(1).unwrap_or_default();
                let nullable: bool = row.try_get(2).unwrap_or(true);
                Ok(ColumnInfo {
                    name,
                    data_type,
                    nullable,
                })
            })
            .collect()
    }

    async fn backup(&mut self, path: &Path) -> Result<(), DatabaseError> {
        let output = Self::path_arg(path)?;
        self.tool(self.config.backup.dump_command.as_deref(), "pg_dump")
            .arg("--clean")
            .arg("--if-exists")
            .arg("-f")
            .arg(output)
            .run()
            .await?;

        debug!(target = %path.display(), "pg_dump finished");
        Ok(())
    }

    async fn restore(&mut self, path: &Path) -> Result<(), DatabaseError> {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| DatabaseError::BackupFailed(format!("{}: {}", path.display(), e)))?;
        let input = Self::path_arg(path)?;

        self.tool(self.config.backup.restore_command.as_deref(), "psql")
            .arg("-q")
            .arg("-v")
            .arg("ON_ERROR_STOP=1")
            .arg("-f")
            .arg(input)
            .run()
            .await?;

        debug!(source = %path.display(), "psql restore finished");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_placeholders() {
        assert_eq!(
            rewrite_placeholders("SELECT * FROM users WHERE username = ? AND role = ?"),
            "SELECT * FROM users WHERE username = $1 AND role = $2"
        );
        assert_eq!(
            rewrite_placeholders("INSERT INTO t (a, b) VALUES (?, ?), (?, ?)"),
            "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn test_rewrite_leaves_literals_alone() {
        assert_eq!(
            rewrite_placeholders("SELECT 'what?' WHERE x = ?"),
            "SELECT 'what?' WHERE x = $1"
        );
        assert_eq!(rewrite_placeholders("SELECT 1"), "SELECT 1");
        assert_eq!(
            rewrite_placeholders("SELECT ? -- what?\nFROM t WHERE id = ? /* ok? */"),
            "SELECT $1 -- what?\nFROM t WHERE id = $2 /* ok? */"
        );
    }

    #[test]
    fn test_untyped_columns_must_be_text() {
        assert!(check_text_type("TEXT", 0).is_ok());
        assert!(check_text_type("VARCHAR", 1).is_ok());
        assert!(check_text_type("BPCHAR", 2).is_ok());

        let err = check_text_type("INTERVAL", 3).unwrap_err();
        match err {
            DatabaseError::QueryFailed(msg) => {
                assert!(msg.contains("INTERVAL"));
                assert!(msg.contains("index 3"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(check_text_type("INET", 0).is_err());
        assert!(check_text_type("INT4[]", 0).is_err());
    }

    #[test]
    fn test_rewrite_handles_multibyte_text() {
        assert_eq!(
            rewrite_placeholders("UPDATE t SET note = 'é' WHERE id = ?"),
            "UPDATE t SET note = 'é' WHERE id = $1"
        );
    }
}
