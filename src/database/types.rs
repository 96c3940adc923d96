//! Database Types and Common Structures
//!
//! Types shared by the facade and every backend engine

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DatabaseError;

/// Backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Embedded, file-based engine
    #[serde(alias = "sqlite3")]
    SQLite,
    /// MariaDB (wire compatible with MySQL)
    #[serde(alias = "mysql")]
    MariaDB,
    #[serde(alias = "postgres")]
    PostgreSQL,
}

impl DatabaseType {
    /// Client/server backends need host and credentials, the embedded one a path.
    pub fn is_embedded(&self) -> bool {
        matches!(self, DatabaseType::SQLite)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::SQLite => write!(f, "sqlite"),
            DatabaseType::MariaDB => write!(f, "mariadb"),
            DatabaseType::PostgreSQL => write!(f, "postgresql"),
        }
    }
}

impl FromStr for DatabaseType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseType::SQLite),
            "mariadb" | "mysql" => Ok(DatabaseType::MariaDB),
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSQL),
            other => Err(DatabaseError::ConfigurationError(format!(
                "Unsupported database type '{}'. Supported types are 'sqlite', 'mariadb', and 'postgresql'",
                other
            ))),
        }
    }
}

/// Optional capabilities advertised by an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseFeature {
    Transactions,
    PreparedStatements,
    MultiRowInsert,
    JsonSupport,
    NativeDump,
    FileCopyBackup,
}

/// Database value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text rendering used for CSV export and string comparisons.
    ///
    /// `Null` renders as the empty string, binary data as standard base64.
    pub fn to_text(&self) -> String {
        use base64::prelude::*;

        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Binary(b) => BASE64_STANDARD.encode(b),
            Value::Json(j) => j.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
        }
    }
}

/// Datetime text layout SQLite's own `CURRENT_TIMESTAMP` produces (UTC)
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse RFC 3339 or a zone-less `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC)
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    [SQL_DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One result row, ordered like the selected columns
pub type Row = Vec<Value>;

/// Query result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column metadata (empty when the driver reports no rows)
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// First cell of the first row, if any.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Command execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// Last generated id (AUTO_INCREMENT, ROWID) when the backend reports one
    pub last_insert_id: Option<i64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Connection information
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub database_type: DatabaseType,
    pub database_name: String,
    pub user_name: String,
    pub connected_at: DateTime<Utc>,
}
