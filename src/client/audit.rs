//! Audit log rows in a caller-named table
//!
//! The table needs `action` and `details` columns. A `timestamp` (or
//! `created_at`) column, when present, orders the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DatabaseClient;
use crate::database::query_builder::SelectBuilder;
use crate::database::schema::validate_identifier;
use crate::database::types::parse_timestamp;
use crate::database::Value;
use crate::error::Result;

const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "created_at"];

/// One audit log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub details: String,
    /// Present when the table has a timestamp column holding a parseable value
    pub timestamp: Option<DateTime<Utc>>,
}

impl AuditEntry {
    fn from_row(row: &[Value]) -> Self {
        let text = |idx: usize| row.get(idx).map(Value::to_text).unwrap_or_default();
        let timestamp = match row.get(2) {
            Some(Value::DateTime(dt)) => Some(*dt),
            Some(Value::String(s)) => parse_timestamp(s),
            _ => None,
        };

        Self {
            action: text(0),
            details: text(1),
            timestamp,
        }
    }
}

impl DatabaseClient {
    /// Record an action; the table's own default fills any timestamp column
    pub async fn log_action(&mut self, table_name: &str, action: &str, details: &str) -> Result<()> {
        self.insert(
            table_name,
            &["action", "details"],
            &[Value::from(action), Value::from(details)],
        )
        .await?;
        debug!(table = %table_name, action = %action, "Audit entry written");
        Ok(())
    }

    /// Record an action with an explicit value for the `timestamp` column
    pub async fn log_action_at(
        &mut self,
        table_name: &str,
        action: &str,
        details: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.insert(
            table_name,
            &["action", "details", "timestamp"],
            &[
                Value::from(action),
                Value::from(details),
                Value::DateTime(timestamp),
            ],
        )
        .await?;
        debug!(table = %table_name, action = %action, "Audit entry written");
        Ok(())
    }

    /// Every entry, oldest first when the table has a timestamp column and in
    /// backend order otherwise
    pub async fn get_audit_log(&mut self, table_name: &str) -> Result<Vec<AuditEntry>> {
        validate_identifier(table_name)?;
        let timestamp_column = self
            .list_columns(table_name)
            .await?
            .into_iter()
            .find(|c| TIMESTAMP_COLUMNS.iter().any(|t| c.eq_ignore_ascii_case(t)));

        let mut columns = vec!["action".to_string(), "details".to_string()];
        let mut select = SelectBuilder::new(table_name);
        if let Some(ts) = timestamp_column {
            columns.push(ts.clone());
            select = select.order_by(&ts);
        }

        let rows = self
            .execute_query(&select.columns(&columns).build(), &[])
            .await?;
        Ok(rows.iter().map(|row| AuditEntry::from_row(row)).collect())
    }
}
