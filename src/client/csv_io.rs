//! CSV export and import
//!
//! Files are RFC 4180 with a header row naming the columns. Values are
//! written as text (NULL as an empty field, binary as base64) and converted
//! back using the target column's declared type on import.

use base64::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::DatabaseClient;
use crate::database::schema::{validate_identifier, validate_identifiers};
use crate::database::types::parse_timestamp;
use crate::database::{Row, Value};
use crate::error::{DatabaseError, Result};

/// Coarse type family of a declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Real,
    Boolean,
    Timestamp,
    Binary,
    Text,
}

impl ColumnKind {
    fn from_declared(data_type: &str) -> Self {
        let upper = data_type.to_ascii_uppercase();
        let has = |needle: &str| upper.contains(needle);

        if has("BOOL") {
            ColumnKind::Boolean
        } else if (has("INT") && !has("INTERVAL") && !has("POINT")) || has("SERIAL") {
            ColumnKind::Integer
        } else if has("REAL")
            || has("FLOA")
            || has("DOUB")
            || has("NUMERIC")
            || has("DECIMAL")
        {
            ColumnKind::Real
        } else if has("TIMESTAMP") || has("DATETIME") {
            ColumnKind::Timestamp
        } else if has("BLOB") || has("BYTEA") || has("BINARY") {
            ColumnKind::Binary
        } else {
            ColumnKind::Text
        }
    }

    /// Convert one CSV field; a field that does not parse stays text.
    /// An empty field is NULL except in text columns, where it is the empty string.
    fn convert(self, field: &str) -> Value {
        if field.is_empty() && self != ColumnKind::Text {
            return Value::Null;
        }

        let text = || Value::String(field.to_string());
        let trimmed = field.trim();

        match self {
            ColumnKind::Integer => trimmed.parse().map(Value::Int).unwrap_or_else(|_| text()),
            ColumnKind::Real => trimmed.parse().map(Value::Float).unwrap_or_else(|_| text()),
            ColumnKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Value::Bool(true),
                "false" | "f" | "0" => Value::Bool(false),
                _ => text(),
            },
            ColumnKind::Timestamp => parse_timestamp(trimmed).map(Value::DateTime).unwrap_or_else(text),
            ColumnKind::Binary => BASE64_STANDARD
                .decode(trimmed)
                .map(Value::Binary)
                .unwrap_or_else(|_| text()),
            ColumnKind::Text => text(),
        }
    }
}

impl DatabaseClient {
    /// Write every row of `table_name` to `path`, returns the row count
    pub async fn export_to_csv(&mut self, table_name: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let columns = self.list_columns(table_name).await?;
        if columns.is_empty() {
            return Err(DatabaseError::QueryFailed(format!(
                "Table {} does not exist or has no columns",
                table_name
            )));
        }

        let rows = self.fetch(table_name, &columns, None, &[]).await?;

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(&columns)?;
        for row in &rows {
            writer.write_record(row.iter().map(Value::to_text))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| DatabaseError::Io(std::io::Error::new(e.error().kind(), e.to_string())))?;

        tokio::fs::write(path, data).await?;

        info!(table = %table_name, rows = rows.len(), path = %path.display(), "Exported CSV");
        Ok(rows.len() as u64)
    }

    /// Insert the rows of a CSV file (header first) into `table_name`,
    /// returns the number of rows inserted
    pub async fn import_from_csv(&mut self, table_name: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        validate_identifier(table_name)?;
        let data = tokio::fs::read(path).await?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_slice());
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        validate_identifiers(&headers)?;

        let declared: HashMap<String, String> = self
            .table_columns(table_name)
            .await?
            .into_iter()
            .map(|c| (c.name.to_ascii_lowercase(), c.data_type))
            .collect();
        let kinds: Vec<ColumnKind> = headers
            .iter()
            .map(|h| {
                declared
                    .get(&h.to_ascii_lowercase())
                    .map(|t| ColumnKind::from_declared(t))
                    .unwrap_or(ColumnKind::Text)
            })
            .collect();

        let rows = reader
            .records()
            .map(|record| -> Result<Row> {
                let record = record?;
                Ok(record
                    .iter()
                    .zip(&kinds)
                    .map(|(field, kind)| kind.convert(field))
                    .collect::<Row>())
            })
            .collect::<Result<Vec<Row>>>()?;

        let inserted = self.batch_insert(table_name, &headers, &rows).await?;
        info!(table = %table_name, rows = inserted, path = %path.display(), "Imported CSV");
        Ok(inserted)
    }
}
