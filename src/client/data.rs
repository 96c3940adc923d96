//! Row-level CRUD helpers

use tracing::{debug, info};

use super::DatabaseClient;
use crate::database::query_builder::{delete_sql, insert_sql, update_sql, SelectBuilder};
use crate::database::schema::{validate_identifier, validate_identifiers};
use crate::database::{ExecuteResult, Row, Value};
use crate::error::{DatabaseError, Result};

/// Upper bound on rows per multi-row INSERT, independent of the bind limit
const MAX_ROWS_PER_STATEMENT: usize = 500;

fn require_condition(condition: &str, operation: &str) -> Result<()> {
    if condition.trim().is_empty() {
        return Err(DatabaseError::ValidationError(format!(
            "{} requires a condition; use clear_table to remove every row",
            operation
        )));
    }
    Ok(())
}

fn check_columns<S: AsRef<str>>(table_name: &str, columns: &[S]) -> Result<()> {
    validate_identifier(table_name)?;
    if columns.is_empty() {
        return Err(DatabaseError::ValidationError(
            "At least one column is required".to_string(),
        ));
    }
    validate_identifiers(columns)
}

impl DatabaseClient {
    /// Insert one row. The value count must match the column count.
    pub async fn insert<S: AsRef<str>>(
        &mut self,
        table_name: &str,
        columns: &[S],
        values: &[Value],
    ) -> Result<ExecuteResult> {
        check_columns(table_name, columns)?;
        if columns.len() != values.len() {
            return Err(DatabaseError::ValidationError(format!(
                "Column/value count mismatch: {} columns, {} values",
                columns.len(),
                values.len()
            )));
        }

        self.execute(&insert_sql(table_name, columns, 1), values)
            .await
    }

    /// Insert many rows using multi-row `INSERT` statements.
    ///
    /// Rows are sent in chunks that fit the backend's bind-parameter limit.
    /// Chunks already written stay written when a later one fails unless the
    /// caller wrapped the call in a transaction.
    pub async fn batch_insert<S: AsRef<str>>(
        &mut self,
        table_name: &str,
        columns: &[S],
        rows: &[Row],
    ) -> Result<u64> {
        check_columns(table_name, columns)?;
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DatabaseError::ValidationError(format!(
                "Row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let chunk_size = (self.engine.max_bind_params() / columns.len())
            .min(MAX_ROWS_PER_STATEMENT)
            .max(1);

        let mut inserted = 0;
        for (chunk_idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let sql = insert_sql(table_name, columns, chunk.len());
            let params = chunk.concat();
            let result = self.execute(&sql, &params).await.map_err(|e| {
                DatabaseError::QueryFailed(format!(
                    "Batch insert failed in the chunk starting at row {}: {}",
                    chunk_idx * chunk_size,
                    e
                ))
            })?;
            inserted += result.rows_affected;
        }

        debug!(table = %table_name, rows = inserted, chunk_size, "Batch insert finished");
        Ok(inserted)
    }

    /// `SELECT columns FROM table [WHERE condition]`; an empty column list selects `*`.
    pub async fn fetch<S: AsRef<str>>(
        &mut self,
        table_name: &str,
        columns: &[S],
        condition: Option<&str>,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        validate_identifier(table_name)?;
        validate_identifiers(columns)?;

        let sql = SelectBuilder::new(table_name)
            .columns(columns)
            .where_clause(condition)
            .build();
        self.execute_query(&sql, params).await
    }

    /// `UPDATE table SET <updates> WHERE <condition>`, returns affected rows
    pub async fn update(
        &mut self,
        table_name: &str,
        updates: &str,
        condition: &str,
        params: &[Value],
    ) -> Result<u64> {
        validate_identifier(table_name)?;
        require_condition(condition, "update")?;
        if updates.trim().is_empty() {
            return Err(DatabaseError::ValidationError(
                "update requires a SET fragment".to_string(),
            ));
        }

        let result = self
            .execute(&update_sql(table_name, updates, condition), params)
            .await?;
        Ok(result.rows_affected)
    }

    /// `DELETE FROM table WHERE <condition>`, returns affected rows
    pub async fn delete(
        &mut self,
        table_name: &str,
        condition: &str,
        params: &[Value],
    ) -> Result<u64> {
        validate_identifier(table_name)?;
        require_condition(condition, "delete")?;

        let result = self
            .execute(&delete_sql(table_name, Some(condition)), params)
            .await?;
        Ok(result.rows_affected)
    }

    /// Remove every row
    pub async fn clear_table(&mut self, table_name: &str) -> Result<u64> {
        validate_identifier(table_name)?;
        let result = self.execute(&delete_sql(table_name, None), &[]).await?;
        info!(table = %table_name, rows = result.rows_affected, "Table cleared");
        Ok(result.rows_affected)
    }

    /// `column = column + amount` on matching rows
    pub async fn add_value(
        &mut self,
        table_name: &str,
        column: &str,
        amount: i64,
        condition: &str,
        params: &[Value],
    ) -> Result<u64> {
        self.adjust_value(table_name, column, '+', amount, condition, params)
            .await
    }

    /// `column = column - amount` on matching rows
    pub async fn subtract_value(
        &mut self,
        table_name: &str,
        column: &str,
        amount: i64,
        condition: &str,
        params: &[Value],
    ) -> Result<u64> {
        self.adjust_value(table_name, column, '-', amount, condition, params)
            .await
    }

    async fn adjust_value(
        &mut self,
        table_name: &str,
        column: &str,
        op: char,
        amount: i64,
        condition: &str,
        params: &[Value],
    ) -> Result<u64> {
        validate_identifier(column)?;
        let updates = format!("{0} = {0} {1} ?", column, op);
        let mut all_params = Vec::with_capacity(params.len() + 1);
        all_params.push(Value::Int(amount));
        all_params.extend_from_slice(params);
        self.update(table_name, &updates, condition, &all_params)
            .await
    }

    /// True when no row matches, or the first match holds NULL or an empty string
    pub async fn is_field_empty(
        &mut self,
        table_name: &str,
        column: &str,
        condition: &str,
        params: &[Value],
    ) -> Result<bool> {
        require_condition(condition, "is_field_empty")?;
        let rows = self
            .fetch(table_name, &[column], Some(condition), params)
            .await?;

        Ok(match rows.first().and_then(|row| row.first()) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
    }
}
