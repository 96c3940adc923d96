//! Table and index DDL

use tracing::info;

use super::DatabaseClient;
use crate::database::query_builder::{create_index_sql, create_table_sql};
use crate::database::schema::{validate_identifier, validate_identifiers, ColumnDef, TableSchema};
use crate::error::{DatabaseError, Result};

impl DatabaseClient {
    /// `CREATE TABLE IF NOT EXISTS` from `(name, "TYPE constraints")` pairs.
    ///
    /// Each fragment's leading type must be on the backend's allow-list; the
    /// rest is passed through as constraints.
    pub async fn create_table<N, F>(&mut self, table_name: &str, columns: &[(N, F)]) -> Result<()>
    where
        N: AsRef<str>,
        F: AsRef<str>,
    {
        let allowed = self.engine.supported_types();
        let schema = TableSchema::from_fragments(columns, &allowed)?;
        self.create_table_with_schema(table_name, &schema).await
    }

    pub async fn create_table_with_schema(
        &mut self,
        table_name: &str,
        schema: &TableSchema,
    ) -> Result<()> {
        validate_identifier(table_name)?;
        schema.validate(&self.engine.supported_types())?;

        self.execute_ddl(&create_table_sql(table_name, &schema.to_sql()))
            .await?;
        info!(table = %table_name, columns = schema.columns.len(), "Table created");
        Ok(())
    }

    pub async fn drop_table(&mut self, table_name: &str) -> Result<()> {
        validate_identifier(table_name)?;
        self.execute_ddl(&format!("DROP TABLE IF EXISTS {}", table_name))
            .await
    }

    /// `ALTER TABLE name <alteration>` with the alteration passed verbatim
    pub async fn alter_table(&mut self, table_name: &str, alteration: &str) -> Result<()> {
        validate_identifier(table_name)?;
        if alteration.trim().is_empty() {
            return Err(DatabaseError::ValidationError(
                "ALTER TABLE needs an alteration".to_string(),
            ));
        }
        self.execute_ddl(&format!("ALTER TABLE {} {}", table_name, alteration.trim()))
            .await
    }

    /// Add one column; `data_type` follows the same rules as `create_table`
    pub async fn alter_table_add_column(
        &mut self,
        table_name: &str,
        column: &str,
        data_type: &str,
    ) -> Result<()> {
        let column = ColumnDef::parse(column, data_type, &self.engine.supported_types())?;
        validate_identifier(&column.name)?;
        self.alter_table(table_name, &format!("ADD COLUMN {}", column.to_sql()))
            .await
    }

    pub async fn create_index<S: AsRef<str>>(
        &mut self,
        index_name: &str,
        table_name: &str,
        columns: &[S],
    ) -> Result<()> {
        validate_identifier(index_name)?;
        validate_identifier(table_name)?;
        if columns.is_empty() {
            return Err(DatabaseError::ValidationError(
                "An index needs at least one column".to_string(),
            ));
        }
        validate_identifiers(columns)?;

        self.execute_ddl(&create_index_sql(index_name, table_name, columns))
            .await
    }

    /// Drop an index; the table name is only used where the backend scopes
    /// indexes per table.
    pub async fn drop_index(&mut self, index_name: &str, table_name: &str) -> Result<()> {
        validate_identifier(index_name)?;
        validate_identifier(table_name)?;
        let sql = self.engine.drop_index_sql(index_name, table_name);
        self.execute_ddl(&sql).await
    }
}
