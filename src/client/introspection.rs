//! Catalog lookups and row counts

use super::DatabaseClient;
use crate::database::schema::validate_identifier;
use crate::database::{ColumnInfo, Value};
use crate::error::{DatabaseError, Result};

impl DatabaseClient {
    /// Base tables in the current database (or schema, on PostgreSQL)
    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        self.conn()?.list_tables().await
    }

    /// A `schema.table` name is looked up in that schema, a bare name in the
    /// current one
    pub async fn table_exists(&mut self, table_name: &str) -> Result<bool> {
        validate_identifier(table_name)?;
        if table_name.contains('.') {
            return Ok(!self.table_columns(table_name).await?.is_empty());
        }
        Ok(self
            .list_tables()
            .await?
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table_name)))
    }

    /// Column metadata in declaration order; empty for an unknown table
    pub async fn table_columns(&mut self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        validate_identifier(table_name)?;
        self.conn()?.table_columns(table_name).await
    }

    pub async fn list_columns(&mut self, table_name: &str) -> Result<Vec<String>> {
        Ok(self
            .table_columns(table_name)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    pub async fn column_exists(&mut self, table_name: &str, column_name: &str) -> Result<bool> {
        validate_identifier(column_name)?;
        Ok(self
            .table_columns(table_name)
            .await?
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(column_name)))
    }

    /// `SELECT COUNT(*)` with an optional condition
    pub async fn count_rows(
        &mut self,
        table_name: &str,
        condition: Option<&str>,
        params: &[Value],
    ) -> Result<i64> {
        validate_identifier(table_name)?;
        let mut sql = format!("SELECT COUNT(*) FROM {}", table_name);
        if let Some(condition) = condition.map(str::trim).filter(|c| !c.is_empty()) {
            sql.push_str(&format!(" WHERE {}", condition));
        }

        let result = self.query(&sql, params).await?;
        result.scalar().and_then(Value::as_i64).ok_or_else(|| {
            DatabaseError::QueryFailed(format!("COUNT(*) on {} returned no integer", table_name))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::client::DatabaseClient;
    use crate::config::DatabaseConfig;
    use crate::database::Value;

    #[tokio::test]
    async fn test_catalog_helpers() {
        let mut client = DatabaseClient::connect(&DatabaseConfig::sqlite_memory())
            .await
            .unwrap();
        assert!(client.list_tables().await.unwrap().is_empty());

        client
            .create_table("users", &[("username", "TEXT NOT NULL"), ("role", "TEXT")])
            .await
            .unwrap();
        client.create_table("audit", &[("action", "TEXT")]).await.unwrap();

        assert_eq!(client.list_tables().await.unwrap(), vec!["audit", "users"]);
        assert!(client.table_exists("users").await.unwrap());
        assert!(client.table_exists("main.users").await.unwrap());
        assert!(!client.table_exists("missing").await.unwrap());
        assert!(!client.table_exists("temp.users").await.unwrap());

        let columns = client.table_columns("users").await.unwrap();
        assert_eq!(columns[0].name, "username");
        assert!(!columns[0].nullable);
        assert!(columns[1].nullable);

        assert!(client.column_exists("users", "role").await.unwrap());
        assert!(!client.column_exists("users", "email").await.unwrap());
        assert!(client.list_columns("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_table_exists_honours_schema() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.db");
        let mut client = DatabaseClient::connect(&DatabaseConfig::sqlite_memory())
            .await
            .unwrap();
        client
            .execute(
                &format!("ATTACH DATABASE '{}' AS other", other.to_str().unwrap()),
                &[],
            )
            .await
            .unwrap();
        client
            .execute("CREATE TABLE other.users (username TEXT)", &[])
            .await
            .unwrap();

        assert!(client.table_exists("other.users").await.unwrap());
        assert!(!client.table_exists("users").await.unwrap());
        assert!(!client.table_exists("main.users").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_rows() {
        let mut client = DatabaseClient::connect(&DatabaseConfig::sqlite_memory())
            .await
            .unwrap();
        client.create_table("t", &[("v", "INT")]).await.unwrap();
        let rows: Vec<_> = (1..=4).map(|i| vec![Value::Int(i)]).collect();
        client.batch_insert("t", &["v"], &rows).await.unwrap();

        assert_eq!(client.count_rows("t", None, &[]).await.unwrap(), 4);
        assert_eq!(
            client
                .count_rows("t", Some("v > ?"), &[Value::Int(2)])
                .await
                .unwrap(),
            2
        );
        assert_eq!(client.count_rows("t", Some(""), &[]).await.unwrap(), 4);
    }
}
