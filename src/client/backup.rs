//! Backup and restore

use std::path::Path;
use tracing::info;

use super::DatabaseClient;
use crate::error::{DatabaseError, Result};

impl DatabaseClient {
    /// Write a backend-native backup to `path`.
    ///
    /// SQLite produces a consistent copy of the database file; the server
    /// backends run their dump tool and produce an SQL script.
    pub async fn backup_database(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.require_no_transaction("backup")?;
        self.conn()?.backup(path).await?;
        info!(database_type = %self.database_type(), path = %path.display(), "Database backed up");
        Ok(())
    }

    /// Replace the database contents with a backup made by `backup_database`
    pub async fn restore_database(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.require_no_transaction("restore")?;
        self.conn()?.restore(path).await?;
        info!(database_type = %self.database_type(), path = %path.display(), "Database restored");
        Ok(())
    }

    fn require_no_transaction(&self, operation: &str) -> Result<()> {
        if self.in_transaction {
            return Err(DatabaseError::BackupFailed(format!(
                "Cannot {} while a transaction is open",
                operation
            )));
        }
        Ok(())
    }
}
