//! Error types for the database facade.

use thiserror::Error;

/// Result type alias for facade operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Database facade errors
///
/// Backend failures carry the driver's native message so callers can
/// diagnose them without unwrapping a driver-specific error type.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Session establishment failed (bad credentials, unreachable host, ...)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// DDL statement rejected by the backend
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Argument shape rejected before reaching the backend
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// DML rejected or constraint violated
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// BEGIN / COMMIT / ROLLBACK rejected
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// External dump tool or file-system failure during backup/restore
    #[error("Backup failed: {0}")]
    BackupFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// CSV reader/writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatabaseError {
    /// Re-tag a backend rejection of a DDL statement as a schema error.
    ///
    /// Validation and connection errors pass through unchanged.
    pub fn into_schema_error(self) -> Self {
        match self {
            DatabaseError::QueryFailed(msg) => DatabaseError::SchemaError(msg),
            other => other,
        }
    }

    /// Whether the error was raised before any backend round trip.
    pub fn is_validation(&self) -> bool {
        matches!(self, DatabaseError::ValidationError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_retag() {
        let err = DatabaseError::QueryFailed("near \"TABL\": syntax error".to_string());
        let schema = err.into_schema_error();
        assert!(matches!(schema, DatabaseError::SchemaError(_)));
        assert!(schema.to_string().contains("syntax error"));
    }

    #[test]
    fn test_retag_keeps_validation() {
        let err = DatabaseError::ValidationError("bad identifier".to_string());
        assert!(err.into_schema_error().is_validation());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: DatabaseError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
