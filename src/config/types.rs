use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::types::DatabaseType;
use crate::error::DatabaseError;
use crate::password::PasswordScheme;

/// Facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Selects the engine (and therefore driver and dialect)
    pub database_type: DatabaseType,

    /// Connection parameters
    pub connection: ConnectionConfig,

    /// External dump/restore tool overrides
    #[serde(default)]
    pub backup: BackupConfig,

    /// Hash scheme used by the user helpers
    #[serde(default)]
    pub password_scheme: PasswordScheme,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::sqlite_memory()
    }
}

impl DatabaseConfig {
    /// Embedded database stored at `path`
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            database_type: DatabaseType::SQLite,
            connection: ConnectionConfig {
                path: Some(path.into()),
                ..ConnectionConfig::default()
            },
            backup: BackupConfig::default(),
            password_scheme: PasswordScheme::default(),
        }
    }

    /// Embedded in-memory database
    pub fn sqlite_memory() -> Self {
        Self::sqlite(":memory:")
    }

    pub fn postgresql(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::server(
            DatabaseType::PostgreSQL,
            host.into(),
            port,
            database.into(),
            username.into(),
            password.into(),
        )
    }

    pub fn mariadb(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::server(
            DatabaseType::MariaDB,
            host.into(),
            port,
            database.into(),
            username.into(),
            password.into(),
        )
    }

    fn server(
        database_type: DatabaseType,
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            database_type,
            connection: ConnectionConfig {
                host,
                port,
                database,
                username,
                password,
                ..ConnectionConfig::default()
            },
            backup: BackupConfig::default(),
            password_scheme: PasswordScheme::default(),
        }
    }

    pub fn with_password_scheme(mut self, scheme: PasswordScheme) -> Self {
        self.password_scheme = scheme;
        self
    }

    /// Check the parameters the selected backend needs are present.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        let conn = &self.connection;
        if self.database_type.is_embedded() {
            match conn.path.as_deref() {
                Some(path) if !path.trim().is_empty() => Ok(()),
                _ => Err(DatabaseError::ConfigurationError(
                    "SQLite database path is required".to_string(),
                )),
            }
        } else {
            if conn.host.is_empty() {
                return Err(DatabaseError::ConfigurationError(format!(
                    "{} host cannot be empty",
                    self.database_type
                )));
            }
            if conn.port == 0 {
                return Err(DatabaseError::ConfigurationError(format!(
                    "Invalid {} port: 0",
                    self.database_type
                )));
            }
            if conn.database.is_empty() {
                return Err(DatabaseError::ConfigurationError(format!(
                    "{} database name cannot be empty",
                    self.database_type
                )));
            }
            Ok(())
        }
    }
}

/// Connection parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Database file for the embedded backend (`:memory:` for a private in-memory database)
    pub path: Option<String>,
    pub connect_timeout_seconds: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            path: None,
            connect_timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("path", &self.path)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

/// Overrides for the vendor dump/restore programs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Dump program (`pg_dump`, `mariadb-dump`, ...)
    pub dump_command: Option<String>,
    /// Restore program (`psql`, `mariadb`, ...)
    pub restore_command: Option<String>,
}
