use super::types::DatabaseConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Configuration loader with builder pattern
///
/// Sources are layered: defaults, then a TOML file, then `DBFACADE_*`
/// environment variables (`__` separates nested keys, e.g.
/// `DBFACADE_CONNECTION__HOST`).
pub struct ConfigLoader {
    config_file: Option<String>,
    inline_toml: Option<String>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            inline_toml: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from a TOML document held in memory
    pub fn load_from_toml_str(mut self, toml: &str) -> Self {
        self.inline_toml = Some(toml.to_string());
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<DatabaseConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&DatabaseConfig::default())?);

        if let Some(config_path) = &self.config_file {
            builder = builder.add_source(File::with_name(config_path).required(true));
        } else {
            builder = builder
                .add_source(File::with_name("db-facade").required(false))
                .add_source(File::with_name("config/db-facade").required(false));
        }

        if let Some(toml) = &self.inline_toml {
            builder = builder.add_source(File::from_str(toml, FileFormat::Toml));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("DBFACADE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: DatabaseConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .validate()
            .context("Configuration is incomplete for the selected backend")?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
