//! Facade configuration and its layered loader.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{BackupConfig, ConnectionConfig, DatabaseConfig};
