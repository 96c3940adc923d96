//! SQLite Database Engine
//!
//! Embedded, file-based backend. Backups are consistent copies of the
//! database file.

pub mod connection;
pub mod engine;

pub use connection::SqliteConnection;
pub use engine::SqliteEngine;
