//! PostgreSQL Database Engine
//!
//! Client/server backend over a single sqlx `PgConnection`. Placeholders are
//! rewritten to `$n` before they reach the server.

pub mod connection;
pub mod engine;

pub use connection::{rewrite_placeholders, PostgreSqlConnection};
pub use engine::PostgreSqlEngine;
