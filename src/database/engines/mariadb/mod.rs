//! MariaDB Database Engine
//!
//! Client/server backend over a single `mysql_async` connection. Statements
//! with parameters go through the binary protocol so values keep their types.

pub mod connection;
pub mod engine;
pub mod param_converter;

pub use connection::MariaDbConnection;
pub use engine::MariaDbEngine;
pub use param_converter::MariaDbParamConverter;
