//! dbx library
//!
//! Connection bootstrap helpers for MongoDB, PostgreSQL, MySQL and Redis:
//! bounded fixed-delay retry, pool sizing, liveness check and close, plus a
//! registry of named connections.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{ConnectConfig, Config};
pub use db::{Connection, ConnectionManager, Connector, MySqlManager};
pub use error::{BackendError, DbError, DbResult};
