//! Connection bootstrap layer.
//!
//! This module provides:
//! - The bounded-retry bootstrap shared by every backend
//! - One connector per backend (MongoDB, PostgreSQL, MySQL, Redis)
//! - The named connection registry
//! - Connector generation macros for the sqlx-backed stores

pub mod bootstrap;
#[macro_use]
pub mod macros;
pub mod manager;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod redis;

pub use bootstrap::{Connection, Connector, connect_with_retry};
pub use manager::ConnectionManager;
pub use mongo::{MongoConnection, MongoConnector, MongoHandle};
pub use mysql::{MySqlConnection, MySqlConnector, MySqlManager};
pub use postgres::{PostgresConnection, PostgresConnector};
pub use redis::{RedisConnection, RedisConnector, RedisHandle};
