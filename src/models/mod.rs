//! Data models for dbx.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;

// Re-export commonly used types
pub use connection::{
    Backend, ConnectionInfo, MAX_CONN_LIFETIME, PoolSettings, PoolStatus,
    masked_connection_string,
};
