//! Error types for dbx.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant carries enough context (backend, registry name) to tell where a
//! failure originated; the driver error, when there is one, is kept as the source.

use crate::models::Backend;
use thiserror::Error;

/// Error reported by one of the wrapped database clients.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("{0}")]
    Message(String),
}

impl BackendError {
    /// Create a backend error from a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{backend} '{target}' - connect - gave up after {attempts} attempt(s){}", last_error(.source))]
    ConnectionExhausted {
        backend: Backend,
        /// Registry name or masked connection string
        target: String,
        attempts: u32,
        #[source]
        source: Option<BackendError>,
    },

    #[error("{backend} '{target}' - connect - ping: {source}")]
    ConnectivityCheckFailed {
        backend: Backend,
        target: String,
        #[source]
        source: BackendError,
    },

    #[error("{backend} '{target}' - connect - pool introspection: {source}")]
    PoolIntrospectionFailed {
        backend: Backend,
        target: String,
        #[source]
        source: BackendError,
    },

    #[error("{backend} '{target}' - close: {source}")]
    CloseFailed {
        backend: Backend,
        target: String,
        #[source]
        source: BackendError,
    },

    #[error("Database config for '{name}' not found")]
    ConfigNotFound { name: String },

    #[error("Database connection '{name}' not found")]
    ConnectionNotFound { name: String },

    #[error("Database connection '{name}' was closed while connecting")]
    ConnectionClosed { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

fn last_error(source: &Option<BackendError>) -> String {
    match source {
        Some(err) => format!(": {}", err),
        None => String::new(),
    }
}

impl DbError {
    /// Create a connection-exhausted error.
    pub fn connection_exhausted(
        backend: Backend,
        target: impl Into<String>,
        attempts: u32,
        source: Option<BackendError>,
    ) -> Self {
        Self::ConnectionExhausted {
            backend,
            target: target.into(),
            attempts,
            source,
        }
    }

    /// Create a connectivity-check error.
    pub fn connectivity_check_failed(
        backend: Backend,
        target: impl Into<String>,
        source: BackendError,
    ) -> Self {
        Self::ConnectivityCheckFailed {
            backend,
            target: target.into(),
            source,
        }
    }

    /// Create a pool introspection error.
    pub fn pool_introspection_failed(
        backend: Backend,
        target: impl Into<String>,
        source: BackendError,
    ) -> Self {
        Self::PoolIntrospectionFailed {
            backend,
            target: target.into(),
            source,
        }
    }

    /// Create a close error.
    pub fn close_failed(backend: Backend, target: impl Into<String>, source: BackendError) -> Self {
        Self::CloseFailed {
            backend,
            target: target.into(),
            source,
        }
    }

    /// Create a config not found error.
    pub fn config_not_found(name: impl Into<String>) -> Self {
        Self::ConfigNotFound { name: name.into() }
    }

    /// Create a connection not found error.
    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    /// Create a closed-while-connecting error.
    pub fn connection_closed(name: impl Into<String>) -> Self {
        Self::ConnectionClosed { name: name.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// The backend this error came from, if it came from a bootstrap.
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::ConnectionExhausted { backend, .. }
            | Self::ConnectivityCheckFailed { backend, .. }
            | Self::PoolIntrospectionFailed { backend, .. }
            | Self::CloseFailed { backend, .. } => Some(*backend),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionExhausted { .. }
                | Self::ConnectivityCheckFailed { .. }
                | Self::ConnectionClosed { .. }
        )
    }
}

/// Result type alias for connection operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exhausted_display_includes_last_error() {
        let err = DbError::connection_exhausted(
            Backend::PostgreSQL,
            "app",
            3,
            Some(BackendError::message("connection refused")),
        );
        let msg = err.to_string();
        assert!(msg.contains("PostgreSQL 'app'"));
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.ends_with(": connection refused"));
    }

    #[test]
    fn test_exhausted_without_attempts_has_no_source() {
        let err = DbError::connection_exhausted(Backend::Redis, "cache", 0, None);
        assert!(err.source().is_none());
        assert!(err.to_string().ends_with("0 attempt(s)"));
    }

    #[test]
    fn test_source_is_preserved() {
        let err = DbError::connectivity_check_failed(
            Backend::MongoDB,
            "events",
            BackendError::message("server selection timeout"),
        );
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "server selection timeout");
    }

    #[test]
    fn test_registry_errors_name_the_target() {
        assert!(
            DbError::config_not_found("orders")
                .to_string()
                .contains("'orders'")
        );
        assert!(
            DbError::connection_not_found("billing")
                .to_string()
                .contains("'billing'")
        );
    }

    #[test]
    fn test_error_backend() {
        let err = DbError::pool_introspection_failed(
            Backend::MySQL,
            "orders",
            BackendError::message("pool closed"),
        );
        assert_eq!(err.backend(), Some(Backend::MySQL));
        assert_eq!(DbError::config_not_found("x").backend(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection_exhausted(Backend::MySQL, "orders", 1, None).is_retryable());
        assert!(DbError::connection_closed("orders").is_retryable());
        assert!(!DbError::connection_not_found("x").is_retryable());
        assert!(!DbError::invalid_input("bad").is_retryable());
        assert!(
            !DbError::close_failed(Backend::Redis, "cache", BackendError::message("x"))
                .is_retryable()
        );
    }
}
