//! Connection-related data models.
//!
//! This module defines the supported backends and the pool records shared by
//! every bootstrap.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifetime applied to every pooled connection.
pub const MAX_CONN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Document store
    MongoDB,
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    /// Key-value cache store
    Redis,
}

impl Backend {
    /// Parse backend from a connection string.
    ///
    /// Redis also accepts a bare `host:port` address, which carries no scheme
    /// and therefore cannot be recognised here.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("mongodb://") || lower.starts_with("mongodb+srv://") {
            Some(Self::MongoDB)
        } else if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("redis://")
            || lower.starts_with("rediss://")
            || lower.starts_with("redis+unix://")
            || lower.starts_with("unix://")
        {
            Some(Self::Redis)
        } else {
            None
        }
    }

    /// Get the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MongoDB => "MongoDB",
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::Redis => "Redis",
        }
    }

    /// Get the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MongoDB => 27017,
            Self::PostgreSQL => 5432,
            Self::MySQL => 3306,
            Self::Redis => 6379,
        }
    }

    /// Default maximum pool size when none is configured.
    pub fn default_max_pool_size(&self) -> u32 {
        match self {
            Self::MongoDB | Self::MySQL => 10,
            Self::PostgreSQL | Self::Redis => 1,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Pool sizing handed to a backend when opening a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSettings {
    pub max_open: u32,
    /// Half of `max_open`, rounded down.
    pub max_idle: u32,
    pub max_lifetime: Duration,
    /// None leaves the driver default in place.
    pub idle_timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

/// Pool state reported by a live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStatus {
    /// Configured upper bound. Zero when the backend has no pool.
    pub max_open: u32,
    /// Connections currently open.
    pub open: u32,
    /// Open connections not in use.
    pub idle: u32,
}

/// Information about an established connection, returned to callers and
/// printed by the CLI report.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub backend: Backend,
    /// Credentials masked
    pub target: String,
    pub attempts: u32,
    pub pool: PoolStatus,
}

/// Get a display-safe version of a connection string (credentials masked).
pub fn masked_connection_string(connection_string: &str) -> String {
    // Simple masking: replace password in URL
    if let Some(at_pos) = connection_string.rfind('@') {
        let scheme_end = connection_string.find("://").map_or(0, |pos| pos + 3);
        if let Some(colon_pos) = connection_string[scheme_end..at_pos].rfind(':') {
            let colon_pos = scheme_end + colon_pos;
            let prefix = &connection_string[..colon_pos + 1];
            let suffix = &connection_string[at_pos..];
            return format!("{}****{}", prefix, suffix);
        }
    }
    connection_string.to_string()
}
