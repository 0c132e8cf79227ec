//! Configuration handling for dbx.
//!
//! This module provides the per-connection configuration record, the parser for
//! `name=url?key=value` targets, and the CLI configuration (arguments and
//! environment variables).

use crate::db::redis::normalize_address;
use crate::error::{DbError, DbResult};
use crate::models::{Backend, MAX_CONN_LIFETIME, PoolSettings};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::form_urlencoded;

pub const DEFAULT_CONN_ATTEMPTS: u32 = 10;
pub const DEFAULT_CONN_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for a single connection bootstrap.
///
/// Start from [`ConnectConfig::new`] for the backend defaults and chain the
/// `with_*` setters; a later setter overrides an earlier one. Values are not
/// validated and reach the driver as given.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Maximum number of open connections in the pool.
    pub max_pool_size: u32,
    /// Number of connect attempts before giving up. Zero never attempts.
    pub conn_attempts: u32,
    /// Delay between attempts. Also bounds driver connect and close.
    pub conn_timeout: Duration,
    /// How long a pooled connection may stay idle (driver default when None).
    #[serde(default)]
    pub max_idle_time: Option<Duration>,
    /// Database selected on the handle (MongoDB).
    #[serde(default)]
    pub database: Option<String>,
    /// Contains sensitive data - never log
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl ConnectConfig {
    /// Default configuration for a backend.
    pub fn new(backend: Backend) -> Self {
        Self {
            max_pool_size: backend.default_max_pool_size(),
            conn_attempts: DEFAULT_CONN_ATTEMPTS,
            conn_timeout: DEFAULT_CONN_TIMEOUT,
            max_idle_time: None,
            database: None,
            password: None,
        }
    }

    pub fn with_max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn with_conn_attempts(mut self, attempts: u32) -> Self {
        self.conn_attempts = attempts;
        self
    }

    pub fn with_conn_timeout(mut self, timeout: Duration) -> Self {
        self.conn_timeout = timeout;
        self
    }

    pub fn with_max_idle_time(mut self, idle: Duration) -> Self {
        self.max_idle_time = Some(idle);
        self
    }

    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Pool sizing derived from this configuration.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_open: self.max_pool_size,
            max_idle: self.max_pool_size / 2,
            max_lifetime: MAX_CONN_LIFETIME,
            idle_timeout: self.max_idle_time,
            connect_timeout: self.conn_timeout,
        }
    }
}

impl std::fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("max_pool_size", &self.max_pool_size)
            .field("conn_attempts", &self.conn_attempts)
            .field("conn_timeout", &self.conn_timeout)
            .field("max_idle_time", &self.max_idle_time)
            .field("database", &self.database)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// Optional overrides layered onto a [`ConnectConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub max_pool_size: Option<u32>,
    pub conn_attempts: Option<u32>,
    pub conn_timeout_ms: Option<u64>,
    pub max_idle_time_secs: Option<u64>,
    pub database: Option<String>,
}

impl ConfigOverrides {
    /// Apply every set field; unset fields keep the current value.
    pub fn apply(&self, mut config: ConnectConfig) -> ConnectConfig {
        if let Some(size) = self.max_pool_size {
            config = config.with_max_pool_size(size);
        }
        if let Some(attempts) = self.conn_attempts {
            config = config.with_conn_attempts(attempts);
        }
        if let Some(ms) = self.conn_timeout_ms {
            config = config.with_conn_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = self.max_idle_time_secs {
            config = config.with_max_idle_time(Duration::from_secs(secs));
        }
        if let Some(database) = &self.database {
            config = config.with_database(database.clone());
        }
        config
    }
}

/// A connection target parsed from a CLI argument.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    /// From "name=url" format, otherwise the database name from the URL path,
    /// otherwise the backend name in lowercase.
    pub name: String,
    pub backend: Backend,
    /// Driver DSN with the override keys removed (sensitive - not logged).
    pub dsn: String,
    pub overrides: ConfigOverrides,
}

impl TargetSpec {
    /// Query keys consumed here instead of being passed to the driver.
    const OVERRIDE_KEYS: &'static [&'static str] = &[
        "max_pool_size",
        "conn_attempts",
        "conn_timeout_ms",
        "max_idle_time_secs",
        "database",
    ];

    /// Parse a target for the given backend.
    ///
    /// # Format
    ///
    /// - `connection_string`
    /// - `name=connection_string`
    /// - either form followed by `?max_pool_size=5&conn_attempts=3`
    ///
    /// Redis accepts a bare `host:port`, which is rewritten to `redis://host:port`.
    pub fn parse(s: &str, backend: Backend) -> DbResult<Self> {
        let s = s.trim();

        // Split name=url format (only if '=' before '://' or the first '?')
        let head_end = s
            .find("://")
            .or_else(|| s.find('?'))
            .unwrap_or(s.len());
        let (explicit_name, dsn) = match s[..head_end].find('=') {
            Some(idx) => (Some(s[..idx].trim()), s[idx + 1..].trim()),
            None => (None, s),
        };

        if explicit_name.is_some_and(str::is_empty) {
            return Err(DbError::invalid_input(format!(
                "Empty connection name for {} target",
                backend
            )));
        }
        if dsn.is_empty() {
            return Err(DbError::invalid_input("Connection string cannot be empty"));
        }

        let dsn = match backend {
            Backend::Redis => normalize_address(dsn),
            _ => dsn.to_string(),
        };
        if !dsn.contains("://") {
            return Err(DbError::invalid_input(format!(
                "Invalid {} connection string: missing scheme",
                backend
            )));
        }

        // The DSN is not round-tripped through a URL parser: multi-host
        // MongoDB URIs and driver-specific query keys must reach the driver as written
        let (dsn, mut opts) = Self::extract_options(&dsn, Self::OVERRIDE_KEYS);
        let overrides = Self::parse_overrides(&mut opts)?;

        let name = explicit_name
            .map(String::from)
            .or_else(|| Self::db_name(&dsn))
            .unwrap_or_else(|| backend.display_name().to_lowercase());

        Ok(Self {
            name,
            backend,
            dsn,
            overrides,
        })
    }

    /// Backend defaults, then `global`, then this target's own overrides.
    pub fn config(&self, global: &ConfigOverrides) -> ConnectConfig {
        self.overrides
            .apply(global.apply(ConnectConfig::new(self.backend)))
    }

    fn parse_overrides(opts: &mut HashMap<String, String>) -> DbResult<ConfigOverrides> {
        fn number<T: std::str::FromStr>(
            opts: &mut HashMap<String, String>,
            key: &str,
        ) -> DbResult<Option<T>> {
            opts.remove(key)
                .map(|v| {
                    v.parse::<T>().map_err(|_| {
                        DbError::invalid_input(format!("Invalid value for '{}': {}", key, v))
                    })
                })
                .transpose()
        }

        Ok(ConfigOverrides {
            max_pool_size: number(opts, "max_pool_size")?,
            conn_attempts: number(opts, "conn_attempts")?,
            conn_timeout_ms: number(opts, "conn_timeout_ms")?,
            max_idle_time_secs: number(opts, "max_idle_time_secs")?,
            database: opts.remove("database").filter(|v| !v.is_empty()),
        })
    }

    /// Extract dbx-specific options from the query string, keeping every other
    /// pair byte-for-byte for the driver.
    fn extract_options(dsn: &str, keys: &[&str]) -> (String, HashMap<String, String>) {
        let mut opts = HashMap::new();
        let Some((base, query)) = dsn.split_once('?') else {
            return (dsn.to_string(), opts);
        };

        let remaining: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let Some((k, v)) = form_urlencoded::parse(pair.as_bytes()).next() else {
                    return true;
                };
                let key_lower = k.to_ascii_lowercase();
                if keys.contains(&key_lower.as_str()) {
                    opts.insert(key_lower, v.into_owned());
                    false
                } else {
                    true
                }
            })
            .collect();

        let dsn = if remaining.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, remaining.join("&"))
        };
        (dsn, opts)
    }

    /// Last path segment after the host list, if any.
    fn db_name(dsn: &str) -> Option<String> {
        let base = dsn.split_once('?').map_or(dsn, |(base, _)| base);
        let after_scheme = base.split_once("://").map_or(base, |(_, rest)| rest);
        let (_, path) = after_scheme.split_once('/')?;
        path.rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

/// Configuration for the dbx connectivity check.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dbx",
    about = "Bootstrap connections to MongoDB, PostgreSQL, MySQL and Redis and report their pools",
    version,
    author
)]
pub struct Config {
    /// PostgreSQL connection string.
    #[arg(long, value_name = "URL", env = "DBX_POSTGRES")]
    pub postgres: Option<String>,

    /// MySQL connections, registered by name.
    /// Format: "connection_string" or "name=connection_string".
    /// Can be specified multiple times.
    #[arg(
        long = "mysql",
        value_name = "URL",
        env = "DBX_MYSQL",
        value_delimiter = ','
    )]
    pub mysql: Vec<String>,

    /// MongoDB connection string.
    #[arg(long, value_name = "URL", env = "DBX_MONGO")]
    pub mongo: Option<String>,

    /// Redis connection string or host:port address.
    #[arg(long, value_name = "URL", env = "DBX_REDIS")]
    pub redis: Option<String>,

    /// Connect attempts per target (default: 10)
    #[arg(long, env = "DBX_CONN_ATTEMPTS")]
    pub conn_attempts: Option<u32>,

    /// Delay between attempts in milliseconds (default: 1000)
    #[arg(long, env = "DBX_CONN_TIMEOUT_MS")]
    pub conn_timeout_ms: Option<u64>,

    /// Maximum pool size (default depends on the backend)
    #[arg(long, env = "DBX_MAX_POOL_SIZE")]
    pub max_pool_size: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "DBX_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBX_JSON_LOGS")]
    pub json_logs: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Config {
    /// Overrides shared by every target.
    pub fn global_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_pool_size: self.max_pool_size,
            conn_attempts: self.conn_attempts,
            conn_timeout_ms: self.conn_timeout_ms,
            ..ConfigOverrides::default()
        }
    }

    /// Parse every configured target, in backend order.
    pub fn targets(&self) -> DbResult<Vec<TargetSpec>> {
        let mut targets = Vec::new();
        if let Some(dsn) = &self.postgres {
            targets.push(TargetSpec::parse(dsn, Backend::PostgreSQL)?);
        }
        for dsn in &self.mysql {
            targets.push(TargetSpec::parse(dsn, Backend::MySQL)?);
        }
        if let Some(dsn) = &self.mongo {
            targets.push(TargetSpec::parse(dsn, Backend::MongoDB)?);
        }
        if let Some(dsn) = &self.redis {
            targets.push(TargetSpec::parse(dsn, Backend::Redis)?);
        }
        Ok(targets)
    }
}
