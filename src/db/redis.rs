//! Redis bootstrap.
//!
//! Redis is reached through a single multiplexed connection, so the pool size
//! has nothing to act on; the connect timeout bounds both connecting and
//! command responses.

use crate::config::ConnectConfig;
use crate::db::bootstrap::{Connection, Connector, connect_with_retry};
use crate::error::{BackendError, DbResult};
use crate::models::{Backend, PoolSettings, PoolStatus};
use ::redis::{AsyncConnectionConfig, IntoConnectionInfo};
use ::redis::aio::MultiplexedConnection;

/// Prefix a bare `host:port` address with the `redis://` scheme.
pub fn normalize_address(dsn: &str) -> String {
    if dsn.contains("://") {
        dsn.to_string()
    } else {
        format!("redis://{}", dsn)
    }
}

/// A multiplexed Redis connection. Clones share the same socket.
#[derive(Clone)]
pub struct RedisHandle {
    connection: MultiplexedConnection,
}

impl RedisHandle {
    /// A connection for issuing commands.
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

impl std::fmt::Debug for RedisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHandle").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

impl Connector for RedisConnector {
    type Handle = RedisHandle;

    fn backend(&self) -> Backend {
        Backend::Redis
    }

    async fn open(
        &self,
        dsn: &str,
        config: &ConnectConfig,
        pool: &PoolSettings,
    ) -> Result<RedisHandle, BackendError> {
        let mut info = normalize_address(dsn).into_connection_info()?;
        if let Some(password) = &config.password {
            info.redis.password = Some(password.clone());
        }

        let client = ::redis::Client::open(info)?;
        let connection_config = AsyncConnectionConfig::new()
            .set_connection_timeout(pool.connect_timeout)
            .set_response_timeout(pool.connect_timeout);
        let connection = client
            .get_multiplexed_async_connection_with_config(&connection_config)
            .await?;
        Ok(RedisHandle { connection })
    }

    async fn ping(&self, handle: &RedisHandle) -> Result<(), BackendError> {
        let mut connection = handle.connection();
        let response: String = ::redis::cmd("PING").query_async(&mut connection).await?;
        if response != "PONG" {
            return Err(BackendError::message(format!(
                "unexpected PING response: {}",
                response
            )));
        }
        Ok(())
    }

    fn pool_status(&self, _handle: &RedisHandle) -> Result<PoolStatus, BackendError> {
        Ok(PoolStatus {
            max_open: 1,
            open: 1,
            idle: 0,
        })
    }

    // The socket closes once the last clone is dropped.
    async fn close(&self, handle: RedisHandle) -> Result<(), BackendError> {
        drop(handle);
        Ok(())
    }
}

/// An established Redis connection.
pub type RedisConnection = Connection<RedisConnector>;

/// Connect to Redis with retry. `dsn` may be a URL or a bare `host:port`.
pub async fn connect(dsn: &str, config: ConnectConfig) -> DbResult<RedisConnection> {
    connect_with_retry(RedisConnector, dsn, config).await
}
