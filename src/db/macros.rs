//! Connector generation for the sqlx-backed relational stores.
//!
//! PostgreSQL and MySQL differ only in their pool types, so the connector is
//! generated once per dialect instead of being written out twice.

/// Generate a unit-struct [`Connector`](crate::db::Connector) over an sqlx pool.
///
/// # Example
///
/// ```ignore
/// impl_sql_connector!(PostgresConnector, Backend::PostgreSQL, PgPool, PgPoolOptions);
/// ```
#[macro_export]
macro_rules! impl_sql_connector {
    ($connector:ident, $backend:expr, $pool:ty, $pool_options:ty) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $connector;

        impl $connector {
            /// Pool options carrying `pool`'s sizing and timeouts.
            pub fn pool_options(pool: &$crate::models::PoolSettings) -> $pool_options {
                // sqlx has no cap on idle connections, so `max_idle` is not applied
                let options = <$pool_options>::new()
                    .min_connections(0)
                    .max_connections(pool.max_open)
                    .max_lifetime(pool.max_lifetime)
                    .acquire_timeout(pool.connect_timeout);
                match pool.idle_timeout {
                    Some(idle) => options.idle_timeout(idle),
                    None => options,
                }
            }
        }

        impl $crate::db::bootstrap::Connector for $connector {
            type Handle = $pool;

            fn backend(&self) -> $crate::models::Backend {
                $backend
            }

            async fn open(
                &self,
                dsn: &str,
                _config: &$crate::config::ConnectConfig,
                pool: &$crate::models::PoolSettings,
            ) -> Result<$pool, $crate::error::BackendError> {
                Ok(Self::pool_options(pool).connect(dsn).await?)
            }

            async fn ping(&self, handle: &$pool) -> Result<(), $crate::error::BackendError> {
                use sqlx::Connection as _;

                let mut conn = handle.acquire().await?;
                conn.ping().await?;
                Ok(())
            }

            fn pool_status(
                &self,
                handle: &$pool,
            ) -> Result<$crate::models::PoolStatus, $crate::error::BackendError> {
                if handle.is_closed() {
                    return Err($crate::error::BackendError::message("pool is closed"));
                }
                Ok($crate::models::PoolStatus {
                    max_open: handle.options().get_max_connections(),
                    open: handle.size(),
                    idle: u32::try_from(handle.num_idle()).unwrap_or(u32::MAX),
                })
            }

            async fn close(&self, handle: $pool) -> Result<(), $crate::error::BackendError> {
                handle.close().await;
                Ok(())
            }
        }
    };
}
