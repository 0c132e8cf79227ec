//! Bounded-retry connection bootstrap.
//!
//! Every backend goes through the same sequence: up to `conn_attempts` open
//! attempts separated by a fixed `conn_timeout` sleep, a liveness ping on the
//! new handle, and a pool introspection. Backends plug in through [`Connector`].

use crate::config::ConnectConfig;
use crate::error::{BackendError, DbError, DbResult};
use crate::models::{Backend, ConnectionInfo, PoolSettings, PoolStatus, masked_connection_string};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A backend client that can open, check and close one kind of handle.
///
/// Implementations perform a single attempt per call; retrying is the
/// bootstrap's job.
pub trait Connector: Send + Sync {
    /// Live client object. Clones share the same underlying pool.
    type Handle: Clone + Send + Sync + 'static;

    fn backend(&self) -> Backend;

    /// Open a handle, sized by `pool` where the backend has a pool.
    fn open(
        &self,
        dsn: &str,
        config: &ConnectConfig,
        pool: &PoolSettings,
    ) -> impl Future<Output = Result<Self::Handle, BackendError>> + Send;

    /// Liveness check against an open handle.
    fn ping(&self, handle: &Self::Handle) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Current pool state of an open handle.
    fn pool_status(&self, handle: &Self::Handle) -> Result<PoolStatus, BackendError>;

    /// Release the handle. Callers bound this with a timeout.
    fn close(&self, handle: Self::Handle) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// A handle that passed the bootstrap, with what was learned on the way.
#[derive(Debug, Clone)]
pub(crate) struct Established<H> {
    pub handle: H,
    pub info: ConnectionInfo,
}

/// Run the full bootstrap and return the handle.
///
/// `label` names the target in logs and errors; it must not contain credentials.
pub(crate) async fn establish<C: Connector>(
    connector: &C,
    dsn: &str,
    config: &ConnectConfig,
    label: &str,
) -> DbResult<Established<C::Handle>> {
    let backend = connector.backend();
    let pool = config.pool_settings();

    let mut remaining = config.conn_attempts;
    let mut attempts = 0;
    let mut last_error = None;
    let mut opened = None;

    while remaining > 0 {
        attempts += 1;
        match connector.open(dsn, config, &pool).await {
            Ok(handle) => {
                opened = Some(handle);
                break;
            }
            Err(e) => {
                remaining -= 1;
                warn!(
                    backend = %backend,
                    target = %label,
                    attempts_left = remaining,
                    error = %e,
                    "Connect attempt failed"
                );
                last_error = Some(e);
                if remaining > 0 {
                    tokio::time::sleep(config.conn_timeout).await;
                }
            }
        }
    }

    let Some(handle) = opened else {
        return Err(DbError::connection_exhausted(
            backend, label, attempts, last_error,
        ));
    };

    debug!(backend = %backend, target = %label, attempts, "Connected, checking liveness");

    if let Err(e) = connector.ping(&handle).await {
        discard(connector, handle, config.conn_timeout, label).await;
        return Err(DbError::connectivity_check_failed(backend, label, e));
    }

    let status = match connector.pool_status(&handle) {
        Ok(status) => status,
        Err(e) => {
            discard(connector, handle, config.conn_timeout, label).await;
            return Err(DbError::pool_introspection_failed(backend, label, e));
        }
    };

    info!(
        backend = %backend,
        target = %label,
        attempts,
        max_open = status.max_open,
        open = status.open,
        idle = status.idle,
        "Connected successfully"
    );

    Ok(Established {
        handle,
        info: ConnectionInfo {
            backend,
            target: label.to_string(),
            attempts,
            pool: status,
        },
    })
}

/// Close a handle, giving up after `timeout`.
pub(crate) async fn close_handle<C: Connector>(
    connector: &C,
    handle: C::Handle,
    timeout: Duration,
    label: &str,
) -> DbResult<()> {
    let backend = connector.backend();
    match tokio::time::timeout(timeout, connector.close(handle)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DbError::close_failed(backend, label, e)),
        Err(_) => Err(DbError::close_failed(
            backend,
            label,
            BackendError::message(format!("close timed out after {:?}", timeout)),
        )),
    }
}

// Release a handle that failed a post-connect check; the check's error wins.
async fn discard<C: Connector>(connector: &C, handle: C::Handle, timeout: Duration, label: &str) {
    if let Err(e) = close_handle(connector, handle, timeout, label).await {
        debug!(error = %e, "Failed to release rejected handle");
    }
}

/// Connect to `dsn` with retry, using `connector` for the backend calls.
///
/// Blocks the calling task for at most `conn_attempts × conn_timeout` plus
/// the time the driver spends per attempt.
pub async fn connect_with_retry<C: Connector>(
    connector: C,
    dsn: &str,
    config: ConnectConfig,
) -> DbResult<Connection<C>> {
    let label = masked_connection_string(dsn);
    let established = establish(&connector, dsn, &config, &label).await?;
    Ok(Connection {
        connector,
        handle: Some(established.handle),
        config,
        info: established.info,
    })
}

/// An established connection owned by the caller.
///
/// The handle stays available until [`Connection::close`] is called.
pub struct Connection<C: Connector> {
    connector: C,
    handle: Option<C::Handle>,
    config: ConnectConfig,
    info: ConnectionInfo,
}

impl<C: Connector> Connection<C> {
    /// The live handle, or None once closed.
    pub fn handle(&self) -> Option<&C::Handle> {
        self.handle.as_ref()
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.info.backend
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Close the handle, bounded by the configured connect timeout.
    ///
    /// Closing an already closed connection is a no-op.
    pub async fn close(&mut self) -> DbResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        close_handle(
            &self.connector,
            handle,
            self.config.conn_timeout,
            &self.info.target,
        )
        .await?;
        info!(backend = %self.info.backend, target = %self.info.target, "Connection closed");
        Ok(())
    }
}

impl<C: Connector> std::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("info", &self.info)
            .field("config", &self.config)
            .field("closed", &self.handle.is_none())
            .finish_non_exhaustive()
    }
}
