//! Named connection registry.
//!
//! Maps a logical name to its configuration and, once connected, its handle.
//!
//! # Concurrency
//!
//! - The name map sits behind a `RwLock` that is only held to look up, insert
//!   or swap entries, never across a connect.
//! - Each entry owns a `OnceCell` for its handle. Concurrent `connect` calls for
//!   the same name wait on the first one (single-flight); other names are not
//!   blocked by a slow or retrying connect.
//! - `get_db` only reads an initialized cell and never waits for an in-flight
//!   connect.
//! - Re-registering a name shares the existing slot, so a connect in flight
//!   still lands where `get_db` looks. `close_all` gives every name a fresh
//!   slot; a connect that finishes into a retired slot closes its own handle
//!   and reports `ConnectionClosed`.
//! - A handle in a retired slot is closed exactly once, by whichever of
//!   `close_all` or the finishing connect claims it first.

use crate::config::ConnectConfig;
use crate::db::bootstrap::{Connector, Established, close_handle, establish};
use crate::error::{DbError, DbResult};
use crate::models::ConnectionInfo;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

/// Handle cell for one registration.
struct Slot<H> {
    cell: OnceCell<Established<H>>,
    released: AtomicBool,
}

impl<H: Clone> Slot<H> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cell: OnceCell::new(),
            released: AtomicBool::new(false),
        })
    }

    fn is_connected(&self) -> bool {
        self.cell.initialized()
    }

    /// Take responsibility for closing the handle. Only the first caller gets it.
    fn claim(&self) -> Option<H> {
        let established = self.cell.get()?;
        if self.released.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(established.handle.clone())
    }
}

struct RegistryEntry<H> {
    /// Contains sensitive data - never log
    dsn: String,
    config: ConnectConfig,
    slot: Arc<Slot<H>>,
}

impl<H: Clone> RegistryEntry<H> {
    fn new(dsn: String, config: ConnectConfig, slot: Arc<Slot<H>>) -> Arc<Self> {
        Arc::new(Self { dsn, config, slot })
    }

    /// Same configuration, fresh slot.
    fn reset(&self) -> Arc<Self> {
        Self::new(self.dsn.clone(), self.config.clone(), Slot::new())
    }
}

/// Registry of named connections for one backend.
///
/// Configurations are registered with [`add_database`](Self::add_database) and
/// connected lazily with [`connect`](Self::connect). Construct one and pass it
/// by reference (or in an `Arc`) to whatever needs it.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    entries: RwLock<HashMap<String, Arc<RegistryEntry<C::Handle>>>>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create an empty registry.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace the configuration for `name`.
    ///
    /// An established or in-flight handle is kept; the new configuration is
    /// used the next time the name connects after [`close_all`](Self::close_all).
    pub async fn add_database(
        &self,
        name: impl Into<String>,
        dsn: impl Into<String>,
        config: ConnectConfig,
    ) {
        let name = name.into();
        let mut entries = self.entries.write().await;
        let slot = match entries.get(&name) {
            Some(existing) => Arc::clone(&existing.slot),
            None => Slot::new(),
        };
        debug!(
            name = %name,
            backend = %self.connector.backend(),
            connected = slot.is_connected(),
            "Registered database config"
        );
        entries.insert(name, RegistryEntry::new(dsn.into(), config, slot));
    }

    /// Connect `name` if it is not connected yet.
    ///
    /// Returns immediately when the name is already connected. Fails with
    /// `ConfigNotFound` when the name was never registered, and with
    /// `ConnectionClosed` when [`close_all`](Self::close_all) ran before the
    /// connect finished; the handle it produced is closed in that case.
    pub async fn connect(&self, name: &str) -> DbResult<()> {
        let entry = self.entry(name).await?;
        if entry.slot.is_connected() {
            return Ok(());
        }

        entry
            .slot
            .cell
            .get_or_try_init(|| async {
                info!(name = %name, backend = %self.connector.backend(), "Connecting to database");
                establish(&self.connector, &entry.dsn, &entry.config, name).await
            })
            .await?;

        if self.is_current(name, &entry.slot).await {
            return Ok(());
        }

        // close_all retired this slot while the connect was running
        if let Some(handle) = entry.slot.claim() {
            warn!(name = %name, "Connections closed while connecting, releasing new handle");
            if let Err(e) =
                close_handle(&self.connector, handle, entry.config.conn_timeout, name).await
            {
                warn!(name = %name, error = %e, "Ignoring close failure");
            }
        }
        Err(DbError::connection_closed(name))
    }

    /// The handle for a connected name.
    pub async fn get_db(&self, name: &str) -> DbResult<C::Handle> {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .and_then(|entry| entry.slot.cell.get())
            .map(|established| established.handle.clone())
            .ok_or_else(|| DbError::connection_not_found(name))
    }

    /// What the bootstrap reported for a connected name.
    pub async fn connection_info(&self, name: &str) -> DbResult<ConnectionInfo> {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .and_then(|entry| entry.slot.cell.get())
            .map(|established| established.info.clone())
            .ok_or_else(|| DbError::connection_not_found(name))
    }

    /// Close every established handle and forget it.
    ///
    /// Close errors are logged and skipped so that every handle gets a close
    /// attempt. Registered configurations are kept, so any name can connect
    /// again afterwards.
    pub async fn close_all(&self) {
        // Swap entries under lock, close outside lock
        let to_close: Vec<_> = {
            let mut entries = self.entries.write().await;
            entries
                .iter_mut()
                .filter_map(|(name, entry)| {
                    let fresh = entry.reset();
                    let old = std::mem::replace(entry, fresh);
                    let handle = old.slot.claim();
                    handle.map(|handle| (name.clone(), handle, old.config.conn_timeout))
                })
                .collect()
        }; // Lock released here

        for (name, handle, timeout) in to_close {
            match close_handle(&self.connector, handle, timeout, &name).await {
                Ok(()) => info!(name = %name, "Closed database connection"),
                Err(e) => warn!(name = %name, error = %e, "Ignoring close failure"),
            }
        }
    }

    /// Registered names, connected or not.
    pub async fn names(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut names: Vec<_> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a name is registered.
    pub async fn is_registered(&self, name: &str) -> bool {
        let entries = self.entries.read().await;
        entries.contains_key(name)
    }

    /// Check if a name has an established handle.
    pub async fn is_connected(&self, name: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .is_some_and(|entry| entry.slot.is_connected())
    }

    /// Get the number of established handles.
    pub async fn connection_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|entry| entry.slot.is_connected())
            .count()
    }

    async fn is_current(&self, name: &str, slot: &Arc<Slot<C::Handle>>) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .is_some_and(|entry| Arc::ptr_eq(&entry.slot, slot))
    }

    async fn entry(&self, name: &str) -> DbResult<Arc<RegistryEntry<C::Handle>>> {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::config_not_found(name))
    }
}

impl<C: Connector + Default> Default for ConnectionManager<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("backend", &self.connector.backend())
            .finish_non_exhaustive()
    }
}
