//! Scripted connector shared by the integration tests.

#![allow(dead_code)]

use dbx::config::ConnectConfig;
use dbx::db::Connector;
use dbx::error::BackendError;
use dbx::models::{Backend, PoolSettings, PoolStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Handle handed out by [`ScriptedConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle {
    /// Attempt number that produced this handle.
    pub attempt: u32,
    pub pool: PoolSettings,
}

#[derive(Debug, Default)]
struct Script {
    failures: u32,
    open_delay: Duration,
    fail_ping: bool,
    fail_status: bool,
    fail_close: Vec<String>,
    attempts: u32,
    closed: Vec<u32>,
}

/// A connector whose opens fail a set number of times before succeeding.
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    backend: Backend,
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Fail the first `failures` opens.
    pub fn failing(self, failures: u32) -> Self {
        self.script.lock().unwrap().failures = failures;
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing(u32::MAX)
    }

    /// Every open takes `delay` before answering.
    pub fn slow(self, delay: Duration) -> Self {
        self.script.lock().unwrap().open_delay = delay;
        self
    }

    pub fn failing_ping(self) -> Self {
        self.script.lock().unwrap().fail_ping = true;
        self
    }

    pub fn failing_status(self) -> Self {
        self.script.lock().unwrap().fail_status = true;
        self
    }

    /// Closing a handle opened from a DSN containing `marker` fails.
    pub fn failing_close(self, marker: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .fail_close
            .push(marker.to_string());
        self
    }

    pub fn attempts(&self) -> u32 {
        self.script.lock().unwrap().attempts
    }

    /// Attempt numbers of the handles closed so far.
    pub fn closed(&self) -> Vec<u32> {
        self.script.lock().unwrap().closed.clone()
    }
}

impl Connector for ScriptedConnector {
    type Handle = (FakeHandle, String);

    fn backend(&self) -> Backend {
        self.backend
    }

    async fn open(
        &self,
        dsn: &str,
        _config: &ConnectConfig,
        pool: &PoolSettings,
    ) -> Result<Self::Handle, BackendError> {
        let (attempt, failures, delay) = {
            let mut script = self.script.lock().unwrap();
            script.attempts += 1;
            (script.attempts, script.failures, script.open_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if attempt <= failures {
            return Err(BackendError::message(format!(
                "connection refused (attempt {})",
                attempt
            )));
        }
        Ok((
            FakeHandle {
                attempt,
                pool: *pool,
            },
            dsn.to_string(),
        ))
    }

    async fn ping(&self, _handle: &Self::Handle) -> Result<(), BackendError> {
        if self.script.lock().unwrap().fail_ping {
            return Err(BackendError::message("no pong"));
        }
        Ok(())
    }

    fn pool_status(&self, handle: &Self::Handle) -> Result<PoolStatus, BackendError> {
        if self.script.lock().unwrap().fail_status {
            return Err(BackendError::message("pool is closed"));
        }
        Ok(PoolStatus {
            max_open: handle.0.pool.max_open,
            open: 1,
            idle: 0,
        })
    }

    async fn close(&self, handle: Self::Handle) -> Result<(), BackendError> {
        let mut script = self.script.lock().unwrap();
        script.closed.push(handle.0.attempt);
        if script.fail_close.iter().any(|marker| handle.1.contains(marker)) {
            return Err(BackendError::message("close failed"));
        }
        Ok(())
    }
}
