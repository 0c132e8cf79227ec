//! MongoDB bootstrap.

use crate::config::ConnectConfig;
use crate::db::bootstrap::{Connection, Connector, connect_with_retry};
use crate::error::{BackendError, DbResult};
use crate::models::{Backend, PoolSettings, PoolStatus};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

/// A MongoDB client together with the database selected for it.
#[derive(Debug, Clone)]
pub struct MongoHandle {
    client: Client,
    database: Option<Database>,
    max_pool_size: u32,
}

impl MongoHandle {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The configured database, falling back to the one named in the URI.
    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

impl Connector for MongoConnector {
    type Handle = MongoHandle;

    fn backend(&self) -> Backend {
        Backend::MongoDB
    }

    async fn open(
        &self,
        dsn: &str,
        config: &ConnectConfig,
        pool: &PoolSettings,
    ) -> Result<MongoHandle, BackendError> {
        let mut options = ClientOptions::parse(dsn).await?;
        options.max_pool_size = Some(pool.max_open);
        options.connect_timeout = Some(pool.connect_timeout);
        if let Some(idle) = pool.idle_timeout {
            options.max_idle_time = Some(idle);
        }

        let client = Client::with_options(options)?;
        let database = match config.database.as_deref() {
            Some(name) => Some(client.database(name)),
            None => client.default_database(),
        };

        Ok(MongoHandle {
            client,
            database,
            max_pool_size: pool.max_open,
        })
    }

    async fn ping(&self, handle: &MongoHandle) -> Result<(), BackendError> {
        handle
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    // The driver does not expose live pool counters.
    fn pool_status(&self, handle: &MongoHandle) -> Result<PoolStatus, BackendError> {
        Ok(PoolStatus {
            max_open: handle.max_pool_size,
            ..PoolStatus::default()
        })
    }

    async fn close(&self, handle: MongoHandle) -> Result<(), BackendError> {
        handle.client.shutdown().await;
        Ok(())
    }
}

/// An established MongoDB client.
pub type MongoConnection = Connection<MongoConnector>;

/// Connect to MongoDB with retry.
pub async fn connect(dsn: &str, config: ConnectConfig) -> DbResult<MongoConnection> {
    connect_with_retry(MongoConnector, dsn, config).await
}
