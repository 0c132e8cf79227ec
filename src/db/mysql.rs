//! MySQL bootstrap.
//!
//! MySQL is also the backend served by the named registry, see [`MySqlManager`].

use crate::config::ConnectConfig;
use crate::db::bootstrap::{Connection, connect_with_retry};
use crate::db::manager::ConnectionManager;
use crate::error::DbResult;
use crate::models::Backend;
use sqlx::{MySqlPool, mysql::MySqlPoolOptions};

impl_sql_connector!(MySqlConnector, Backend::MySQL, MySqlPool, MySqlPoolOptions);

/// An established MySQL pool.
pub type MySqlConnection = Connection<MySqlConnector>;

/// Named MySQL connections.
pub type MySqlManager = ConnectionManager<MySqlConnector>;

/// Connect to MySQL with retry.
pub async fn connect(dsn: &str, config: ConnectConfig) -> DbResult<MySqlConnection> {
    connect_with_retry(MySqlConnector, dsn, config).await
}
