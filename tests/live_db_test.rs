//! Bootstrap against real servers.
//!
//! Each test needs its backend's TEST_*_URL environment variable and skips
//! itself otherwise.

use dbx::ConnectConfig;
use dbx::db::{MySqlManager, mongo, postgres, redis};
use dbx::models::Backend;
use std::time::Duration;

fn live_url(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: {} not set", var);
            None
        }
    }
}

fn config(backend: Backend) -> ConnectConfig {
    ConnectConfig::new(backend)
        .with_conn_attempts(3)
        .with_conn_timeout(Duration::from_millis(500))
}

/// Set TEST_POSTGRES_URL environment variable to run this test.
#[tokio::test]
async fn test_postgres_pool_is_sized() {
    let Some(url) = live_url("TEST_POSTGRES_URL") else {
        return;
    };

    let mut conn = postgres::connect(&url, config(Backend::PostgreSQL).with_max_pool_size(4))
        .await
        .unwrap();
    assert_eq!(conn.info().pool.max_open, 4);

    let pool = conn.handle().unwrap().clone();
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
    assert_eq!(row.0, 1);

    conn.close().await.unwrap();
    assert!(pool.is_closed());
}

/// Set TEST_MYSQL_URL environment variable to run this test.
#[tokio::test]
async fn test_mysql_manager_round_trip() {
    let Some(url) = live_url("TEST_MYSQL_URL") else {
        return;
    };

    let manager = MySqlManager::default();
    manager
        .add_database("live", url, config(Backend::MySQL).with_max_pool_size(5))
        .await;
    manager.connect("live").await.unwrap();

    let pool = manager.get_db("live").await.unwrap();
    let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
    assert_eq!(row.0, 1);
    assert_eq!(manager.connection_info("live").await.unwrap().pool.max_open, 5);

    manager.close_all().await;
    assert!(pool.is_closed());
    assert!(manager.get_db("live").await.is_err());
}

/// Set TEST_MONGO_URL environment variable to run this test.
#[tokio::test]
async fn test_mongo_connects_and_closes() {
    let Some(url) = live_url("TEST_MONGO_URL") else {
        return;
    };

    let mut conn = mongo::connect(&url, config(Backend::MongoDB).with_database("dbx_test"))
        .await
        .unwrap();
    let handle = conn.handle().unwrap().clone();
    assert_eq!(handle.database().map(|db| db.name()), Some("dbx_test"));
    assert_eq!(conn.info().pool.max_open, 10);

    conn.close().await.unwrap();
}

/// Set TEST_REDIS_URL environment variable to run this test.
#[tokio::test]
async fn test_redis_ping() {
    let Some(url) = live_url("TEST_REDIS_URL") else {
        return;
    };

    let mut conn = redis::connect(&url, config(Backend::Redis)).await.unwrap();
    let mut connection = conn.handle().unwrap().connection();
    let pong: String = ::redis::cmd("PING")
        .query_async(&mut connection)
        .await
        .unwrap();
    assert_eq!(pong, "PONG");

    conn.close().await.unwrap();
    conn.close().await.unwrap();
}
