//! Connection pool management for PostgreSQL locks.

use std::time::Duration;

use lease_lock_core::error::{LockError, LockResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Default pool size when the lock creates its own pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Default wait for a free pooled connection when the lock creates its own pool.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL connection source.
#[derive(Debug, Clone)]
pub enum PostgresConnection {
    /// Connection string - the lock creates and owns the pool.
    ConnectionString(String),
    /// External connection pool.
    Pool(PgPool),
}

impl PostgresConnection {
    /// Creates a connection pool from a connection string.
    ///
    /// Every held lease pins one connection, so `max_connections` bounds the
    /// number of keys one lock can hold at the same time. Once they are all
    /// checked out, an attempt waits up to `acquire_timeout` for one to come
    /// back and then fails with a connection error.
    pub async fn create_pool(
        connection_string: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> LockResult<PgPool> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(connection_string)
            .await
            .map_err(|e| match e {
                sqlx::Error::Configuration(e) => {
                    LockError::InvalidConfig(format!("invalid connection string: {}", e))
                }
                e => LockError::connection(e),
            })
    }

    /// Gets or creates a connection pool.
    pub async fn get_pool(&self, max_connections: u32, acquire_timeout: Duration) -> LockResult<PgPool> {
        match self {
            Self::ConnectionString(conn_str) => {
                Self::create_pool(conn_str, max_connections, acquire_timeout).await
            }
            Self::Pool(pool) => Ok(pool.clone()),
        }
    }
}
