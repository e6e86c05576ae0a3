//! PostgreSQL lock implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lease_lock_core::clock::Clock;
use lease_lock_core::config::LockConfig;
use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::timeout::validate_ttl;
use lease_lock_core::traits::Lock;
use sqlx::PgPool;
use tracing::{Span, field, instrument};

use crate::connection::{DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS, PostgresConnection};
use crate::key::{KeyHasher, default_hasher};
use crate::lease::PostgresLease;

/// Builder for [`PostgresLock`] configuration.
pub struct PostgresLockBuilder {
    connection: Option<PostgresConnection>,
    max_connections: u32,
    acquire_timeout: Duration,
    hasher: KeyHasher,
    config: LockConfig,
}

impl PostgresLockBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            connection: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            hasher: default_hasher(),
            config: LockConfig::default(),
        }
    }

    /// Sets the PostgreSQL connection string.
    pub fn connection_string(mut self, conn_str: impl Into<String>) -> Self {
        self.connection = Some(PostgresConnection::ConnectionString(conn_str.into()));
        self
    }

    /// Sets an existing connection pool.
    pub fn pool(mut self, pool: PgPool) -> Self {
        self.connection = Some(PostgresConnection::Pool(pool));
        self
    }

    /// Sets the pool size used when building from a connection string.
    ///
    /// Every held lease keeps one connection checked out. With all of them
    /// held, `try_acquire` on another key waits for a free connection (see
    /// [`connection_acquire_timeout`](Self::connection_acquire_timeout)); that
    /// wait is not bounded by the `acquire` deadline or cancellation signal.
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Sets how long an attempt waits for a free pooled connection before
    /// failing with [`LockError::Connection`]. Only applies when building
    /// from a connection string; an external pool keeps its own setting.
    pub fn connection_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Overrides how lock keys map to advisory lock ids.
    pub fn key_hasher(mut self, hasher: impl Fn(&str) -> i64 + Send + Sync + 'static) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Replaces all acquisition settings.
    pub fn config(mut self, config: LockConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the timeout used when `acquire` is called without one.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Sets the delay between attempts while `acquire` waits.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sets the time source for acquisition deadlines.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = clock;
        self
    }

    /// Builds the lock, creating a pool if a connection string was given.
    pub async fn build(self) -> LockResult<PostgresLock> {
        self.config.validate()?;
        if self.max_connections == 0 {
            return Err(LockError::InvalidConfig(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.acquire_timeout.is_zero() {
            return Err(LockError::InvalidConfig(
                "connection acquire timeout must be greater than zero".to_string(),
            ));
        }
        let connection = self
            .connection
            .ok_or_else(|| LockError::InvalidConfig("connection not specified".to_string()))?;

        let pool = connection
            .get_pool(self.max_connections, self.acquire_timeout)
            .await?;

        Ok(PostgresLock {
            pool,
            hasher: self.hasher,
            config: self.config,
        })
    }
}

impl Default for PostgresLockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A PostgreSQL advisory-lock based lock.
///
/// Each held lease keeps one pooled connection checked out, because an
/// advisory lock belongs to the session that took it.
#[derive(Clone)]
pub struct PostgresLock {
    pool: PgPool,
    hasher: KeyHasher,
    config: LockConfig,
}

impl fmt::Debug for PostgresLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresLock")
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PostgresLock {
    /// Returns a new builder for configuring the lock.
    pub fn builder() -> PostgresLockBuilder {
        PostgresLockBuilder::new()
    }

    /// Creates a lock using the specified connection string.
    pub async fn new(connection_string: impl Into<String>) -> LockResult<Self> {
        Self::builder()
            .connection_string(connection_string)
            .build()
            .await
    }

    /// Returns the advisory lock id `key` maps to.
    pub fn lock_id(&self, key: &str) -> i64 {
        (self.hasher)(key)
    }
}

impl Lock for PostgresLock {
    type Lease = PostgresLease;

    fn config(&self) -> &LockConfig {
        &self.config
    }

    #[instrument(skip(self), fields(lock.key = %key, backend = "postgres", lock.id = field::Empty, acquired = field::Empty))]
    async fn try_acquire(&self, key: &str, ttl: Duration) -> LockResult<Option<PostgresLease>> {
        validate_ttl(ttl)?;
        let lock_id = self.lock_id(key);
        Span::current().record("lock.id", lock_id);

        let mut connection = self.pool.acquire().await.map_err(LockError::connection)?;

        // On error or contention the connection goes back to the pool on drop
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(lock_id)
            .fetch_one(&mut *connection)
            .await
            .map_err(LockError::backend)?;

        if !acquired {
            Span::current().record("acquired", false);
            return Ok(None);
        }

        let lease = PostgresLease::new(key.to_string(), lock_id, connection);
        lease.schedule_expiry(ttl);
        Span::current().record("acquired", true);
        Ok(Some(lease))
    }
}
