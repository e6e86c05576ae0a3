//! PostgreSQL lease implementation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::timeout::validate_ttl;
use lease_lock_core::traits::Lease;
use lease_lock_core::watchdog::Watchdog;
use sqlx::Postgres;
use sqlx::pool::PoolConnection;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Lease on a key of a [`PostgresLock`](crate::PostgresLock).
///
/// Holds the pooled connection whose session owns the advisory lock.
/// Dropping the lease without releasing it keeps both until the watchdog
/// fires at the end of the TTL.
pub struct PostgresLease {
    inner: Arc<LeaseState>,
}

struct LeaseState {
    key: String,
    lock_id: i64,
    /// Taken exactly once, by the first release.
    connection: Mutex<Option<PoolConnection<Postgres>>>,
    released: AtomicBool,
    watchdog: Watchdog,
}

impl PostgresLease {
    pub(crate) fn new(key: String, lock_id: i64, connection: PoolConnection<Postgres>) -> Self {
        Self {
            inner: Arc::new(LeaseState {
                key,
                lock_id,
                connection: Mutex::new(Some(connection)),
                released: AtomicBool::new(false),
                watchdog: Watchdog::new(),
            }),
        }
    }

    /// Returns the advisory lock id held by this lease.
    pub fn lock_id(&self) -> i64 {
        self.inner.lock_id
    }

    /// Arms the watchdog to release this lease after `ttl`.
    pub(crate) fn schedule_expiry(&self, ttl: Duration) {
        let inner = self.inner.clone();
        self.inner.watchdog.arm(ttl, move || async move {
            debug!(lock.key = %inner.key, backend = "postgres", "ttl elapsed, releasing lease");
            if let Err(e) = inner.release().await {
                warn!(lock.key = %inner.key, error = %e, "automatic release failed");
            }
        });
    }
}

impl fmt::Debug for PostgresLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresLease")
            .field("key", &self.inner.key)
            .field("lock_id", &self.inner.lock_id)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl LeaseState {
    async fn release(&self) -> LockResult<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.watchdog.disarm();

        let Some(mut connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(self.lock_id)
            .fetch_one(&mut *connection)
            .await;

        match unlocked {
            Ok(true) => Ok(()),
            Ok(false) => {
                // The session lost the lock, e.g. after a reconnect
                warn!(lock.key = %self.key, lock.id = self.lock_id, "advisory lock was not held by its session");
                Ok(())
            }
            Err(e) => {
                // Ending the session drops any advisory lock it may still hold
                if let Err(close_error) = connection.close().await {
                    debug!(error = %close_error, "closing connection after failed unlock");
                }
                Err(LockError::backend(e))
            }
        }
    }
}

impl Lease for PostgresLease {
    fn key(&self) -> &str {
        &self.inner.key
    }

    fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Unlocks the advisory lock on the pinned session and returns the
    /// connection to the pool.
    #[instrument(skip(self), fields(lock.key = %self.inner.key, lock.id = self.inner.lock_id, backend = "postgres"))]
    async fn release(&self) -> LockResult<()> {
        self.inner.release().await
    }

    /// Reschedules the local watchdog.
    ///
    /// Advisory locks have no server-side TTL, so this does not contact the
    /// database and `Ok(true)` is not proof that the session still holds the
    /// lock: if the connection dropped, PostgreSQL has already released it.
    #[instrument(skip(self), fields(lock.key = %self.inner.key, lock.id = self.inner.lock_id, backend = "postgres"))]
    async fn extend(&self, ttl: Duration) -> LockResult<bool> {
        validate_ttl(ttl)?;
        if self.is_released() {
            return Ok(false);
        }
        self.schedule_expiry(ttl);
        Ok(true)
    }
}
