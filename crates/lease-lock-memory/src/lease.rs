//! In-process lease implementation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lease_lock_core::error::LockResult;
use lease_lock_core::timeout::validate_ttl;
use lease_lock_core::traits::Lease;
use lease_lock_core::watchdog::Watchdog;
use tracing::{debug, instrument};

use crate::lock::HeldTable;

/// Lease on a key of a [`MemoryLock`](crate::MemoryLock).
///
/// Dropping the lease without releasing it leaves the key held until the
/// watchdog fires at the end of the TTL.
pub struct MemoryLease {
    inner: Arc<LeaseState>,
}

struct LeaseState {
    key: String,
    /// Identifies this lease in the held table; a newer holder of the same
    /// key always has a different generation.
    generation: u64,
    held: HeldTable,
    released: AtomicBool,
    watchdog: Watchdog,
}

impl MemoryLease {
    pub(crate) fn new(key: String, generation: u64, held: HeldTable) -> Self {
        Self {
            inner: Arc::new(LeaseState {
                key,
                generation,
                held,
                released: AtomicBool::new(false),
                watchdog: Watchdog::new(),
            }),
        }
    }

    /// Arms the watchdog to release this lease after `ttl`.
    pub(crate) fn schedule_expiry(&self, ttl: Duration) {
        let inner = self.inner.clone();
        self.inner.watchdog.arm(ttl, move || async move {
            debug!(lock.key = %inner.key, backend = "memory", "ttl elapsed, releasing lease");
            inner.release();
        });
    }
}

impl fmt::Debug for MemoryLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLease")
            .field("key", &self.inner.key)
            .field("generation", &self.inner.generation)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl LeaseState {
    /// Returns true if this lease's entry is still the one in the table.
    fn is_current(&self, held: &std::collections::HashMap<String, u64>) -> bool {
        held.get(&self.key) == Some(&self.generation)
    }

    fn release(&self) {
        // Flipped under the table lock so a concurrent extend sees it
        let mut held = self.held.lock();
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.watchdog.disarm();

        if self.is_current(&held) {
            held.remove(&self.key);
        } else {
            debug!(lock.key = %self.key, "key already taken over by a newer lease");
        }
    }
}

impl Lease for MemoryLease {
    fn key(&self) -> &str {
        &self.inner.key
    }

    fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    #[instrument(skip(self), fields(lock.key = %self.inner.key, backend = "memory"))]
    async fn release(&self) -> LockResult<()> {
        self.inner.release();
        Ok(())
    }

    #[instrument(skip(self), fields(lock.key = %self.inner.key, backend = "memory"))]
    async fn extend(&self, ttl: Duration) -> LockResult<bool> {
        validate_ttl(ttl)?;

        let held = self.inner.held.lock();
        if self.is_released() || !self.inner.is_current(&held) {
            return Ok(false);
        }
        self.schedule_expiry(ttl);
        Ok(true)
    }
}
