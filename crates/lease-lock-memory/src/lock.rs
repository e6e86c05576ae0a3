//! In-process lock implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lease_lock_core::clock::Clock;
use lease_lock_core::config::LockConfig;
use lease_lock_core::error::LockResult;
use lease_lock_core::timeout::validate_ttl;
use lease_lock_core::traits::Lock;
use parking_lot::Mutex;
use tracing::{Span, field, instrument};

use crate::lease::MemoryLease;

/// Key to generation of the lease currently holding it.
pub(crate) type HeldTable = Arc<Mutex<HashMap<String, u64>>>;

/// Builder for [`MemoryLock`] configuration.
pub struct MemoryLockBuilder {
    config: LockConfig,
}

impl MemoryLockBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: LockConfig::default(),
        }
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

    /// Builds the lock.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the settings are inconsistent.
    pub fn build(self) -> LockResult<MemoryLock> {
        self.config.validate()?;
        Ok(MemoryLock::with_config(self.config))
    }
}

impl Default for MemoryLockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryLockState {
    held: HeldTable,
    next_generation: AtomicU64,
}

/// An in-process lock.
///
/// Each lease arms a local watchdog that releases it when its TTL runs out.
/// Clones share the same key table.
#[derive(Clone)]
pub struct MemoryLock {
    state: Arc<MemoryLockState>,
    config: LockConfig,
}

impl MemoryLock {
    /// Returns a new builder for configuring the lock.
    pub fn builder() -> MemoryLockBuilder {
        MemoryLockBuilder::new()
    }

    /// Creates a lock with default settings.
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    fn with_config(config: LockConfig) -> Self {
        Self {
            state: Arc::new(MemoryLockState {
                held: HeldTable::default(),
                next_generation: AtomicU64::new(1),
            }),
            config,
        }
    }

    /// Returns true if `key` is currently held.
    pub fn is_held(&self, key: &str) -> bool {
        self.state.held.lock().contains_key(key)
    }

    /// Returns the number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.state.held.lock().len()
    }
}

impl Default for MemoryLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for MemoryLock {
    type Lease = MemoryLease;

    fn config(&self) -> &LockConfig {
        &self.config
    }

    #[instrument(skip(self), fields(lock.key = %key, backend = "memory", acquired = field::Empty))]
    async fn try_acquire(&self, key: &str, ttl: Duration) -> LockResult<Option<MemoryLease>> {
        validate_ttl(ttl)?;

        let generation = {
            let mut held = self.state.held.lock();
            if held.contains_key(key) {
                Span::current().record("acquired", false);
                return Ok(None);
            }
            let generation = self.state.next_generation.fetch_add(1, Ordering::Relaxed);
            held.insert(key.to_string(), generation);
            generation
        };

        let lease = MemoryLease::new(key.to_string(), generation, self.state.held.clone());
        lease.schedule_expiry(ttl);
        Span::current().record("acquired", true);
        Ok(Some(lease))
    }
}
