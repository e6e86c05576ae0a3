//! Core traits for time-bounded locks.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{Instrument, debug, debug_span};

use crate::cancel::CancelSignal;
use crate::config::LockConfig;
use crate::error::LockResult;
use crate::poll::{PollOptions, PollOutcome, poll_until};
use crate::timeout::{TimeoutValue, validate_ttl};

// ============================================================================
// Lease Trait
// ============================================================================

/// Exclusive, time-bounded ownership of one lock key.
///
/// A lease is only ever created by a successful acquisition and moves from
/// held to released exactly once: by [`Lease::release`], by its TTL running
/// out, or (for session-scoped backends) when the owning session ends.
/// Calling `release` or `extend` after that point is a no-op, not an error.
///
/// # Example
///
/// ```rust,ignore
/// if let Some(lease) = lock.try_acquire("invoices", Duration::from_secs(30)).await? {
///     // Critical section - we hold the key
///     reconcile().await;
///     lease.release().await?;
/// }
/// ```
pub trait Lease: Send + Sync + fmt::Debug {
    /// Returns the key this lease was acquired for.
    fn key(&self) -> &str;

    /// Returns true once the lease has been released by any path.
    fn is_released(&self) -> bool;

    /// Releases the lease.
    ///
    /// Only the first call does any work: it stops the local TTL watchdog,
    /// if the backend has one, and releases the key on the backend only if
    /// this lease still owns it. Finding that someone else already owns the
    /// key is not an error. Backend failures are returned.
    fn release(&self) -> impl Future<Output = LockResult<()>> + Send;

    /// Renews the lease for another `ttl`.
    ///
    /// Returns `Ok(false)` without touching the backend when the lease is
    /// already released, and `Ok(false)` when the backend reports that this
    /// lease no longer owns the key. Backends that cannot check ownership
    /// document how much `Ok(true)` actually proves.
    fn extend(&self, ttl: Duration) -> impl Future<Output = LockResult<bool>> + Send;
}

// ============================================================================
// Lock Trait
// ============================================================================

/// Options for [`Lock::acquire`].
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Lease TTL.
    pub ttl: Duration,
    /// Total time to wait. `None` falls back to the lock's default timeout;
    /// zero makes a single attempt.
    pub timeout: Option<TimeoutValue>,
    /// Stops the wait early when fired. Has no effect once a lease is held.
    pub signal: Option<CancelSignal>,
}

impl AcquireOptions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            timeout: None,
            signal: None,
        }
    }

    pub fn timeout(mut self, timeout: impl Into<TimeoutValue>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// A backend that grants leases over string keys.
///
/// Implementations provide the single non-blocking attempt; the waiting
/// variant is shared by all backends so they behave identically while
/// waiting.
///
/// # Example
///
/// ```rust,ignore
/// use lease_lock_core::{AcquireOptions, Lease, Lock};
///
/// async fn rebuild_index(lock: &impl Lock) -> LockResult<()> {
///     let options = AcquireOptions::new(Duration::from_secs(30))
///         .timeout(Duration::from_secs(5));
///     let Some(lease) = lock.acquire("search-index", options).await? else {
///         return Ok(()); // someone else is rebuilding
///     };
///     rebuild().await;
///     lease.release().await
/// }
/// ```
pub trait Lock: Send + Sync {
    /// The lease type returned when a key is acquired.
    type Lease: Lease;

    /// Returns the acquisition settings of this lock.
    fn config(&self) -> &LockConfig;

    /// Attempts to acquire `key` for `ttl` without waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(lease))` - the key was free and is now held
    /// * `Ok(None)` - the key is held by someone else
    /// * `Err(LockError::InvalidTtl)` - `ttl` was rejected before any I/O
    /// * `Err(...)` - the backend failed
    fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<Option<Self::Lease>>> + Send;

    /// Acquires `key`, retrying until the timeout elapses or the signal fires.
    ///
    /// Arguments are validated before anything else: an infinite or negative
    /// timeout and an invalid TTL are errors, never `Ok(None)`. A signal that
    /// has already fired returns `Ok(None)` without any attempt. A zero
    /// timeout is exactly one [`Lock::try_acquire`]. Otherwise attempts are
    /// spaced by the configured poll interval and `Ok(None)` is returned on
    /// timeout or cancellation.
    ///
    /// Waiters are not served in any particular order.
    fn acquire(
        &self,
        key: &str,
        options: AcquireOptions,
    ) -> impl Future<Output = LockResult<Option<Self::Lease>>> + Send {
        let span = debug_span!("acquire", lock.key = %key, timeout = ?options.timeout);
        async move {
            let config = self.config();
            let timeout = options
                .timeout
                .unwrap_or_else(|| TimeoutValue::from(config.default_timeout));
            timeout.validate()?;
            validate_ttl(options.ttl)?;

            let signal = options.signal.as_ref();
            if signal.is_some_and(CancelSignal::is_cancelled) {
                debug!("cancelled before first attempt");
                return Ok(None);
            }
            if timeout.is_zero() {
                return self.try_acquire(key, options.ttl).await;
            }

            let poll = PollOptions {
                poll_interval: config.poll_interval,
                timeout,
                signal,
            };
            match poll_until(config.clock.as_ref(), poll, || self.try_acquire(key, options.ttl))
                .await?
            {
                PollOutcome::Ready(lease) => Ok(Some(lease)),
                PollOutcome::TimedOut => {
                    debug!("timed out waiting for lock");
                    Ok(None)
                }
                PollOutcome::Cancelled => {
                    debug!("cancelled while waiting for lock");
                    Ok(None)
                }
            }
        }
        .instrument(span)
    }
}

// ============================================================================
// Convenience Extensions
// ============================================================================

/// Extension trait providing convenience methods for locks.
pub trait LockExt: Lock {
    /// Runs `work` while holding `key`.
    ///
    /// Returns `Ok(None)` without running `work` when the key could not be
    /// acquired. The lease is released after `work` completes; a failed
    /// release is returned as the error.
    fn run_exclusive<Fut>(
        &self,
        key: &str,
        options: AcquireOptions,
        work: Fut,
    ) -> impl Future<Output = LockResult<Option<Fut::Output>>> + Send
    where
        Fut: Future + Send,
        Fut::Output: Send,
    {
        async move {
            let Some(lease) = self.acquire(key, options).await? else {
                return Ok(None);
            };
            let output = work.await;
            lease.release().await?;
            Ok(Some(output))
        }
    }
}

// Blanket implementation for all Locks
impl<T: Lock> LockExt for T {}
