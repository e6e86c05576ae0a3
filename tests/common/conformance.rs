//! Behaviour every lock backend must share.
//!
//! Each check is a generic function over [`Lock`]; `lock_conformance_tests!`
//! instantiates the whole set for one backend from a factory
//! `async fn(LockConfig) -> impl Lock`.

use std::time::{Duration, Instant};

use lease_lock::{AcquireOptions, Lease, Lock, LockConfig, LockError, TimeoutValue, cancel_pair};

use super::{init_tracing, unique_key};

const LONG_TTL: Duration = Duration::from_secs(10);

/// Settings used by most checks: fast polling, generous default timeout.
pub fn config() -> LockConfig {
    LockConfig::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_default_timeout(Duration::from_secs(2))
}

/// Slow polling, so a single poll interval is clearly measurable.
pub fn slow_poll_config() -> LockConfig {
    LockConfig::new()
        .with_poll_interval(Duration::from_millis(500))
        .with_default_timeout(Duration::from_secs(2))
}

pub const SHORT_DEFAULT_TIMEOUT: Duration = Duration::from_millis(150);

/// Short default timeout for the fallback check.
pub fn short_default_config() -> LockConfig {
    config().with_default_timeout(SHORT_DEFAULT_TIMEOUT)
}

pub async fn mutual_exclusion<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("mutex");

    let first = lock.try_acquire(&key, LONG_TTL).await.unwrap();
    assert!(first.is_some());
    let second = lock.try_acquire(&key, LONG_TTL).await.unwrap();
    assert!(second.is_none());
    first.unwrap().release().await.unwrap();

    // Racing attempts on a free key: exactly one wins
    let contended = unique_key("mutex-race");
    let (a, b) = tokio::join!(
        lock.try_acquire(&contended, LONG_TTL),
        lock.try_acquire(&contended, LONG_TTL)
    );
    let winners: Vec<L::Lease> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
    assert_eq!(winners.len(), 1);
    for lease in winners {
        lease.release().await.unwrap();
    }
}

pub async fn release_is_idempotent<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("idempotent");

    let first = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();
    first.release().await.unwrap();
    first.release().await.unwrap();
    assert!(first.is_released());

    let second = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();
    // A stale release must not free the newer holder's key
    first.release().await.unwrap();
    assert!(lock.try_acquire(&key, LONG_TTL).await.unwrap().is_none());
    assert!(!second.is_released());

    second.release().await.unwrap();
}

pub async fn extend_after_release_is_false<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("extend-released");

    let lease = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();
    lease.release().await.unwrap();

    assert!(!lease.extend(LONG_TTL).await.unwrap());
    // Extending must not have re-claimed the key
    let again = lock.try_acquire(&key, LONG_TTL).await.unwrap();
    assert!(again.is_some());
    again.unwrap().release().await.unwrap();
}

pub async fn extend_keeps_lease_alive<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("extend");

    let lease = lock
        .try_acquire(&key, Duration::from_millis(100))
        .await
        .unwrap()
        .unwrap();
    assert!(lease.extend(LONG_TTL).await.unwrap());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(lock.try_acquire(&key, LONG_TTL).await.unwrap().is_none());
    assert!(!lease.is_released());

    lease.release().await.unwrap();
}

pub async fn ttl_auto_reclaim<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("ttl");

    let _abandoned = lock
        .try_acquire(&key, Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reclaimed = lock.try_acquire(&key, LONG_TTL).await.unwrap();
    assert!(reclaimed.is_some());
    reclaimed.unwrap().release().await.unwrap();
}

pub async fn keys_are_independent<L: Lock>(lock: &L) {
    init_tracing();
    let a = lock.try_acquire(&unique_key("a"), LONG_TTL).await.unwrap();
    let b = lock.try_acquire(&unique_key("b"), LONG_TTL).await.unwrap();
    assert!(a.is_some());
    assert!(b.is_some());

    a.unwrap().release().await.unwrap();
    b.unwrap().release().await.unwrap();
}

pub async fn zero_timeout_is_one_shot<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("one-shot");
    let holder = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();

    let start = Instant::now();
    let lease = lock
        .acquire(&key, AcquireOptions::new(LONG_TTL).timeout(TimeoutValue::ZERO))
        .await
        .unwrap();
    assert!(lease.is_none());
    assert!(start.elapsed() < lock.config().poll_interval);

    // A free key is acquired by the single attempt
    holder.release().await.unwrap();
    let lease = lock
        .acquire(&key, AcquireOptions::new(LONG_TTL).timeout(TimeoutValue::ZERO))
        .await
        .unwrap();
    assert!(lease.is_some());
    lease.unwrap().release().await.unwrap();
}

pub async fn invalid_timeout_rejected<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("invalid-timeout");

    for timeout in [TimeoutValue::INFINITE, TimeoutValue::from_millis(-1)] {
        let err = lock
            .acquire(&key, AcquireOptions::new(LONG_TTL).timeout(timeout))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::InvalidTimeout(_)));
    }

    let err = lock.try_acquire(&key, Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, LockError::InvalidTtl(_)));

    // Nothing was claimed by the rejected calls
    let lease = lock.try_acquire(&key, LONG_TTL).await.unwrap();
    assert!(lease.is_some());
    lease.unwrap().release().await.unwrap();
}

pub async fn acquire_waits_for_release<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("wait");
    let holder = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();

    let start = Instant::now();
    let (lease, _) = tokio::join!(
        lock.acquire(
            &key,
            AcquireOptions::new(LONG_TTL).timeout(Duration::from_millis(250))
        ),
        async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            holder.release().await.unwrap();
        }
    );

    let lease = lease.unwrap().expect("lease once the holder released");
    assert!(start.elapsed() < Duration::from_millis(250));
    lease.release().await.unwrap();
}

pub async fn acquire_times_out_while_held<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("timeout");
    let holder = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();

    let start = Instant::now();
    let lease = lock
        .acquire(
            &key,
            AcquireOptions::new(LONG_TTL).timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap();
    assert!(lease.is_none());
    assert!(start.elapsed() >= Duration::from_millis(100));

    holder.release().await.unwrap();
}

pub async fn cancelled_before_attempt<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("cancel-before");
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let lease = lock
        .acquire(&key, AcquireOptions::new(LONG_TTL).signal(signal))
        .await
        .unwrap();
    assert!(lease.is_none());

    // The key is free, so any attempt would have claimed it
    let lease = lock.try_acquire(&key, LONG_TTL).await.unwrap();
    assert!(lease.is_some());
    lease.unwrap().release().await.unwrap();
}

pub async fn cancelled_while_waiting<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("cancel-during");
    let holder = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();
    let (handle, signal) = cancel_pair();

    let start = Instant::now();
    let (lease, _) = tokio::join!(
        lock.acquire(
            &key,
            AcquireOptions::new(LONG_TTL)
                .timeout(Duration::from_secs(5))
                .signal(signal)
        ),
        async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            handle.cancel();
        }
    );

    assert!(lease.unwrap().is_none());
    assert!(start.elapsed() < Duration::from_secs(1));
    holder.release().await.unwrap();
}

/// Expects a lock built from [`short_default_config`].
pub async fn default_timeout_fallback<L: Lock>(lock: &L) {
    init_tracing();
    let key = unique_key("default-timeout");
    let holder = lock.try_acquire(&key, LONG_TTL).await.unwrap().unwrap();

    let start = Instant::now();
    let lease = lock.acquire(&key, AcquireOptions::new(LONG_TTL)).await.unwrap();
    let elapsed = start.elapsed();

    assert!(lease.is_none());
    assert!(elapsed >= SHORT_DEFAULT_TIMEOUT);
    assert!(elapsed < Duration::from_secs(1));
    holder.release().await.unwrap();
}

/// Generates the conformance tests for one backend.
///
/// `$factory` is an `async fn(LockConfig) -> impl Lock`. Attributes given
/// before it (e.g. `#[ignore]`) are applied to every generated test.
macro_rules! lock_conformance_tests {
    (@tests $attrs:tt $factory:path, $config:ident => { $($check:ident),* $(,)? }) => {
        $(
            lock_conformance_tests!(@test $attrs $factory, $config, $check);
        )*
    };
    (@test [$($attrs:tt)*] $factory:path, $config:ident, $check:ident) => {
        #[tokio::test]
        $($attrs)*
        async fn $check() {
            let lock = $factory(crate::common::conformance::$config()).await;
            crate::common::conformance::$check(&lock).await;
        }
    };
    ($(#[$attr:meta])* $factory:path) => {
        lock_conformance_tests!(@tests [$(#[$attr])*] $factory, config => {
            mutual_exclusion,
            release_is_idempotent,
            extend_after_release_is_false,
            extend_keeps_lease_alive,
            ttl_auto_reclaim,
            keys_are_independent,
            invalid_timeout_rejected,
            acquire_waits_for_release,
            acquire_times_out_while_held,
            cancelled_before_attempt,
            cancelled_while_waiting,
        });
        lock_conformance_tests!(@tests [$(#[$attr])*] $factory, slow_poll_config => {
            zero_timeout_is_one_shot,
        });
        lock_conformance_tests!(@tests [$(#[$attr])*] $factory, short_default_config => {
            default_timeout_fallback,
        });
    };
}
