//! Example: Using in-process memory locks
//!
//! Run with: `cargo run --example memory_lock`
//!
//! Set `RUST_LOG=debug` to see acquisition and expiry events.

use lease_lock::MemoryLock;
use lease_lock::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let lock = MemoryLock::builder()
        .default_timeout(Duration::from_secs(2))
        .poll_interval(Duration::from_millis(20))
        .build()?;

    // Single attempt, no waiting
    let lease = lock
        .try_acquire("report", Duration::from_secs(5))
        .await?
        .ok_or("report already held")?;
    println!("Lease acquired on '{}'", lease.key());

    // A second caller waits for the holder to release
    let waiter = {
        let lock = lock.clone();
        tokio::spawn(async move {
            let options = AcquireOptions::new(Duration::from_secs(5)).timeout(Duration::from_secs(1));
            lock.acquire("report", options).await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    lease.release().await?;
    println!("First lease released");

    if let Some(second) = waiter.await?? {
        println!("Waiter acquired '{}' after release", second.key());
        second.release().await?;
    }

    // Leases that are never released expire after their TTL
    let _forgotten = lock.try_acquire("cache", Duration::from_millis(100)).await?;
    println!("'cache' held: {}", lock.is_held("cache"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("'cache' held after TTL: {}", lock.is_held("cache"));

    // Cancel a wait from another task
    let blocker = lock.try_acquire("job", Duration::from_secs(10)).await?;
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });
    let options = AcquireOptions::new(Duration::from_secs(10))
        .timeout(Duration::from_secs(5))
        .signal(signal);
    let cancelled = lock.acquire("job", options).await?;
    println!("Cancelled wait returned a lease: {}", cancelled.is_some());
    if let Some(blocker) = blocker {
        blocker.release().await?;
    }

    // Scoped critical section
    let total = lock
        .run_exclusive("job", AcquireOptions::new(Duration::from_secs(5)), async {
            (1..=10).sum::<u32>()
        })
        .await?;
    println!("Exclusive work result: {:?}", total);

    Ok(())
}
