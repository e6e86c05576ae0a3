//! Example: Using Redis locks
//!
//! Run with: `cargo run --example redis_lock`
//!
//! Requires a Redis server. Set REDIS_URL environment variable
//! or modify the URL below.

use lease_lock::RedisLock;
use lease_lock::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Get Redis URL from environment or use default
    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://localhost:6379".to_string());

    println!("Connecting to Redis...");
    let lock = RedisLock::builder()
        .url(&redis_url)
        .prefix("example")
        .build()
        .await?;
    println!("Using keyspace prefix '{}'", lock.prefix());

    // Acquire the lock with a timeout
    println!("Acquiring lock with 5 second timeout...");
    let options = AcquireOptions::new(Duration::from_secs(10)).timeout(Duration::from_secs(5));
    let Some(lease) = lock.acquire("example-resource", options).await? else {
        println!("Timed out waiting for the lock");
        return Ok(());
    };
    println!("Lock acquired as {} with token {}", lease.redis_key(), lease.token());

    // Redis expires the key on its own; long work must extend it
    println!("Doing long-running work...");
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(4)).await;
        if !lease.extend(Duration::from_secs(10)).await? {
            println!("Lost the lock while working");
            return Ok(());
        }
        println!("Lease extended");
    }
    println!("Work completed");

    // Release the lock
    lease.release().await?;
    println!("Lock released");

    Ok(())
}
