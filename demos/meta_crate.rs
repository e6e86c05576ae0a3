//! Example: Using the meta-crate (all backends)
//!
//! Run with: `cargo run --example meta_crate`
//!
//! This example shows how backend-agnostic code is written against the
//! `Lock` trait and run over every backend that is available.

use lease_lock::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

async fn critical_section<L: Lock>(backend: &str, lock: &L) -> LockResult<()> {
    let options = AcquireOptions::new(Duration::from_secs(10)).timeout(Duration::from_secs(2));
    match lock.acquire("example", options).await? {
        Some(lease) => {
            println!("{backend} lock acquired");
            lease.release().await?;
        }
        None => println!("{backend} lock is busy"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Example: Using lease-lock meta-crate\n");

    // Memory backend example
    println!("=== Memory Backend ===");
    critical_section("Memory", &MemoryLock::new()).await?;

    // PostgreSQL backend example (if available)
    if let Ok(postgres_url) = std::env::var("POSTGRES_URL") {
        println!("\n=== PostgreSQL Backend ===");
        if let Ok(lock) = PostgresLock::new(postgres_url).await {
            critical_section("PostgreSQL", &lock).await?;
        }
    }

    // Redis backend example (if available)
    if let Ok(redis_url) = std::env::var("REDIS_URL") {
        println!("\n=== Redis Backend ===");
        if let Ok(lock) = RedisLock::new(redis_url).await {
            critical_section("Redis", &lock).await?;
        }
    }

    println!("\nAll examples completed!");
    Ok(())
}
