//! Redis lease implementation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fred::prelude::*;
use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::timeout::validate_ttl;
use lease_lock_core::traits::Lease;
use tracing::{debug, instrument};

/// Deletes the key only while it still holds our token.
const RELEASE_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// Resets the key's expiry only while it still holds our token.
const EXTEND_SCRIPT_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    end
    return 0
"#;

/// Lease on a key of a [`RedisLock`](crate::RedisLock).
///
/// There is no local watchdog: Redis expires the key on its own. Dropping
/// the lease without releasing it leaves the key held until then.
pub struct RedisLease {
    client: RedisClient,
    key: String,
    redis_key: String,
    /// Fencing token written as the key's value at acquisition.
    token: String,
    released: AtomicBool,
}

impl RedisLease {
    pub(crate) fn new(client: RedisClient, key: String, redis_key: String, token: String) -> Self {
        Self {
            client,
            key,
            redis_key,
            token,
            released: AtomicBool::new(false),
        }
    }

    /// Returns the fencing token stored under the key.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the prefixed key as stored in Redis.
    pub fn redis_key(&self) -> &str {
        &self.redis_key
    }
}

impl fmt::Debug for RedisLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLease")
            .field("key", &self.key)
            .field("redis_key", &self.redis_key)
            .field("token", &self.token)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl Lease for RedisLease {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Deletes the key if it still carries this lease's token.
    ///
    /// If the release command fails the lease still counts as released; the
    /// key then stays held until Redis expires it.
    #[instrument(skip(self), fields(lock.key = %self.key, backend = "redis"))]
    async fn release(&self) -> LockResult<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let args: Vec<RedisValue> = vec![self.token.as_str().into()];
        let deleted: i64 = self
            .client
            .eval(RELEASE_SCRIPT_LUA, self.redis_key.as_str(), args)
            .await
            .map_err(LockError::backend)?;

        if deleted == 0 {
            debug!("key expired or taken over before release");
        }
        Ok(())
    }

    /// Resets the key's expiry to `ttl` if it still carries this lease's token.
    ///
    /// Returns `Ok(false)` once the key has expired or been taken over.
    #[instrument(skip(self), fields(lock.key = %self.key, backend = "redis"))]
    async fn extend(&self, ttl: Duration) -> LockResult<bool> {
        let ttl_millis = validate_ttl(ttl)?;
        if self.is_released() {
            return Ok(false);
        }

        let args: Vec<RedisValue> = vec![self.token.as_str().into(), (ttl_millis as i64).into()];
        let extended: i64 = self
            .client
            .eval(EXTEND_SCRIPT_LUA, self.redis_key.as_str(), args)
            .await
            .map_err(LockError::backend)?;

        if extended == 0 {
            debug!("key expired or taken over before extend");
        }
        Ok(extended == 1)
    }
}
