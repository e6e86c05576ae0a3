//! Redis lock implementation.

use std::sync::Arc;
use std::time::Duration;

use fred::prelude::*;
use lease_lock_core::clock::Clock;
use lease_lock_core::config::LockConfig;
use lease_lock_core::error::{LockError, LockResult};
use lease_lock_core::timeout::validate_ttl;
use lease_lock_core::traits::Lock;
use tracing::{Span, field, instrument};

use crate::lease::RedisLease;
use crate::token::create_token;

/// Keyspace prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "lease-lock:";

/// Builder for [`RedisLock`] configuration.
pub struct RedisLockBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
    prefix: String,
    config: LockConfig,
}

impl RedisLockBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            prefix: DEFAULT_PREFIX.to_string(),
            config: LockConfig::default(),
        }
    }

    /// Sets the Redis server URL to connect to.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing, already connected Redis client.
    ///
    /// Takes precedence over [`RedisLockBuilder::url`].
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the keyspace prefix prepended to every lock key.
    ///
    /// A trailing `:` is added if missing, so `"jobs"` and `"jobs:"` are the
    /// same namespace.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
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

    /// Builds the lock, connecting to Redis if a URL was given.
    pub async fn build(self) -> LockResult<RedisLock> {
        self.config.validate()?;
        let prefix = normalize_prefix(self.prefix);

        let client = match (self.client, self.url) {
            (Some(client), _) => client,
            (None, Some(url)) => {
                let config = RedisConfig::from_url(&url).map_err(|e| {
                    LockError::InvalidConfig(format!("invalid Redis URL: {}", e))
                })?;

                let client = RedisClient::new(config, None, None, None);
                client.connect();
                client
                    .wait_for_connect()
                    .await
                    .map_err(LockError::connection)?;
                client
            }
            (None, None) => {
                return Err(LockError::InvalidConfig(
                    "no Redis client or URL provided".to_string(),
                ));
            }
        };

        Ok(RedisLock {
            client,
            prefix,
            config: self.config,
        })
    }
}

impl Default for RedisLockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_prefix(mut prefix: String) -> String {
    if !prefix.is_empty() && !prefix.ends_with(':') {
        prefix.push(':');
    }
    prefix
}

/// A Redis-based lock.
///
/// This is the only backend where expiry does not depend on the client: a
/// crashed holder's key is reclaimed by Redis once its TTL runs out.
#[derive(Clone)]
pub struct RedisLock {
    client: RedisClient,
    prefix: String,
    config: LockConfig,
}

impl RedisLock {
    /// Returns a new builder for configuring the lock.
    pub fn builder() -> RedisLockBuilder {
        RedisLockBuilder::new()
    }

    /// Creates a lock connected to `url` with default settings.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// Returns the keyspace prefix, including its trailing colon.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the Redis key a lock key is stored under.
    pub fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl Lock for RedisLock {
    type Lease = RedisLease;

    fn config(&self) -> &LockConfig {
        &self.config
    }

    #[instrument(skip(self), fields(lock.key = %key, backend = "redis", acquired = field::Empty))]
    async fn try_acquire(&self, key: &str, ttl: Duration) -> LockResult<Option<RedisLease>> {
        let ttl_millis = validate_ttl(ttl)?;
        let redis_key = self.redis_key(key);
        let token = create_token();

        // SET NX PX: claim the key only if absent, with server-side expiry
        let result: Option<String> = self
            .client
            .set(
                &redis_key,
                token.as_str(),
                Some(Expiration::PX(ttl_millis as i64)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(LockError::backend)?;

        if result.is_none() {
            Span::current().record("acquired", false);
            return Ok(None);
        }

        Span::current().record("acquired", true);
        Ok(Some(RedisLease::new(
            self.client.clone(),
            key.to_string(),
            redis_key,
            token,
        )))
    }
}
