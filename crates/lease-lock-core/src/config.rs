//! Per-lock acquisition settings.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, TokioClock};
use crate::error::{LockError, LockResult};
use crate::timeout::TimeoutValue;

/// Default acquisition timeout when `AcquireOptions::timeout` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default delay between acquisition attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Settings shared by every lock backend.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Timeout used by `acquire` when the caller does not pass one.
    pub default_timeout: Duration,
    /// Delay between attempts while `acquire` waits.
    pub poll_interval: Duration,
    /// Time source for acquisition deadlines.
    pub clock: Arc<dyn Clock>,
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Checks the settings; backends call this from their builders.
    pub fn validate(&self) -> LockResult<()> {
        if self.poll_interval.is_zero() {
            return Err(LockError::InvalidPollInterval(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        TimeoutValue::from(self.default_timeout)
            .validate()
            .map_err(|e| LockError::InvalidConfig(format!("default timeout: {e}")))?;
        Ok(())
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            clock: Arc::new(TokioClock::new()),
        }
    }
}
