//! Monotonic time source used for acquisition deadlines.

use std::fmt;

use tokio::time::Instant;

/// A monotonic clock.
///
/// Locks read time only through this trait so tests can substitute their own
/// source. The default [`TokioClock`] follows tokio's clock, which means
/// `tokio::time::pause()` and `advance()` drive it deterministically.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Returns milliseconds elapsed since the clock was created.
    fn now_ms(&self) -> u64;
}

/// Clock backed by `tokio::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::new();
        let start = clock.now();
        assert_eq!(clock.now_ms(), 0);

        tokio::time::advance(Duration::from_millis(120)).await;

        assert_eq!(clock.now() - start, Duration::from_millis(120));
        assert_eq!(clock.now_ms(), 120);
    }
}
