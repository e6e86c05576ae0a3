//! Retry-until-deadline driver behind every blocking `acquire`.

use std::future::Future;
use std::time::Duration;

use crate::cancel::{CancelSignal, SleepOutcome, cancellable_sleep};
use crate::clock::Clock;
use crate::error::{LockError, LockResult};
use crate::timeout::TimeoutValue;

/// Settings for a single [`poll_until`] run.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions<'a> {
    /// Delay between attempts. Must be non-zero.
    pub poll_interval: Duration,
    /// Total budget. Must be finite and non-negative.
    pub timeout: TimeoutValue,
    /// Optional cancellation signal.
    pub signal: Option<&'a CancelSignal>,
}

/// How a [`poll_until`] run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// An attempt produced a value.
    Ready(T),
    /// The deadline passed before any attempt produced a value.
    TimedOut,
    /// The signal fired before any attempt produced a value.
    Cancelled,
}

/// Repeats `attempt` until it yields a value, the timeout elapses or the
/// signal fires.
///
/// The deadline is fixed once on entry. Each iteration checks cancellation,
/// then the deadline, then runs one attempt; `Ok(None)` from the attempt
/// means "not yet" and is followed by a cancellable sleep of
/// `poll_interval`, cut short at the deadline. An `Err` from the attempt aborts the loop immediately.
pub async fn poll_until<T, F, Fut>(
    clock: &dyn Clock,
    options: PollOptions<'_>,
    mut attempt: F,
) -> LockResult<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LockResult<Option<T>>>,
{
    if options.poll_interval.is_zero() {
        return Err(LockError::InvalidPollInterval(
            "poll interval must be greater than zero".to_string(),
        ));
    }
    let timeout = options.timeout.validate()?;
    let deadline = clock.now() + timeout;

    loop {
        if options.signal.is_some_and(CancelSignal::is_cancelled) {
            return Ok(PollOutcome::Cancelled);
        }
        if clock.now() >= deadline {
            return Ok(PollOutcome::TimedOut);
        }
        if let Some(value) = attempt().await? {
            return Ok(PollOutcome::Ready(value));
        }
        // Never sleep past the deadline
        let remaining = deadline.saturating_duration_since(clock.now());
        let pause = options.poll_interval.min(remaining);
        if cancellable_sleep(pause, options.signal).await == SleepOutcome::Cancelled {
            return Ok(PollOutcome::Cancelled);
        }
    }
}
