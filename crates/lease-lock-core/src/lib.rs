//! Core traits and types for time-bounded locks.
//!
//! Backends implement [`Lock::try_acquire`] and a [`Lease`] type; waiting,
//! validation and cancellation are shared through [`Lock::acquire`] and the
//! [`poll`] module.

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod poll;
pub mod prelude;
pub mod timeout;
pub mod traits;
pub mod watchdog;

pub use cancel::{CancelHandle, CancelSignal, SleepOutcome, cancel_pair, cancellable_sleep};
pub use clock::{Clock, TokioClock};
pub use config::LockConfig;
pub use error::{LockError, LockResult};
pub use poll::{PollOptions, PollOutcome, poll_until};
pub use timeout::{TimeoutValue, validate_ttl};
pub use traits::{AcquireOptions, Lease, Lock, LockExt};
pub use watchdog::Watchdog;
