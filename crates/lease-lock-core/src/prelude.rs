//! Convenience prelude for lock types.

pub use crate::cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use crate::config::LockConfig;
pub use crate::error::{LockError, LockResult};
pub use crate::timeout::TimeoutValue;
pub use crate::traits::{AcquireOptions, Lease, Lock, LockExt};
