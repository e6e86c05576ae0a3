//! In-process backend for time-bounded locks.
//!
//! Keys are only exclusive among callers sharing one [`MemoryLock`] (or its
//! clones); nothing is coordinated across processes.

pub mod lease;
pub mod lock;

pub use lease::MemoryLease;
pub use lock::{MemoryLock, MemoryLockBuilder};
