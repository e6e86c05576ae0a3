//! Redis backend for time-bounded locks.
//!
//! A key is claimed with `SET key token NX PX ttl`, so Redis itself expires
//! the leases of crashed holders. Release and extend run Lua scripts that
//! act only while the stored token is still the caller's.

pub mod lease;
pub mod lock;
pub mod token;

pub use lease::RedisLease;
pub use lock::{DEFAULT_PREFIX, RedisLock, RedisLockBuilder};
