//! PostgreSQL advisory-lock backend for time-bounded locks.
//!
//! Keys are hashed to the 64-bit ids `pg_try_advisory_lock` works on, and
//! each lease pins the pooled session that took the lock.
//!
//! Advisory locks have no server-side expiry. The TTL is enforced only by a
//! local watchdog, and `extend` cannot prove the lock is still held: if the
//! pinned session drops, PostgreSQL releases the lock at once but the lease
//! only notices on its next database call.

pub mod connection;
pub mod key;
pub mod lease;
pub mod lock;

pub use connection::PostgresConnection;
pub use key::{KeyHasher, advisory_lock_id};
pub use lease::PostgresLease;
pub use lock::{PostgresLock, PostgresLockBuilder};
