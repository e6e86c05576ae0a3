//! Error types for lock operations.

use thiserror::Error;

/// Errors that can occur during lock operations.
///
/// Failing to obtain a contended lock is not an error: `try_acquire` and
/// `acquire` report it as `Ok(None)`. Variants here are either programmer
/// errors caught before any I/O, or failures of the coordination backend.
#[derive(Error, Debug)]
pub enum LockError {
    /// Lease TTL was zero or too large to represent.
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),

    /// Acquisition timeout was infinite or negative.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Poll interval between acquisition attempts was zero.
    #[error("invalid poll interval: {0}")]
    InvalidPollInterval(String),

    /// Lock configuration was incomplete or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend connection failed.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LockError {
    /// Returns true for errors raised by argument or configuration checks.
    ///
    /// These never reach the backend and retrying them cannot succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTtl(_)
                | Self::InvalidTimeout(_)
                | Self::InvalidPollInterval(_)
                | Self::InvalidConfig(_)
        )
    }

    /// Wraps a driver error raised while reaching the backend.
    pub fn connection(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Connection(error.into())
    }

    /// Wraps a driver error raised by a backend command.
    pub fn backend(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(error.into())
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
