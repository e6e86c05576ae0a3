//! Timeout and TTL value helpers.

use std::time::Duration;

use crate::error::{LockError, LockResult};

/// An acquisition timeout as supplied by the caller.
///
/// Held as signed milliseconds so that values coming from untyped sources
/// (configuration files, other services) can be represented before they are
/// checked. Only finite, non-negative values are accepted by
/// [`TimeoutValue::validate`]; zero means "a single attempt, no waiting".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutValue {
    millis: i64, // i64::MAX for infinite
}

impl TimeoutValue {
    pub const INFINITE: Self = Self { millis: i64::MAX };
    pub const ZERO: Self = Self { millis: 0 };

    /// Creates a timeout from a raw millisecond count.
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn is_infinite(&self) -> bool {
        self.millis == i64::MAX
    }

    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }

    /// Checks the timeout and converts it into a finite duration.
    pub fn validate(self) -> LockResult<Duration> {
        if self.is_infinite() {
            return Err(LockError::InvalidTimeout(
                "timeout must be finite".to_string(),
            ));
        }
        if self.millis < 0 {
            return Err(LockError::InvalidTimeout(format!(
                "timeout must be >= 0ms, got {}ms",
                self.millis
            )));
        }
        Ok(Duration::from_millis(self.millis as u64))
    }
}

impl From<Duration> for TimeoutValue {
    fn from(timeout: Duration) -> Self {
        match i64::try_from(timeout.as_millis()) {
            Ok(millis) => Self { millis },
            Err(_) => Self::INFINITE,
        }
    }
}

/// Checks a lease TTL and returns it in whole milliseconds.
///
/// The TTL must be at least one millisecond and fit in a signed 64-bit
/// millisecond count, which is what every backend stores.
pub fn validate_ttl(ttl: Duration) -> LockResult<u64> {
    let millis = ttl.as_millis();
    if millis == 0 {
        return Err(LockError::InvalidTtl(format!(
            "ttl must be at least 1ms, got {ttl:?}"
        )));
    }
    if millis >= i64::MAX as u128 {
        return Err(LockError::InvalidTtl("ttl must be finite".to_string()));
    }
    Ok(millis as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_timeout_validates() {
        let timeout = TimeoutValue::from(Duration::from_millis(250));
        assert_eq!(timeout.validate().unwrap(), Duration::from_millis(250));
        assert!(TimeoutValue::ZERO.is_zero());
    }

    #[test]
    fn test_infinite_and_negative_rejected() {
        let err = TimeoutValue::INFINITE.validate().unwrap_err();
        assert!(matches!(err, LockError::InvalidTimeout(_)));

        let err = TimeoutValue::from_millis(-1).validate().unwrap_err();
        assert!(matches!(err, LockError::InvalidTimeout(_)));
    }

    #[test]
    fn test_huge_duration_is_infinite() {
        assert!(TimeoutValue::from(Duration::MAX).is_infinite());
    }

    #[test]
    fn test_ttl_bounds() {
        assert_eq!(validate_ttl(Duration::from_millis(50)).unwrap(), 50);
        assert!(matches!(
            validate_ttl(Duration::ZERO),
            Err(LockError::InvalidTtl(_))
        ));
        assert!(matches!(
            validate_ttl(Duration::from_micros(999)),
            Err(LockError::InvalidTtl(_))
        ));
        assert!(matches!(
            validate_ttl(Duration::MAX),
            Err(LockError::InvalidTtl(_))
        ));
    }
}
