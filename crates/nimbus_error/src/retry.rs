//! Classification of transient failures.

use crate::{ClockError, ClockErrorKind, HttpError, NimbusError, NimbusErrorKind};

/// Trait for errors that can be retried.
///
/// # Examples
///
/// ```
/// use nimbus_error::{HttpError, RetryableError};
///
/// assert!(HttpError::with_status(503, "Service unavailable").is_retryable());
/// assert!(!HttpError::with_status(404, "Not found").is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503 (service unavailable), 429 (rate limit),
    /// or network timeouts should return true. Permanent errors like 401
    /// (unauthorized) or 400 (bad request) should return false.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for HttpError {
    fn is_retryable(&self) -> bool {
        match self.status {
            // No response at all: connect failure or timeout
            None => true,
            Some(429) => true,
            Some(status) => (500..600).contains(&status),
        }
    }
}

impl RetryableError for ClockError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind, ClockErrorKind::Unavailable(_))
    }
}

impl RetryableError for NimbusError {
    fn is_retryable(&self) -> bool {
        match self.kind() {
            NimbusErrorKind::Http(e) => e.is_retryable(),
            NimbusErrorKind::Clock(e) => e.is_retryable(),
            _ => false,
        }
    }
}
