//! Top-level error wrapper types.

use crate::{ClockError, ConfigError, HttpError, JsonError, StorageError};

/// The union of every error a Nimbus operation can produce.
///
/// # Examples
///
/// ```
/// use nimbus_error::{NimbusError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: NimbusError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum NimbusErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Authoritative clock error
    #[from(ClockError)]
    Clock(ClockError),
    /// Timestamp log or freshness cache error
    #[from(StorageError)]
    Storage(StorageError),
}

/// Nimbus error with kind discrimination.
///
/// # Examples
///
/// ```
/// use nimbus_error::{NimbusErrorKind, NimbusResult, ConfigError};
///
/// fn might_fail() -> NimbusResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(matches!(err.kind(), NimbusErrorKind::Config(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Nimbus Error: {}", _0)]
pub struct NimbusError(Box<NimbusErrorKind>);

impl NimbusError {
    /// Create a new error from a kind.
    pub fn new(kind: NimbusErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &NimbusErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to NimbusErrorKind
impl<T> From<T> for NimbusError
where
    T: Into<NimbusErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Nimbus operations.
pub type NimbusResult<T> = std::result::Result<T, NimbusError>;
