//! Server clock error types.

/// Kinds of failures when obtaining authoritative time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ClockErrorKind {
    /// The time source could not be reached
    #[display("Time source unavailable: {}", _0)]
    Unavailable(String),
    /// The time source answered with something that is not a timestamp
    #[display("Malformed time response: {}", _0)]
    Malformed(String),
    /// Every configured time source failed
    #[display("All time sources failed: {}", _0)]
    Exhausted(String),
}

/// Clock error with location tracking.
///
/// # Examples
///
/// ```
/// use nimbus_error::{ClockError, ClockErrorKind};
///
/// let err = ClockError::new(ClockErrorKind::Malformed("missing unixtime".to_string()));
/// assert!(format!("{}", err).contains("Malformed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Clock Error: {} at line {} in {}", kind, line, file)]
pub struct ClockError {
    /// The kind of error that occurred
    pub kind: ClockErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ClockError {
    /// Create a new clock error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ClockErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
