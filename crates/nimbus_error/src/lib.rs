//! Error types for the Nimbus usage-limit library.
//!
//! This crate provides the foundation error types used throughout the Nimbus workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use nimbus_error::{ClockError, ClockErrorKind, NimbusResult};
//!
//! fn server_time() -> NimbusResult<i64> {
//!     Err(ClockError::new(ClockErrorKind::Unavailable("time service down".into())))?
//! }
//!
//! assert!(server_time().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod http;
mod json;
mod retry;
mod storage;

pub use clock::{ClockError, ClockErrorKind};
pub use config::ConfigError;
pub use error::{NimbusError, NimbusErrorKind, NimbusResult};
pub use http::HttpError;
pub use json::JsonError;
pub use retry::RetryableError;
pub use storage::{StorageError, StorageErrorKind};
