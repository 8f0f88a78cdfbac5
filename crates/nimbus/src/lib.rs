//! Nimbus usage limits.
//!
//! Decides whether a weather-app user may refresh the current weather,
//! generate an activity recommendation, or change location, using quotas
//! counted against server time.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nimbus::{LimitConfig, LimitKind, LimitManager, Subscription};
//!
//! let manager = nimbus::open_local(&data_dir, LimitConfig::load()?, true)?;
//! let outcome = manager
//!     .consume("user-1", LimitKind::CurrentWeather, Subscription::Free)
//!     .await?;
//! ```
//!
//! # Architecture
//!
//! - `nimbus_error` - Error types
//! - `nimbus_limit` - Clocks, timestamp logs, freshness cache, limit manager
//!
//! This crate re-exports both and adds the pieces used by the `nimbus` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod local;
mod report;

pub use local::{open_local, select_clock};
pub use nimbus_error::*;
pub use nimbus_limit::*;
pub use report::{render_consumption, render_status};
