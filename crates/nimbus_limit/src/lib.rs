//! Sliding-window usage limits with server-time authority.
//!
//! This crate decides whether a user action (weather refresh, activity
//! recommendation, location change) is allowed right now and, if not, when it
//! becomes available again. Decisions combine:
//! - an authoritative [`ServerClock`], so the device clock cannot be used to
//!   reopen a window,
//! - an append-only [`TimestampLog`] of past actions, pruned as it is read,
//! - a [`FreshnessCache`] that short-circuits the primary action while a
//!   recently fetched result can still be served.
//!
//! Quotas differ per [`Subscription`] and [`LimitKind`] and are loaded from
//! [`LimitConfig`], falling back to [`DefaultQuota`].
//!
//! ```no_run
//! use nimbus_limit::{
//!     FileFreshnessCache, FileTimestampLog, HttpTimeClock, LimitConfig, LimitKind,
//!     LimitManager, Subscription,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LimitConfig::load()?;
//! let clock = HttpTimeClock::new(config.time_service.as_ref().unwrap())?;
//! let manager = LimitManager::new(
//!     Arc::new(clock),
//!     Arc::new(FileTimestampLog::new("/var/lib/nimbus/log")?),
//!     Arc::new(FileFreshnessCache::new("/var/lib/nimbus/freshness.json")),
//!     config,
//! );
//!
//! let status = manager
//!     .calculate_limit("user-1", LimitKind::CurrentWeather, Subscription::Free)
//!     .await?;
//! if !status.is_available() {
//!     println!("Try again at {:?}", status.available_at());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod file_ledger;
mod freshness;
mod fs;
mod kind;
mod ledger;
mod manager;
mod quota;
mod window;

pub use clock::{
    FallbackClock, HttpTimeClock, ManualClock, ServerClock, StoreClock, SystemClock,
    parse_time_response,
};
pub use config::{LimitConfig, TimeServiceConfig};
pub use file_ledger::FileTimestampLog;
pub use freshness::{FileFreshnessCache, FreshnessCache, MemoryFreshnessCache};
pub use kind::{LimitKind, Subscription};
pub use ledger::{MemoryTimestampLog, TimestampLog, TimestampRecord};
pub use manager::{Availability, Consumption, LimitManager, LimitReason, LimitStatus};
pub use quota::{DefaultQuota, Quota, QuotaTier};
