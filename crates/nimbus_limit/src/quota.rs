//! Quota trait and the built-in quota table.
//!
//! A quota is a `(max_actions, window)` pair: at most `max_actions` timestamps
//! may fall inside any window ending at the current server time.

use crate::{LimitKind, Subscription};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Represents a sliding-window usage quota.
///
/// # Example
///
/// ```
/// use nimbus_limit::Quota;
///
/// struct Hourly;
///
/// impl Quota for Hourly {
///     fn max_actions(&self) -> u32 { 6 }
///     fn window_secs(&self) -> u64 { 3600 }
///     fn name(&self) -> &str { "Hourly" }
/// }
///
/// assert_eq!(Hourly.window().num_minutes(), 60);
/// ```
pub trait Quota: Send + Sync {
    /// Number of actions allowed inside one window.
    ///
    /// Zero means the action is never allowed.
    fn max_actions(&self) -> u32;

    /// Length of the sliding window in seconds.
    fn window_secs(&self) -> u64;

    /// Human readable name of the quota (e.g., "Free", "Premium").
    fn name(&self) -> &str;

    /// Length of the sliding window as a signed time delta.
    fn window(&self) -> TimeDelta {
        crate::window::saturating_seconds(self.window_secs())
    }
}

/// Quota loaded from configuration.
///
/// ```toml
/// [tiers.free.current_weather]
/// name = "Free"
/// max_actions = 6
/// window_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaTier {
    /// Name of the tier (e.g., "Free", "Premium")
    #[serde(default)]
    pub name: String,

    /// Actions allowed per window
    pub max_actions: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

impl Quota for QuotaTier {
    fn max_actions(&self) -> u32 {
        self.max_actions
    }

    fn window_secs(&self) -> u64 {
        self.window_secs
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Built-in quotas used when configuration has no entry for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultQuota {
    /// Subscription level the quota applies to
    pub subscription: Subscription,
    /// Action the quota applies to
    pub kind: LimitKind,
}

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

impl DefaultQuota {
    /// Built-in quota for a subscription and action.
    pub fn new(subscription: Subscription, kind: LimitKind) -> Self {
        Self { subscription, kind }
    }
}

impl Quota for DefaultQuota {
    fn max_actions(&self) -> u32 {
        match (self.subscription, self.kind) {
            (Subscription::Free, LimitKind::CurrentWeather) => 6,
            (Subscription::Free, LimitKind::ActivityRecommendation) => 3,
            (Subscription::Free, LimitKind::LocationChange) => 3,
            (Subscription::Premium, LimitKind::CurrentWeather) => 60,
            (Subscription::Premium, LimitKind::ActivityRecommendation) => 30,
            (Subscription::Premium, LimitKind::LocationChange) => 30,
        }
    }

    fn window_secs(&self) -> u64 {
        match self.kind {
            LimitKind::CurrentWeather => HOUR,
            LimitKind::ActivityRecommendation | LimitKind::LocationChange => DAY,
        }
    }

    fn name(&self) -> &str {
        match self.subscription {
            Subscription::Free => "Free",
            Subscription::Premium => "Premium",
        }
    }
}

impl From<DefaultQuota> for QuotaTier {
    fn from(quota: DefaultQuota) -> Self {
        QuotaTier {
            name: quota.name().to_string(),
            max_actions: quota.max_actions(),
            window_secs: quota.window_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn premium_never_allows_less_than_free() {
        for kind in LimitKind::iter() {
            let free = DefaultQuota::new(Subscription::Free, kind);
            let premium = DefaultQuota::new(Subscription::Premium, kind);
            assert!(premium.max_actions() >= free.max_actions());
            assert_eq!(premium.window_secs(), free.window_secs());
        }
    }

    #[test]
    fn oversized_window_saturates() {
        let tier = QuotaTier {
            name: "Forever".to_string(),
            max_actions: 1,
            window_secs: u64::MAX,
        };
        assert_eq!(tier.window(), TimeDelta::MAX);
    }
}
