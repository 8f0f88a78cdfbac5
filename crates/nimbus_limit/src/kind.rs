//! Limited action categories and subscription levels.

use serde::{Deserialize, Serialize};

/// A user action that is subject to a usage quota.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// Refreshing the current weather for the active location
    #[display("current_weather")]
    CurrentWeather,
    /// Generating an activity recommendation from the forecast
    #[display("activity_recommendation")]
    ActivityRecommendation,
    /// Switching the active location
    #[display("location_change")]
    LocationChange,
}

impl LimitKind {
    /// Stable name used as the collection key in stores and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::CurrentWeather => "current_weather",
            LimitKind::ActivityRecommendation => "activity_recommendation",
            LimitKind::LocationChange => "location_change",
        }
    }
}

impl std::str::FromStr for LimitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current_weather" => Ok(LimitKind::CurrentWeather),
            "activity_recommendation" => Ok(LimitKind::ActivityRecommendation),
            "location_change" => Ok(LimitKind::LocationChange),
            _ => Err(format!("Unknown limit kind: {}", s)),
        }
    }
}

/// Subscription level of the user performing an action.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Subscription {
    /// No active subscription
    #[default]
    #[display("free")]
    Free,
    /// Paid subscription with raised quotas
    #[display("premium")]
    Premium,
}

impl Subscription {
    /// Stable name used as the configuration key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Free => "free",
            Subscription::Premium => "premium",
        }
    }
}

impl std::str::FromStr for Subscription {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Subscription::Free),
            "premium" => Ok(Subscription::Premium),
            _ => Err(format!("Unknown subscription: {}", s)),
        }
    }
}
