//! Configuration structures for usage limits.
//!
//! This module provides TOML-based configuration. The configuration system supports:
//! - Bundled defaults (include_str! from nimbus.toml)
//! - User overrides (./nimbus.toml or ~/.config/nimbus/nimbus.toml)
//! - Automatic merging with user values taking precedence

use crate::{DefaultQuota, LimitKind, QuotaTier, Subscription};
use config::{Config, File, FileFormat};
use nimbus_error::{ConfigError, NimbusResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Time web service used as the authoritative clock.
///
/// ```toml
/// [time_service]
/// url = "https://worldtimeapi.org/api/timezone/Etc/UTC"
/// timeout_secs = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeServiceConfig {
    /// Endpoint returning JSON with `unixtime` or `utc_datetime`
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial backoff between retries in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_primary_kind() -> LimitKind {
    LimitKind::CurrentWeather
}

fn default_freshness_secs() -> u64 {
    600
}

/// Top-level usage-limit configuration.
///
/// Loads from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from nimbus.toml)
/// 2. User override (~/.config/nimbus/nimbus.toml, then ./nimbus.toml)
///
/// # Example
///
/// ```no_run
/// use nimbus_limit::{LimitConfig, LimitKind, Subscription};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LimitConfig::load()?;
/// let quota = config.quota_for(Subscription::Free, LimitKind::CurrentWeather);
/// println!("Free weather refreshes per window: {}", quota.max_actions);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitConfig {
    /// Action whose fetches are short-circuited by the freshness cache
    #[serde(default = "default_primary_kind")]
    pub primary_kind: LimitKind,

    /// Freshness window in seconds (0 disables the freshness check)
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Authoritative time service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_service: Option<TimeServiceConfig>,

    /// Map of subscription name to per-kind quotas
    #[serde(default)]
    pub tiers: HashMap<String, HashMap<String, QuotaTier>>,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            primary_kind: default_primary_kind(),
            freshness_secs: default_freshness_secs(),
            time_service: None,
            tiers: HashMap::new(),
        }
    }
}

impl LimitConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> NimbusResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (nimbus.toml shipped with the library)
    /// 2. User config in home directory (~/.config/nimbus/nimbus.toml)
    /// 3. User config in current directory (./nimbus.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> NimbusResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../nimbus.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/nimbus/nimbus.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("nimbus").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every configured tier and quota is usable.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unknown subscription or kind names, for
    /// quotas with a zero-length window and for a zero time service timeout.
    pub fn validate(&self) -> NimbusResult<()> {
        if let Some(service) = &self.time_service
            && service.timeout_secs == 0
        {
            return Err(ConfigError::new("time_service.timeout_secs must be positive").into());
        }

        for (subscription, quotas) in &self.tiers {
            subscription.parse::<Subscription>().map_err(ConfigError::new)?;

            for (kind, quota) in quotas {
                kind.parse::<LimitKind>().map_err(ConfigError::new)?;

                if quota.window_secs == 0 {
                    return Err(ConfigError::new(format!(
                        "tiers.{}.{}: window_secs must be positive",
                        subscription, kind
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Quota for a subscription and action.
    ///
    /// Falls back to the built-in [`DefaultQuota`] when the configuration
    /// has no entry.
    pub fn quota_for(&self, subscription: Subscription, kind: LimitKind) -> QuotaTier {
        let configured = self
            .tiers
            .get(subscription.as_str())
            .and_then(|quotas| quotas.get(kind.as_str()));

        match configured {
            Some(quota) => quota.clone(),
            None => {
                debug!(%subscription, %kind, "No configured quota, using built-in default");
                DefaultQuota::new(subscription, kind).into()
            }
        }
    }

    /// Whether freshness short-circuiting applies to this action.
    pub fn uses_freshness(&self, kind: LimitKind) -> bool {
        kind == self.primary_kind && self.freshness_secs > 0
    }
}
