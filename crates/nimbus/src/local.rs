//! Wiring of a manager over on-disk stores.

use nimbus_error::{ConfigError, NimbusResult};
use nimbus_limit::{
    FileFreshnessCache, FileTimestampLog, HttpTimeClock, LimitConfig, LimitManager, ServerClock,
    SystemClock,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Pick the clock a manager should trust.
///
/// The configured time service is used unless `local_clock` is set.
///
/// # Errors
///
/// Returns a `ConfigError` when no time service is configured and the local
/// clock was not requested.
pub fn select_clock(config: &LimitConfig, local_clock: bool) -> NimbusResult<Arc<dyn ServerClock>> {
    if local_clock {
        warn!("Using the local system clock; limits can be bypassed by changing it");
        return Ok(Arc::new(SystemClock));
    }

    let service = config.time_service.as_ref().ok_or_else(|| {
        ConfigError::new("no [time_service] configured; pass --local-clock to use the system clock")
    })?;
    Ok(Arc::new(HttpTimeClock::new(service)?))
}

/// Build a manager whose log and freshness cache live under `data_dir`.
///
/// Layout: `{data_dir}/log/` for timestamp records and
/// `{data_dir}/freshness.json` for the freshness row.
#[instrument(skip(config), fields(data_dir = %data_dir.display()))]
pub fn open_local(
    data_dir: &Path,
    config: LimitConfig,
    local_clock: bool,
) -> NimbusResult<LimitManager> {
    let clock = select_clock(&config, local_clock)?;
    let log = FileTimestampLog::new(data_dir.join("log"))?;
    let freshness = FileFreshnessCache::new(data_dir.join("freshness.json"));

    info!(clock = clock.source(), "Opened local limit stores");
    Ok(LimitManager::new(
        clock,
        Arc::new(log),
        Arc::new(freshness),
        config,
    ))
}
