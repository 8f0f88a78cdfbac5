//! Tests for usage-limit configuration loading.

use nimbus_limit::{LimitConfig, LimitKind, Quota, Subscription};

const BUNDLED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../nimbus.toml");

fn bundled() -> LimitConfig {
    LimitConfig::from_file(BUNDLED).unwrap()
}

#[test]
fn test_load_bundled_defaults() {
    let config = bundled();

    assert_eq!(config.primary_kind, LimitKind::CurrentWeather);
    assert!(config.tiers.contains_key("free"));
    assert!(config.tiers.contains_key("premium"));

    let service = config.time_service.as_ref().unwrap();
    assert!(service.url.starts_with("https://"));
}

#[test]
fn test_bundled_premium_quota_exceeds_free() {
    let config = bundled();

    let free = config.quota_for(Subscription::Free, LimitKind::CurrentWeather);
    let premium = config.quota_for(Subscription::Premium, LimitKind::CurrentWeather);

    assert!(premium.max_actions() > free.max_actions());
    assert_eq!(free.window_secs(), premium.window_secs());
}

#[test]
fn test_config_from_file() {
    use std::io::Write;
    use tempfile::Builder;

    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
freshness_secs = 120

[tiers.free.location_change]
name = "Tight"
max_actions = 1
window_secs = 7_200
"#
    )
    .unwrap();

    let config = LimitConfig::from_file(temp_file.path()).unwrap();

    assert_eq!(config.freshness_secs, 120);
    assert_eq!(config.primary_kind, LimitKind::CurrentWeather);
    assert!(config.time_service.is_none());

    let quota = config.quota_for(Subscription::Free, LimitKind::LocationChange);
    assert_eq!(quota.name(), "Tight");
    assert_eq!(quota.max_actions(), 1);
    assert_eq!(quota.window_secs(), 7_200);
}

#[test]
fn test_config_from_file_rejects_zero_window() {
    use std::io::Write;
    use tempfile::Builder;

    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
[tiers.premium.current_weather]
max_actions = 10
window_secs = 0
"#
    )
    .unwrap();

    assert!(LimitConfig::from_file(temp_file.path()).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(LimitConfig::from_file(dir.path().join("absent.toml")).is_err());
}
