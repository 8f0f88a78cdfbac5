//! Human-readable rendering of limit decisions.

use chrono::SecondsFormat;
use nimbus_limit::{Availability, Consumption, LimitStatus};

/// One-line summary of a limit status.
///
/// ```text
/// current_weather (free): available, 4 of 6 left per 3600s
/// location_change (free): blocked (quota exhausted) until 2024-06-01T09:00:00Z, 2/2 used
/// ```
pub fn render_status(status: &LimitStatus) -> String {
    let head = format!("{} ({})", status.kind(), status.subscription());

    match status.availability() {
        Availability::Available { remaining } => format!(
            "{}: available, {} of {} left per {}s",
            head,
            remaining,
            status.max_actions(),
            status.window_secs()
        ),
        Availability::Reached {
            reason,
            available_at: Some(at),
        } => format!(
            "{}: blocked ({}) until {}, {}/{} used",
            head,
            reason,
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            status.used(),
            status.max_actions()
        ),
        Availability::Reached {
            reason,
            available_at: None,
        } => format!("{}: blocked ({})", head, reason),
    }
}

/// One-line summary of a consumption attempt.
pub fn render_consumption(consumption: &Consumption) -> String {
    match consumption {
        Consumption::Granted { record, status } => format!(
            "granted at {} -> {}",
            record.at.to_rfc3339_opts(SecondsFormat::Secs, true),
            render_status(status)
        ),
        Consumption::Denied(status) => format!("denied -> {}", render_status(status)),
    }
}
