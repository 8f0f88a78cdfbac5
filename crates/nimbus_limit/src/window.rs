//! Sliding-window arithmetic.
//!
//! Pure functions over timestamps; no I/O happens here.

use crate::{Availability, LimitReason, TimestampRecord};
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

/// Records of one collection partitioned around the window start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowSplit {
    /// Records inside the window, oldest first
    pub surviving: Vec<TimestampRecord>,
    /// Ids of records at or before the window start
    pub expired: Vec<Uuid>,
}

/// Seconds as a time delta, saturating instead of overflowing.
pub(crate) fn saturating_seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Partition records into those inside `(now - window, ∞)` and the rest.
///
/// A record exactly `window` old is expired.
pub(crate) fn split_window(
    records: Vec<TimestampRecord>,
    now: DateTime<Utc>,
    window: TimeDelta,
) -> WindowSplit {
    let cutoff = now
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let (mut surviving, expired): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|record| record.at > cutoff);
    surviving.sort_by_key(|record| record.at);

    WindowSplit {
        surviving,
        expired: expired.into_iter().map(|record| record.id).collect(),
    }
}

/// Availability implied by the quota alone.
///
/// When the window holds `max_actions` or more records, the next slot opens
/// once enough of the oldest ones age out: at `surviving[len - max] + window`.
pub(crate) fn quota_availability(
    surviving: &[TimestampRecord],
    max_actions: u32,
    window: TimeDelta,
) -> Availability {
    if max_actions == 0 {
        return Availability::Reached {
            reason: LimitReason::Disabled,
            available_at: None,
        };
    }

    let max = max_actions as usize;
    let used = surviving.len();
    if used < max {
        return Availability::Available {
            remaining: (max - used) as u32,
        };
    }

    let pivot = surviving[used - max].at;
    Availability::Reached {
        reason: LimitReason::QuotaExhausted,
        available_at: Some(
            pivot
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
    }
}

/// End of the freshness window started by `last_fetched`, if `now` is inside it.
pub(crate) fn fresh_until(
    last_fetched: DateTime<Utc>,
    now: DateTime<Utc>,
    freshness: TimeDelta,
) -> Option<DateTime<Utc>> {
    let until = last_fetched.checked_add_signed(freshness)?;
    (now < until).then_some(until)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    fn records(seconds: &[i64]) -> Vec<TimestampRecord> {
        seconds.iter().map(|s| TimestampRecord::new(at(*s))).collect()
    }

    #[test]
    fn record_exactly_window_old_is_expired() {
        let all = records(&[400, 1000, 401]);
        let oldest_id = all[0].id;

        let split = split_window(all, at(1000), TimeDelta::seconds(600));
        assert_eq!(split.expired, vec![oldest_id]);
        let times: Vec<_> = split.surviving.iter().map(|r| r.at).collect();
        assert_eq!(times, vec![at(401), at(1000)]);
    }

    #[test]
    fn under_quota_reports_remaining() {
        let surviving = records(&[10, 20]);
        assert_eq!(
            quota_availability(&surviving, 5, TimeDelta::seconds(60)),
            Availability::Available { remaining: 3 }
        );
    }

    #[test]
    fn at_quota_reopens_when_oldest_ages_out() {
        let surviving = records(&[10, 20, 30]);
        assert_eq!(
            quota_availability(&surviving, 3, TimeDelta::seconds(60)),
            Availability::Reached {
                reason: LimitReason::QuotaExhausted,
                available_at: Some(at(70)),
            }
        );
    }

    #[test]
    fn over_quota_waits_for_enough_records_to_age_out() {
        // Quota lowered from 4 to 2 while four records are live.
        let surviving = records(&[10, 20, 30, 40]);
        assert_eq!(
            quota_availability(&surviving, 2, TimeDelta::seconds(60)),
            Availability::Reached {
                reason: LimitReason::QuotaExhausted,
                available_at: Some(at(90)),
            }
        );
    }

    #[test]
    fn zero_quota_is_disabled() {
        assert_eq!(
            quota_availability(&[], 0, TimeDelta::seconds(60)),
            Availability::Reached {
                reason: LimitReason::Disabled,
                available_at: None,
            }
        );
    }

    #[test]
    fn freshness_ends_exactly_at_deadline() {
        let window = TimeDelta::seconds(600);
        assert_eq!(fresh_until(at(100), at(699), window), Some(at(700)));
        assert_eq!(fresh_until(at(100), at(700), window), None);
        // A cached row from the future still counts as fresh.
        assert_eq!(fresh_until(at(500), at(100), window), Some(at(1100)));
    }
}
