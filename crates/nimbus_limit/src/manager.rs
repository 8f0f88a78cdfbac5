//! Usage-limit decisions.
//!
//! [`LimitManager`] combines three collaborators:
//! - a [`ServerClock`] that supplies authoritative time,
//! - a [`TimestampLog`] of past actions per user and kind,
//! - a [`FreshnessCache`] holding the last primary fetch time.
//!
//! A check counts the records inside the sliding window, deletes the ones
//! that fell out of it, and for the primary kind also refuses while the last
//! fetch is still fresh. Only [`LimitManager::consume`] appends records.

use crate::window::{fresh_until, quota_availability, saturating_seconds, split_window};
use crate::{
    FreshnessCache, LimitConfig, LimitKind, Quota, QuotaTier, ServerClock, Subscription,
    TimestampLog, TimestampRecord,
};
use chrono::{DateTime, TimeDelta, Utc};
use nimbus_error::NimbusResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Why an action is currently unavailable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LimitReason {
    /// The sliding window already holds the full quota
    #[display("quota exhausted")]
    QuotaExhausted,
    /// A recent result is cached and should be served instead
    #[display("cached result still fresh")]
    Fresh,
    /// The tier allows no actions of this kind
    #[display("not available on this plan")]
    Disabled,
}

/// Outcome of a limit calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    /// The action may be performed now
    Available {
        /// Actions left in the current window, including this one
        remaining: u32,
    },
    /// The action may not be performed now
    Reached {
        /// Why the action is blocked
        reason: LimitReason,
        /// Server time at which it becomes available again (`None` = never)
        available_at: Option<DateTime<Utc>>,
    },
}

/// Snapshot of one user's limit for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct LimitStatus {
    user: String,
    kind: LimitKind,
    subscription: Subscription,
    /// Server time the decision was made at
    checked_at: DateTime<Utc>,
    /// Records inside the window
    used: u32,
    max_actions: u32,
    window_secs: u64,
    availability: Availability,
}

impl LimitStatus {
    /// Whether the action may be performed now.
    pub fn is_available(&self) -> bool {
        matches!(self.availability, Availability::Available { .. })
    }

    /// Actions left in the window (zero when blocked).
    pub fn remaining(&self) -> u32 {
        match self.availability {
            Availability::Available { remaining } => remaining,
            Availability::Reached { .. } => 0,
        }
    }

    /// When a blocked action becomes available again.
    pub fn available_at(&self) -> Option<DateTime<Utc>> {
        match self.availability {
            Availability::Available { .. } => None,
            Availability::Reached { available_at, .. } => available_at,
        }
    }

    /// Why the action is blocked, if it is.
    pub fn reason(&self) -> Option<LimitReason> {
        match self.availability {
            Availability::Available { .. } => None,
            Availability::Reached { reason, .. } => Some(reason),
        }
    }

    /// Time left until a blocked action becomes available.
    pub fn wait(&self) -> Option<TimeDelta> {
        self.available_at().map(|at| at - self.checked_at)
    }
}

/// Result of trying to spend one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consumption {
    /// A timestamp was recorded; `status` reflects the state after recording
    Granted {
        /// The appended record
        record: TimestampRecord,
        /// Limit state after consumption
        status: LimitStatus,
    },
    /// Nothing was recorded
    Denied(LimitStatus),
}

impl Consumption {
    /// Whether the action was recorded.
    pub fn is_granted(&self) -> bool {
        matches!(self, Consumption::Granted { .. })
    }

    /// Limit state after the attempt.
    pub fn status(&self) -> &LimitStatus {
        match self {
            Consumption::Granted { status, .. } => status,
            Consumption::Denied(status) => status,
        }
    }
}

/// Decides whether user actions are allowed.
///
/// # Example
///
/// ```
/// use nimbus_limit::{
///     LimitConfig, LimitKind, LimitManager, ManualClock, MemoryFreshnessCache,
///     MemoryTimestampLog, Subscription,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let clock = ManualClock::new(chrono::Utc::now());
/// let manager = LimitManager::new(
///     Arc::new(clock),
///     Arc::new(MemoryTimestampLog::new()),
///     Arc::new(MemoryFreshnessCache::new()),
///     LimitConfig::default(),
/// );
///
/// let outcome = manager
///     .consume("user-1", LimitKind::ActivityRecommendation, Subscription::Free)
///     .await?;
/// assert!(outcome.is_granted());
/// # Ok(())
/// # }
/// ```
pub struct LimitManager {
    clock: Arc<dyn ServerClock>,
    log: Arc<dyn TimestampLog>,
    freshness: Arc<dyn FreshnessCache>,
    config: LimitConfig,
    consume_lock: Mutex<()>,
}

impl LimitManager {
    /// Create a manager over the given collaborators.
    pub fn new(
        clock: Arc<dyn ServerClock>,
        log: Arc<dyn TimestampLog>,
        freshness: Arc<dyn FreshnessCache>,
        config: LimitConfig,
    ) -> Self {
        debug!(
            clock = clock.source(),
            primary = %config.primary_kind,
            freshness_secs = config.freshness_secs,
            "Creating limit manager"
        );
        Self {
            clock,
            log,
            freshness,
            config,
            consume_lock: Mutex::new(()),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    /// Decide whether `user` may perform `kind` now.
    ///
    /// Expired records are deleted as a side effect; a failed deletion is
    /// logged and does not fail the check.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock, the timestamp log, or the freshness
    /// cache cannot be read.
    #[instrument(skip(self), fields(%kind, %subscription))]
    pub async fn calculate_limit(
        &self,
        user: &str,
        kind: LimitKind,
        subscription: Subscription,
    ) -> NimbusResult<LimitStatus> {
        let now = self.clock.now().await?;
        let (status, _) = self.evaluate(user, kind, subscription, now).await?;
        debug!(
            used = status.used,
            max_actions = status.max_actions,
            available = status.is_available(),
            "Calculated limit"
        );
        Ok(status)
    }

    /// Calculate limits for every kind, in declaration order.
    #[instrument(skip(self), fields(%subscription))]
    pub async fn calculate_all(
        &self,
        user: &str,
        subscription: Subscription,
    ) -> NimbusResult<Vec<LimitStatus>> {
        let now = self.clock.now().await?;
        let mut statuses = Vec::new();
        for kind in LimitKind::iter() {
            let (status, _) = self.evaluate(user, kind, subscription, now).await?;
            statuses.push(status);
        }
        Ok(statuses)
    }

    /// Spend one action if the limit allows it.
    ///
    /// On success a timestamp stamped with server time is appended and, for
    /// the primary kind, the freshness cache is updated. Consumptions through
    /// the same manager are serialized.
    ///
    /// # Errors
    ///
    /// Returns an error if any collaborator fails; nothing is recorded in
    /// that case unless the append itself succeeded.
    #[instrument(skip(self), fields(%kind, %subscription))]
    pub async fn consume(
        &self,
        user: &str,
        kind: LimitKind,
        subscription: Subscription,
    ) -> NimbusResult<Consumption> {
        let _guard = self.consume_lock.lock().await;

        let now = self.clock.now().await?;
        let (status, mut surviving) = self.evaluate(user, kind, subscription, now).await?;
        if !status.is_available() {
            info!(
                reason = ?status.reason(),
                available_at = ?status.available_at(),
                "Action denied"
            );
            return Ok(Consumption::Denied(status));
        }

        let record = self.log.append(user, kind, now).await?;
        let last_fetched = if self.config.uses_freshness(kind) {
            self.freshness.record_fetch(now).await?;
            Some(now)
        } else {
            None
        };

        let slot = surviving.partition_point(|existing| existing.at <= record.at);
        surviving.insert(slot, record.clone());
        let quota = self.config.quota_for(subscription, kind);
        let status = self.status(user, kind, subscription, now, &quota, &surviving, last_fetched);

        info!(
            used = status.used,
            max_actions = status.max_actions,
            "Action granted"
        );
        Ok(Consumption::Granted { record, status })
    }

    /// Delete expired records, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Unlike the pruning done during a check, a failed deletion is returned.
    #[instrument(skip(self), fields(%kind, %subscription))]
    pub async fn prune(
        &self,
        user: &str,
        kind: LimitKind,
        subscription: Subscription,
    ) -> NimbusResult<usize> {
        let now = self.clock.now().await?;
        let quota = self.config.quota_for(subscription, kind);
        let split = split_window(self.log.list(user, kind).await?, now, quota.window());
        if split.expired.is_empty() {
            return Ok(0);
        }

        let removed = self.log.remove(user, kind, &split.expired).await?;
        info!(removed, "Pruned expired records");
        Ok(removed)
    }

    /// Delete every record for `user` and `kind`, reopening the window.
    #[instrument(skip(self), fields(%kind))]
    pub async fn reset(&self, user: &str, kind: LimitKind) -> NimbusResult<usize> {
        let removed = self.log.clear(user, kind).await?;
        if kind == self.config.primary_kind {
            self.freshness.clear().await?;
        }
        info!(removed, "Reset limit");
        Ok(removed)
    }

    async fn evaluate(
        &self,
        user: &str,
        kind: LimitKind,
        subscription: Subscription,
        now: DateTime<Utc>,
    ) -> NimbusResult<(LimitStatus, Vec<TimestampRecord>)> {
        let quota = self.config.quota_for(subscription, kind);
        let split = split_window(self.log.list(user, kind).await?, now, quota.window());

        if !split.expired.is_empty() {
            match self.log.remove(user, kind, &split.expired).await {
                Ok(removed) => debug!(removed, "Pruned expired records"),
                Err(e) => warn!(error = %e, "Failed to prune expired records"),
            }
        }

        let within_quota = split.surviving.len() < quota.max_actions as usize;
        let last_fetched = if within_quota && self.config.uses_freshness(kind) {
            self.freshness.last_fetched().await?
        } else {
            None
        };

        let status = self.status(
            user,
            kind,
            subscription,
            now,
            &quota,
            &split.surviving,
            last_fetched,
        );
        Ok((status, split.surviving))
    }

    #[allow(clippy::too_many_arguments)]
    fn status(
        &self,
        user: &str,
        kind: LimitKind,
        subscription: Subscription,
        now: DateTime<Utc>,
        quota: &QuotaTier,
        surviving: &[TimestampRecord],
        last_fetched: Option<DateTime<Utc>>,
    ) -> LimitStatus {
        let mut availability = quota_availability(surviving, quota.max_actions, quota.window());

        if matches!(availability, Availability::Available { .. })
            && self.config.uses_freshness(kind)
            && let Some(until) = last_fetched.and_then(|last| {
                fresh_until(last, now, saturating_seconds(self.config.freshness_secs))
            })
        {
            availability = Availability::Reached {
                reason: LimitReason::Fresh,
                available_at: Some(until),
            };
        }

        LimitStatus {
            user: user.to_string(),
            kind,
            subscription,
            checked_at: now,
            used: u32::try_from(surviving.len()).unwrap_or(u32::MAX),
            max_actions: quota.max_actions,
            window_secs: quota.window_secs,
            availability,
        }
    }
}
