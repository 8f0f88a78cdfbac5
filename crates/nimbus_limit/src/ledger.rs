//! Append-only timestamp log of consumed actions.
//!
//! Each `(user, kind)` pair owns a collection of [`TimestampRecord`]s. The
//! limiter only ever appends records and deletes expired ones; it never
//! edits a record in place.

use crate::LimitKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nimbus_error::NimbusResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

/// One consumed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampRecord {
    /// Store-assigned identifier
    pub id: Uuid,
    /// Server time at which the action was consumed
    pub at: DateTime<Utc>,
}

impl TimestampRecord {
    /// New record with a fresh identifier.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            at,
        }
    }
}

/// Trait for pluggable timestamp stores.
///
/// Implementations wrap whatever holds the authoritative record of past
/// actions (a remote document collection in production).
#[async_trait]
pub trait TimestampLog: Send + Sync {
    /// All records for a user and action, in no particular order.
    async fn list(&self, user: &str, kind: LimitKind) -> NimbusResult<Vec<TimestampRecord>>;

    /// Append a record stamped `at` and return it.
    async fn append(
        &self,
        user: &str,
        kind: LimitKind,
        at: DateTime<Utc>,
    ) -> NimbusResult<TimestampRecord>;

    /// Remove records by id, returning how many were removed.
    ///
    /// Unknown ids are ignored.
    async fn remove(&self, user: &str, kind: LimitKind, ids: &[Uuid]) -> NimbusResult<usize>;

    /// Remove every record for a user and action.
    async fn clear(&self, user: &str, kind: LimitKind) -> NimbusResult<usize>;

    /// Time as stamped by the store itself, if the backend can provide one.
    async fn server_time(&self) -> NimbusResult<Option<DateTime<Utc>>> {
        Ok(None)
    }
}

/// In-process timestamp log.
#[derive(Debug, Default)]
pub struct MemoryTimestampLog {
    records: RwLock<HashMap<(String, LimitKind), Vec<TimestampRecord>>>,
}

impl MemoryTimestampLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimestampLog for MemoryTimestampLog {
    async fn list(&self, user: &str, kind: LimitKind) -> NimbusResult<Vec<TimestampRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(user.to_string(), kind))
            .cloned()
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn append(
        &self,
        user: &str,
        kind: LimitKind,
        at: DateTime<Utc>,
    ) -> NimbusResult<TimestampRecord> {
        let record = TimestampRecord::new(at);
        self.records
            .write()
            .await
            .entry((user.to_string(), kind))
            .or_default()
            .push(record.clone());
        debug!(id = %record.id, "Appended timestamp record");
        Ok(record)
    }

    async fn remove(&self, user: &str, kind: LimitKind, ids: &[Uuid]) -> NimbusResult<usize> {
        let mut records = self.records.write().await;
        let Some(entries) = records.get_mut(&(user.to_string(), kind)) else {
            return Ok(0);
        };

        let before = entries.len();
        entries.retain(|record| !ids.contains(&record.id));
        Ok(before - entries.len())
    }

    async fn clear(&self, user: &str, kind: LimitKind) -> NimbusResult<usize> {
        Ok(self
            .records
            .write()
            .await
            .remove(&(user.to_string(), kind))
            .map(|entries| entries.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn collections_are_isolated_per_user_and_kind() {
        let log = MemoryTimestampLog::new();
        log.append("ana", LimitKind::CurrentWeather, at(10)).await.unwrap();
        log.append("ana", LimitKind::LocationChange, at(20)).await.unwrap();
        log.append("ben", LimitKind::CurrentWeather, at(30)).await.unwrap();

        let ana = log.list("ana", LimitKind::CurrentWeather).await.unwrap();
        assert_eq!(ana.len(), 1);
        assert_eq!(ana[0].at, at(10));
        assert!(log.list("cy", LimitKind::CurrentWeather).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_ignores_unknown_ids() {
        let log = MemoryTimestampLog::new();
        let kept = log.append("ana", LimitKind::CurrentWeather, at(10)).await.unwrap();
        let gone = log.append("ana", LimitKind::CurrentWeather, at(20)).await.unwrap();

        let removed = log
            .remove("ana", LimitKind::CurrentWeather, &[gone.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(log.list("ana", LimitKind::CurrentWeather).await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn memory_log_has_no_server_time() {
        assert_eq!(MemoryTimestampLog::new().server_time().await.unwrap(), None);
    }
}
