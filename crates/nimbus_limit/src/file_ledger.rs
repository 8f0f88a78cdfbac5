//! File-backed timestamp log.
//!
//! Stores one JSON document per user and action:
//!
//! ```text
//! {base_path}/
//! └── {user}/
//!     ├── current_weather.json
//!     ├── activity_recommendation.json
//!     └── location_change.json
//! ```
//!
//! User ids are escaped so that every id maps to exactly one directory.
//! Writes go through a temp file + rename; a process-wide mutex serializes
//! read-modify-write cycles.

use crate::fs::{encode_segment, read_json, write_json_atomic};
use crate::{LimitKind, TimestampLog, TimestampRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nimbus_error::{NimbusResult, StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LogDocument {
    #[serde(default)]
    records: Vec<TimestampRecord>,
}

/// Timestamp log persisted as JSON documents on the local filesystem.
#[derive(Debug)]
pub struct FileTimestampLog {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTimestampLog {
    /// Create a log rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> NimbusResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Opened file timestamp log");
        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    fn document_path(&self, user: &str, kind: LimitKind) -> PathBuf {
        self.base_path
            .join(encode_segment(user))
            .join(format!("{}.json", kind.as_str()))
    }

    async fn load(&self, user: &str, kind: LimitKind) -> NimbusResult<LogDocument> {
        Ok(read_json(&self.document_path(user, kind))
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl TimestampLog for FileTimestampLog {
    async fn list(&self, user: &str, kind: LimitKind) -> NimbusResult<Vec<TimestampRecord>> {
        Ok(self.load(user, kind).await?.records)
    }

    #[instrument(skip(self))]
    async fn append(
        &self,
        user: &str,
        kind: LimitKind,
        at: DateTime<Utc>,
    ) -> NimbusResult<TimestampRecord> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.load(user, kind).await?;
        let record = TimestampRecord::new(at);
        document.records.push(record.clone());
        write_json_atomic(&self.document_path(user, kind), &document).await?;

        debug!(id = %record.id, total = document.records.len(), "Appended timestamp record");
        Ok(record)
    }

    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    async fn remove(&self, user: &str, kind: LimitKind, ids: &[Uuid]) -> NimbusResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;

        let mut document = self.load(user, kind).await?;
        let before = document.records.len();
        document.records.retain(|record| !ids.contains(&record.id));
        let removed = before - document.records.len();

        if removed > 0 {
            write_json_atomic(&self.document_path(user, kind), &document).await?;
        }
        debug!(removed, "Removed timestamp records");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self, user: &str, kind: LimitKind) -> NimbusResult<usize> {
        let _guard = self.write_lock.lock().await;

        let path = self.document_path(user, kind);
        let document = self.load(user, kind).await?;
        if document.records.is_empty() {
            return Ok(0);
        }

        tokio::fs::remove_file(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "remove {}: {}",
                path.display(),
                e
            )))
        })?;
        Ok(document.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileTimestampLog::new(dir.path()).unwrap();
        let record = first
            .append("ana@example.com", LimitKind::LocationChange, at(100))
            .await
            .unwrap();
        drop(first);

        let reopened = FileTimestampLog::new(dir.path()).unwrap();
        let records = reopened
            .list("ana@example.com", LimitKind::LocationChange)
            .await
            .unwrap();
        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileTimestampLog::new(dir.path()).unwrap();
        let path = log.document_path("ana", LimitKind::CurrentWeather);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(log.list("ana", LimitKind::CurrentWeather).await.is_err());
    }

    #[tokio::test]
    async fn clear_removes_document() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileTimestampLog::new(dir.path()).unwrap();
        log.append("ana", LimitKind::CurrentWeather, at(1)).await.unwrap();
        log.append("ana", LimitKind::CurrentWeather, at(2)).await.unwrap();

        assert_eq!(log.clear("ana", LimitKind::CurrentWeather).await.unwrap(), 2);
        assert_eq!(log.clear("ana", LimitKind::CurrentWeather).await.unwrap(), 0);
        assert!(!log.document_path("ana", LimitKind::CurrentWeather).exists());
    }
}
