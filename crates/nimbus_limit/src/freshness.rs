//! Local freshness cache for the most recent primary fetch.
//!
//! The cache holds a single row: when the last weather result was fetched.
//! If that result is still fresh the limiter reports the action as
//! unavailable so that the caller serves the cached result instead of
//! spending quota.

use crate::fs::{read_json, write_json_atomic};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nimbus_error::{NimbusErrorKind, NimbusResult, StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Single-row store of the last primary fetch time.
#[async_trait]
pub trait FreshnessCache: Send + Sync {
    /// Time of the last recorded fetch, if any.
    async fn last_fetched(&self) -> NimbusResult<Option<DateTime<Utc>>>;

    /// Record a fetch at `at`, replacing any previous row.
    async fn record_fetch(&self, at: DateTime<Utc>) -> NimbusResult<()>;

    /// Forget the cached row.
    async fn clear(&self) -> NimbusResult<()>;
}

/// In-process freshness cache.
#[derive(Debug, Default)]
pub struct MemoryFreshnessCache {
    fetched_at: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryFreshnessCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FreshnessCache for MemoryFreshnessCache {
    async fn last_fetched(&self) -> NimbusResult<Option<DateTime<Utc>>> {
        Ok(*self.fetched_at.read().await)
    }

    async fn record_fetch(&self, at: DateTime<Utc>) -> NimbusResult<()> {
        *self.fetched_at.write().await = Some(at);
        Ok(())
    }

    async fn clear(&self) -> NimbusResult<()> {
        *self.fetched_at.write().await = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FreshnessRow {
    fetched_at: DateTime<Utc>,
}

/// Freshness cache persisted as a single JSON file.
///
/// A missing or undecodable file reads as "nothing cached": the cache is an
/// optimization, so a damaged row must not block the user.
#[derive(Debug, Clone)]
pub struct FileFreshnessCache {
    path: PathBuf,
}

impl FileFreshnessCache {
    /// Cache stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FreshnessCache for FileFreshnessCache {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn last_fetched(&self) -> NimbusResult<Option<DateTime<Utc>>> {
        match read_json::<FreshnessRow>(&self.path).await {
            Ok(row) => Ok(row.map(|row| row.fetched_at)),
            Err(e) => match e.kind() {
                NimbusErrorKind::Storage(StorageError {
                    kind: StorageErrorKind::Corrupt(_),
                    ..
                }) => {
                    warn!(error = %e, "Ignoring corrupt freshness cache");
                    Ok(None)
                }
                _ => Err(e),
            },
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn record_fetch(&self, at: DateTime<Utc>) -> NimbusResult<()> {
        write_json_atomic(&self.path, &FreshnessRow { fetched_at: at }).await?;
        debug!(%at, "Recorded fetch in freshness cache");
        Ok(())
    }

    async fn clear(&self) -> NimbusResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "remove {}: {}",
                self.path.display(),
                e
            )))
            .into()),
        }
    }
}
