//! Authoritative time sources.
//!
//! Usage limits are computed against server time so that moving the device
//! clock cannot reopen a closed window. [`ServerClock`] is the seam; the
//! production implementations ask a time web service ([`HttpTimeClock`]) or the
//! document store itself ([`StoreClock`]), optionally chained with
//! [`FallbackClock`].

use crate::{TimeServiceConfig, TimestampLog};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use nimbus_error::{ClockError, ClockErrorKind, HttpError, NimbusResult, RetryableError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Source of the current time.
#[async_trait]
pub trait ServerClock: Send + Sync {
    /// Current time according to this source.
    async fn now(&self) -> NimbusResult<DateTime<Utc>>;

    /// Short name of the source for logs and errors.
    fn source(&self) -> &str;
}

/// Clock backed by a JSON time web service.
///
/// The endpoint must answer with an object containing either `unixtime`
/// (seconds since the epoch) or `utc_datetime`/`datetime` (RFC 3339).
/// Transient failures are retried with exponential backoff and jitter.
#[derive(Debug, Clone)]
pub struct HttpTimeClock {
    client: reqwest::Client,
    url: String,
    max_retries: usize,
    initial_backoff_ms: u64,
}

impl HttpTimeClock {
    /// Create a clock from time service configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[instrument(skip(config), fields(url = %config.url))]
    pub fn new(config: &TimeServiceConfig) -> NimbusResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;

        debug!("Created time service clock");
        Ok(Self {
            client,
            url: config.url.clone(),
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
        })
    }

    async fn fetch_once(&self) -> NimbusResult<DateTime<Utc>> {
        let response = self.client.get(&self.url).send().await.map_err(|e| match e.status() {
            Some(status) => HttpError::with_status(status.as_u16(), e.to_string()),
            None => HttpError::new(e.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::with_status(
                status.as_u16(),
                format!("time service answered {}", status),
            )
            .into());
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ClockError::new(ClockErrorKind::Malformed(format!("body is not JSON: {}", e)))
        })?;

        Ok(parse_time_response(&body)?)
    }
}

#[async_trait]
impl ServerClock for HttpTimeClock {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn now(&self) -> NimbusResult<DateTime<Utc>> {
        use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};

        let retry_strategy = ExponentialBackoff::from_millis(self.initial_backoff_ms.max(1))
            .factor(2)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_retries);

        let now = Retry::spawn(retry_strategy, || async {
            match self.fetch_once().await {
                Ok(now) => Ok(now),
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "Transient time service error, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Permanent time service error, failing immediately");
                    Err(RetryError::Permanent(e))
                }
            }
        })
        .await?;

        debug!(%now, "Fetched server time");
        Ok(now)
    }

    fn source(&self) -> &str {
        "time_service"
    }
}

/// Extract a UTC timestamp from a time service response body.
///
/// # Errors
///
/// Returns `ClockErrorKind::Malformed` if no supported field is present or
/// the value cannot be interpreted.
pub fn parse_time_response(body: &serde_json::Value) -> Result<DateTime<Utc>, ClockError> {
    if let Some(seconds) = body.get("unixtime").and_then(serde_json::Value::as_i64) {
        return DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            ClockError::new(ClockErrorKind::Malformed(format!(
                "unixtime {} out of range",
                seconds
            )))
        });
    }

    for field in ["utc_datetime", "datetime"] {
        if let Some(text) = body.get(field).and_then(serde_json::Value::as_str) {
            return DateTime::parse_from_rfc3339(text)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| {
                    ClockError::new(ClockErrorKind::Malformed(format!(
                        "{} {:?}: {}",
                        field, text, e
                    )))
                });
        }
    }

    Err(ClockError::new(ClockErrorKind::Malformed(
        "response has no unixtime, utc_datetime or datetime field".to_string(),
    )))
}

/// Clock that asks the timestamp store for its own notion of time.
///
/// Mirrors a document-database round trip: the store stamps a value
/// server-side and the stamp is read back.
#[derive(Clone)]
pub struct StoreClock {
    log: Arc<dyn TimestampLog>,
}

impl StoreClock {
    /// Wrap a timestamp log.
    pub fn new(log: Arc<dyn TimestampLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl ServerClock for StoreClock {
    async fn now(&self) -> NimbusResult<DateTime<Utc>> {
        self.log.server_time().await?.ok_or_else(|| {
            ClockError::new(ClockErrorKind::Unavailable(
                "timestamp store does not provide server time".to_string(),
            ))
            .into()
        })
    }

    fn source(&self) -> &str {
        "store"
    }
}

/// Tries a primary clock and falls back to a secondary one.
#[derive(Clone)]
pub struct FallbackClock {
    primary: Arc<dyn ServerClock>,
    secondary: Arc<dyn ServerClock>,
}

impl FallbackClock {
    /// Chain two clocks.
    pub fn new(primary: Arc<dyn ServerClock>, secondary: Arc<dyn ServerClock>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl ServerClock for FallbackClock {
    #[instrument(skip(self), fields(primary = self.primary.source(), secondary = self.secondary.source()))]
    async fn now(&self) -> NimbusResult<DateTime<Utc>> {
        let primary_err = match self.primary.now().await {
            Ok(now) => return Ok(now),
            Err(e) => e,
        };
        warn!(error = %primary_err, "Primary clock failed, trying secondary");

        self.secondary.now().await.map_err(|secondary_err| {
            ClockError::new(ClockErrorKind::Exhausted(format!(
                "{}: {}; {}: {}",
                self.primary.source(),
                primary_err,
                self.secondary.source(),
                secondary_err
            )))
            .into()
        })
    }

    fn source(&self) -> &str {
        "fallback"
    }
}

/// Clock whose time is set by hand.
///
/// Clones share the same instant, so a test can keep a handle and advance
/// the clock that a manager owns.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Current instant.
    pub fn get(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    /// Move the clock forward (or backward, for negative deltas).
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

#[async_trait]
impl ServerClock for ManualClock {
    async fn now(&self) -> NimbusResult<DateTime<Utc>> {
        Ok(self.get())
    }

    fn source(&self) -> &str {
        "manual"
    }
}

/// The device clock.
///
/// Only for local development: it gives up the protection against clock
/// tampering that the other sources provide.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl ServerClock for SystemClock {
    async fn now(&self) -> NimbusResult<DateTime<Utc>> {
        Ok(Utc::now())
    }

    fn source(&self) -> &str {
        "system"
    }
}
