//! Tests for the HTTP time service clock against a local stub server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nimbus_error::{NimbusErrorKind, NimbusResult};
use nimbus_limit::{
    FallbackClock, HttpTimeClock, LimitKind, ManualClock, ServerClock, StoreClock,
    TimeServiceConfig, TimestampLog, TimestampRecord,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve the given `(status line, body)` responses, one per connection.
/// The last response repeats once the list is exhausted.
async fn stub_server(responses: Vec<(&'static str, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses[n.min(responses.len() - 1)];

            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}/time", addr), hits)
}

fn service(url: String) -> TimeServiceConfig {
    TimeServiceConfig {
        url,
        timeout_secs: 5,
        max_retries: 2,
        initial_backoff_ms: 1,
    }
}

#[tokio::test]
async fn test_reads_unixtime_from_service() {
    let (url, hits) = stub_server(vec![("200 OK", r#"{"unixtime": 1700000000}"#)]).await;
    let clock = HttpTimeClock::new(&service(url)).unwrap();

    let now = clock.now().await.unwrap();

    assert_eq!(now.timestamp(), 1_700_000_000);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retries_transient_failures() {
    let (url, hits) = stub_server(vec![
        ("503 Service Unavailable", "{}"),
        ("200 OK", r#"{"utc_datetime": "2024-06-01T08:30:00+00:00"}"#),
    ])
    .await;
    let clock = HttpTimeClock::new(&service(url)).unwrap();

    let now = clock.now().await.unwrap();

    assert_eq!(now.to_rfc3339(), "2024-06-01T08:30:00+00:00");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_does_not_retry_permanent_failures() {
    let (url, hits) = stub_server(vec![("404 Not Found", "{}")]).await;
    let clock = HttpTimeClock::new(&service(url)).unwrap();

    let err = clock.now().await.unwrap_err();

    assert!(matches!(err.kind(), NimbusErrorKind::Http(e) if e.status == Some(404)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_body_is_a_clock_error() {
    let (url, hits) = stub_server(vec![("200 OK", r#"{"timezone": "Etc/UTC"}"#)]).await;
    let clock = HttpTimeClock::new(&service(url)).unwrap();

    let err = clock.now().await.unwrap_err();

    assert!(matches!(err.kind(), NimbusErrorKind::Clock(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let (url, hits) = stub_server(vec![("500 Internal Server Error", "{}")]).await;
    let clock = HttpTimeClock::new(&service(url)).unwrap();

    assert!(clock.now().await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

/// Log that stamps time server-side, like a document database.
struct StampingLog {
    now: DateTime<Utc>,
}

#[async_trait]
impl TimestampLog for StampingLog {
    async fn list(&self, _: &str, _: LimitKind) -> NimbusResult<Vec<TimestampRecord>> {
        Ok(Vec::new())
    }

    async fn append(
        &self,
        _: &str,
        _: LimitKind,
        at: DateTime<Utc>,
    ) -> NimbusResult<TimestampRecord> {
        Ok(TimestampRecord::new(at))
    }

    async fn remove(&self, _: &str, _: LimitKind, _: &[uuid::Uuid]) -> NimbusResult<usize> {
        Ok(0)
    }

    async fn clear(&self, _: &str, _: LimitKind) -> NimbusResult<usize> {
        Ok(0)
    }

    async fn server_time(&self) -> NimbusResult<Option<DateTime<Utc>>> {
        Ok(Some(self.now))
    }
}

#[tokio::test]
async fn test_store_clock_reads_store_time() {
    let stamped = DateTime::from_timestamp(42, 0).unwrap();
    let clock = StoreClock::new(Arc::new(StampingLog { now: stamped }));

    assert_eq!(clock.now().await.unwrap(), stamped);
}

#[tokio::test]
async fn test_fallback_uses_secondary_when_primary_fails() {
    let secondary_time = DateTime::from_timestamp(7_000, 0).unwrap();
    let clock = FallbackClock::new(
        Arc::new(StoreClock::new(Arc::new(nimbus_limit::MemoryTimestampLog::new()))),
        Arc::new(ManualClock::new(secondary_time)),
    );

    assert_eq!(clock.now().await.unwrap(), secondary_time);
}

#[tokio::test]
async fn test_fallback_reports_both_failures() {
    let clock = FallbackClock::new(
        Arc::new(StoreClock::new(Arc::new(nimbus_limit::MemoryTimestampLog::new()))),
        Arc::new(StoreClock::new(Arc::new(nimbus_limit::MemoryTimestampLog::new()))),
    );

    let err = clock.now().await.unwrap_err();
    assert!(matches!(err.kind(), NimbusErrorKind::Clock(_)));
    assert!(err.to_string().contains("All time sources failed"));
}
