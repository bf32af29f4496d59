//! Tests for torpedo::poll: success, timeout, cancellation and error propagation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use torpedo::error::Error;
use torpedo::poll::poll_until;

fn counting(calls: &Arc<AtomicU32>, succeed_on: u32) -> impl FnMut() -> std::future::Ready<torpedo::Result<bool>> {
    let calls = Arc::clone(calls);
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        std::future::ready(Ok(n >= succeed_on))
    }
}

#[tokio::test(start_paused = true)]
async fn checks_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();
    poll_until(
        counting(&calls, 1),
        Duration::from_secs(10),
        Duration::from_secs(60),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn retries_on_interval() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();
    poll_until(
        counting(&calls, 3),
        Duration::from_secs(10),
        Duration::from_secs(60),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn times_out_at_deadline() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();
    let err = poll_until(
        counting(&calls, u32::MAX),
        Duration::from_secs(10),
        Duration::from_secs(25),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(25)));
    // 0s, 10s, 20s, then a final check at the 25s deadline.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(25));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        trigger.cancel();
    });
    let calls = Arc::new(AtomicU32::new(0));
    let err = poll_until(
        counting(&calls, u32::MAX),
        Duration::from_secs(10),
        Duration::from_secs(600),
        &cancel,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn predicate_error_stops_polling() {
    let err = poll_until(
        || async { Err(Error::Other(anyhow!("api down"))) },
        Duration::from_secs(1),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "api down");
}

// ── unbounded timeouts ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn max_configured_timeout_does_not_overflow() {
    let settings = torpedo::config::Settings::from_toml(
        "[resiliency]\npoll_timeout_secs = 9223372036854775807",
    )
    .unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    poll_until(
        counting(&calls, 3),
        Duration::from_secs(1),
        settings.poll_timeout(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn max_duration_timeout_still_cancels() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });
    let err = poll_until(
        || async { Ok(false) },
        Duration::from_secs(1),
        Duration::MAX,
        &cancel,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Cancelled), "got {err:?}");
}
