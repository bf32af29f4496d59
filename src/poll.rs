//! Poll a condition until it holds, times out, or is cancelled.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Error, Result};

/// Evaluate `predicate` immediately and then every `interval` until it returns
/// `Ok(true)`. Predicate errors end the poll and are returned as-is.
pub async fn poll_until<F, Fut>(
    mut predicate: F,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = deadline_after(timeout);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if predicate().await? {
            trace!(attempt, "condition met");
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout(timeout));
        }
        let wait = interval.min(deadline.saturating_duration_since(now));
        tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            () = sleep(wait) => {}
        }
    }
}

/// `now + timeout`, saturating to roughly thirty years out.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}
