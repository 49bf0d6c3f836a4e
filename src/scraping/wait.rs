//! Bounded polling, the one suspension primitive every DOM wait goes through.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::core::error::{Result, ScrapeError};

/// Poll `check` every `interval` until it yields `Some`, or fail with
/// [`ScrapeError::Timeout`] once `timeout` has elapsed.
///
/// The check always runs at least once, and once more at the deadline, so a
/// zero timeout is a single check.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    let deadline = start + timeout;
    loop {
        if let Some(value) = check().await {
            debug!("wait: {} ready after {}ms", what, start.elapsed().as_millis());
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("wait: {} timed out after {}ms", what, timeout.as_millis());
            return Err(ScrapeError::Timeout {
                what: what.to_string(),
                after: timeout,
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
