//! Caller-side retry for transient extraction failures.
//!
//! Session-level failures such as a navigation error or a timeout may clear
//! up on a second attempt with a fresh browser. Routing failures, launch
//! failures and persistence failures are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::{PipelineError, SessionError};

fn is_retriable(err: &PipelineError) -> bool {
    matches!(
        err,
        PipelineError::Extraction(e) if matches!(
            e.source,
            SessionError::Navigation { .. }
                | SessionError::Content { .. }
                | SessionError::Timeout { .. }
        )
    )
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// After a retriable failure the call sleeps `backoff_base_secs * 2^attempt`
/// seconds before the next attempt. With `max_retries = 2` the operation runs
/// at most three times. `max_retries = 0` disables retrying.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient scrape failure, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
