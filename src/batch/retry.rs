//! # Per-Item Retry Controller
//!
//! Drives the attempts of a single batch item: sequential, each under its
//! own timeout guard, retried immediately on failure. No backoff or jitter
//! here; the immediate-retry contract is what distinguishes this engine
//! from a crawl scheduler.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::batch::attempt::{run_attempt, AttemptContext};
use crate::batch::types::{elapsed_ms, ItemResult, SerializedError};
use crate::domain::services::{ScrapeError, ScrapeOptions};

/// Runs one item to completion: up to `retries + 1` attempts, then a final
/// `ItemResult`. Failures are absorbed into the result, never propagated.
///
/// When the batch token fires between attempts, the remaining budget is
/// skipped and the item records a `BATCH_CANCELLED` failure; `attempts`
/// then reflects the attempts actually made (possibly zero).
pub(crate) async fn run_item<I, T, F, Fut>(
    index: usize,
    input: I,
    retries: u32,
    item_timeout: Option<Duration>,
    options: Arc<ScrapeOptions>,
    batch_token: &CancellationToken,
    task: &F,
) -> ItemResult<I, T>
where
    I: Clone + Display,
    F: Fn(I, AttemptContext) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let started = Instant::now();
    let label = input.to_string();
    let max_attempts = retries.saturating_add(1);

    let mut last_error: Option<ScrapeError> = None;
    let mut attempts_made = 0_u32;

    for attempt in 1..=max_attempts {
        if batch_token.is_cancelled() {
            last_error = Some(ScrapeError::BatchCancelled);
            break;
        }

        attempts_made = attempt;
        match run_attempt(
            task,
            input.clone(),
            &label,
            attempt,
            Arc::clone(&options),
            item_timeout,
            batch_token,
        )
        .await
        {
            Ok(data) => {
                return ItemResult::success(index, input, data, attempt, elapsed_ms(started));
            }
            Err(error) => {
                tracing::debug!(
                    "🔄 Attempt {attempt}/{max_attempts} failed for \"{label}\": {error}"
                );
                last_error = Some(error);
            }
        }
    }

    let error = last_error.unwrap_or(ScrapeError::BatchCancelled);
    ItemResult::failure(
        index,
        input,
        SerializedError::from(&error),
        attempts_made,
        elapsed_ms(started),
    )
}
