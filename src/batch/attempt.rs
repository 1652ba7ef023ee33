//! # Timeout-Guarded Attempt Runner
//!
//! Runs a single attempt of a batch task under an optional deadline.
//! Every attempt gets a fresh `CancellationToken`, a child of the batch
//! token, so a whole-batch cancel fans out to all in-flight work while a
//! per-item timeout only cancels its own attempt. When the deadline
//! elapses the raced task future is dropped, so a late completion can
//! never override the timeout failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::services::{ScrapeError, ScrapeOptions};

/// Context handed to every attempt of a batch task.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    /// 1-based attempt number within the item's retry budget.
    pub attempt: u32,
    /// Pass-through options shared by the whole batch.
    pub options: Arc<ScrapeOptions>,
    /// Cancellation scope of this attempt. Fires on per-item timeout and on
    /// whole-batch cancel; tasks observe it best-effort.
    pub cancellation: CancellationToken,
}

impl AttemptContext {
    /// Builds a standalone context, useful outside the engine (single scrapes).
    #[must_use]
    pub fn new(attempt: u32, options: Arc<ScrapeOptions>, cancellation: CancellationToken) -> Self {
        Self {
            attempt,
            options,
            cancellation,
        }
    }
}

/// Runs one attempt of `task` against `input`.
///
/// `input_label` is the display form of the input used in timeout messages.
pub(crate) async fn run_attempt<I, T, F, Fut>(
    task: &F,
    input: I,
    input_label: &str,
    attempt: u32,
    options: Arc<ScrapeOptions>,
    item_timeout: Option<Duration>,
    batch_token: &CancellationToken,
) -> Result<T, ScrapeError>
where
    F: Fn(I, AttemptContext) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let attempt_token = batch_token.child_token();
    let ctx = AttemptContext::new(attempt, options, attempt_token.clone());

    let run = task(input, ctx);
    tokio::pin!(run);

    match item_timeout {
        Some(limit) => {
            tokio::select! {
                outcome = &mut run => outcome,
                () = batch_token.cancelled() => {
                    tracing::debug!("🛑 Attempt {attempt} for \"{input_label}\" cut short by batch cancel");
                    Err(ScrapeError::BatchCancelled)
                }
                () = tokio::time::sleep(limit) => {
                    attempt_token.cancel();
                    tracing::debug!("🛑 Attempt {attempt} for \"{input_label}\" timed out after {limit:?}");
                    Err(ScrapeError::ItemTimeout {
                        input: input_label.to_string(),
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        attempt,
                    })
                }
            }
        }
        None => {
            tokio::select! {
                outcome = &mut run => outcome,
                () = batch_token.cancelled() => {
                    tracing::debug!("🛑 Attempt {attempt} for \"{input_label}\" cut short by batch cancel");
                    Err(ScrapeError::BatchCancelled)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn test_options() -> Arc<ScrapeOptions> {
        Arc::new(ScrapeOptions::default())
    }

    #[tokio::test]
    async fn fast_task_completes_before_the_deadline() {
        let token = CancellationToken::new();
        let outcome = run_attempt(
            &|input: String, _ctx| async move { Ok::<_, ScrapeError>(input.to_uppercase()) },
            "abc".to_string(),
            "abc",
            1,
            test_options(),
            Some(Duration::from_millis(200)),
            &token,
        )
        .await;
        assert_eq!(outcome.expect("task result"), "ABC");
    }

    #[tokio::test]
    async fn slow_task_fails_with_an_item_timeout() {
        let token = CancellationToken::new();
        let outcome: Result<(), _> = run_attempt(
            &|_input: String, _ctx| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            "item-9".to_string(),
            "item-9",
            2,
            test_options(),
            Some(Duration::from_millis(20)),
            &token,
        )
        .await;

        let error = outcome.expect_err("must time out");
        assert_eq!(error.code(), Some("ITEM_TIMEOUT"));
        assert_eq!(
            error.to_string(),
            "scrape_many timeout for input \"item-9\" after 20ms (attempt 2)"
        );
    }

    #[tokio::test]
    async fn timeout_cancels_the_attempt_token_for_side_work() {
        let token = CancellationToken::new();
        let observed = Arc::new(AtomicBool::new(false));
        let observed_in_task = Arc::clone(&observed);

        let outcome: Result<(), _> = run_attempt(
            &move |_input: String, ctx: AttemptContext| {
                let observed = Arc::clone(&observed_in_task);
                async move {
                    let side_token = ctx.cancellation.clone();
                    tokio::spawn(async move {
                        side_token.cancelled().await;
                        observed.store(true, Ordering::SeqCst);
                    });
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            },
            "item-1".to_string(),
            "item-1",
            1,
            test_options(),
            Some(Duration::from_millis(20)),
            &token,
        )
        .await;

        assert!(outcome.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(observed.load(Ordering::SeqCst), "spawned side-work must see the cancel");
    }

    #[tokio::test]
    async fn no_timeout_lets_slow_tasks_finish() {
        let token = CancellationToken::new();
        let outcome = run_attempt(
            &|input: String, _ctx| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok::<_, ScrapeError>(input)
            },
            "slow".to_string(),
            "slow",
            1,
            test_options(),
            None,
            &token,
        )
        .await;
        assert_eq!(outcome.expect("task result"), "slow");
    }

    #[tokio::test]
    async fn batch_cancel_interrupts_a_running_attempt() {
        let token = CancellationToken::new();
        let cancel_handle = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel_handle.cancel();
        });

        let outcome: Result<(), _> = run_attempt(
            &|_input: String, _ctx| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            "item-1".to_string(),
            "item-1",
            1,
            test_options(),
            Some(Duration::from_secs(10)),
            &token,
        )
        .await;

        let error = outcome.expect_err("must be cancelled");
        assert_eq!(error.code(), Some("BATCH_CANCELLED"));
    }
}
