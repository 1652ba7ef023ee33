//! # Batch Orchestrator
//!
//! `run_batch` is the engine entry point: validate, spawn a bounded worker
//! pool over a shared claim cursor, join every worker, assemble the report.
//! Item failures land in the report; only validation problems and pool
//! machinery faults fail the call itself.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::batch::attempt::AttemptContext;
use crate::batch::options::{BatchError, BatchOptions};
use crate::batch::retry::run_item;
use crate::batch::state::BatchState;
use crate::batch::types::{elapsed_ms, BatchReport, BatchSummary};
use crate::domain::services::{ScrapeError, ScrapeOptions};

/// Runs `task` over every input under the configured concurrency cap.
///
/// Results come back in input order regardless of completion order. The
/// returned report is fully populated: `succeeded + failed == total`.
pub async fn run_batch<I, T, F, Fut>(
    inputs: Vec<I>,
    options: BatchOptions<I>,
    task: F,
) -> Result<BatchReport<I, T>, BatchError>
where
    I: Clone + Display + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(I, AttemptContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ScrapeError>> + Send + 'static,
{
    options.validate()?;
    if inputs.is_empty() {
        return Err(BatchError::InvalidOptions(
            "Please provide a non-empty array of product ids or URLs".to_string(),
        ));
    }

    let BatchOptions {
        concurrency,
        retries,
        item_timeout,
        on_progress,
        scrape,
        cancellation,
    } = options;

    let started = Instant::now();
    let total = inputs.len();
    let batch_id = Uuid::new_v4();
    let batch_token = cancellation.unwrap_or_default();
    let scrape_options = Arc::new(scrape);
    let state = Arc::new(BatchState::new(total, batch_token, on_progress));
    let inputs = Arc::new(inputs);
    let task = Arc::new(task);

    let worker_count = concurrency.min(total);
    tracing::info!(
        "🚀 Batch {batch_id} starting: {total} items, {worker_count} workers, retries={retries}, item_timeout={item_timeout:?}"
    );

    let mut worker_handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        worker_handles.push(tokio::spawn(run_worker(
            worker_id,
            Arc::clone(&state),
            Arc::clone(&inputs),
            Arc::clone(&task),
            Arc::clone(&scrape_options),
            retries,
            item_timeout,
        )));
    }

    let joined = futures::future::try_join_all(worker_handles)
        .await
        .map_err(|error| BatchError::Internal(format!("worker task panicked: {error}")))?;
    for outcome in joined {
        outcome?;
    }

    let state = Arc::try_unwrap(state)
        .map_err(|_| BatchError::Internal("batch state still shared after join".to_string()))?;
    let (items, totals) = state.into_outcome()?;

    let summary = BatchSummary {
        total,
        succeeded: totals.succeeded,
        failed: totals.failed,
        progress_callback_errors: totals.callback_errors,
        duration_ms: elapsed_ms(started),
    };
    tracing::info!(
        "✅ Batch {batch_id} finished: {}/{} succeeded, {} failed in {}ms",
        summary.succeeded,
        summary.total,
        summary.failed,
        summary.duration_ms
    );

    Ok(BatchReport { items, summary })
}

/// One symmetric pool worker: claim, run, record, repeat until drained.
async fn run_worker<I, T, F, Fut>(
    worker_id: usize,
    state: Arc<BatchState<I, T>>,
    inputs: Arc<Vec<I>>,
    task: Arc<F>,
    options: Arc<ScrapeOptions>,
    retries: u32,
    item_timeout: Option<Duration>,
) -> Result<(), BatchError>
where
    I: Clone + Display + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(I, AttemptContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ScrapeError>> + Send + 'static,
{
    tracing::debug!("👷 Worker {worker_id} started");

    while let Some(index) = state.claim() {
        let input = inputs[index].clone();
        let result = run_item(
            index,
            input,
            retries,
            item_timeout,
            Arc::clone(&options),
            state.cancellation(),
            task.as_ref(),
        )
        .await;
        state.record(result)?;
    }

    tracing::debug!("👷 Worker {worker_id} finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn small_batch_preserves_input_order() {
        let inputs: Vec<String> = (1..=5).map(|i| format!("item-{i}")).collect();
        let report = run_batch(
            inputs.clone(),
            BatchOptions::default().with_concurrency(2),
            |input: String, _ctx| async move { Ok::<_, ScrapeError>(input.to_uppercase()) },
        )
        .await
        .expect("batch must resolve");

        assert_eq!(report.summary.total, 5);
        assert_eq!(report.summary.succeeded, 5);
        for (index, item) in report.items.iter().enumerate() {
            assert_eq!(item.index, index);
            assert_eq!(item.input, inputs[index]);
            assert_eq!(item.data.as_deref(), Some(inputs[index].to_uppercase().as_str()));
        }
    }

    #[tokio::test]
    async fn empty_inputs_fail_before_any_work() {
        let error = run_batch(
            Vec::<String>::new(),
            BatchOptions::default(),
            |_input: String, _ctx| async move { Ok::<_, ScrapeError>(()) },
        )
        .await
        .expect_err("must fail");
        assert_eq!(
            error.to_string(),
            "Please provide a non-empty array of product ids or URLs"
        );
    }

    #[tokio::test]
    async fn single_input_spawns_a_degenerate_pool() {
        let report = run_batch(
            vec!["only".to_string()],
            BatchOptions::default().with_concurrency(50),
            |input: String, _ctx| async move { Ok::<_, ScrapeError>(input) },
        )
        .await
        .expect("batch must resolve");
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.summary.succeeded, 1);
    }
}
