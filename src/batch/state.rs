//! # Shared Batch State
//!
//! The coordination core of the worker pool: an atomic index cursor for
//! exclusive item claims plus one mutex guarding results and counters.
//! Completion recording and progress emission happen under the same
//! critical section, which is what makes `completed` strictly increasing
//! across concurrent workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::batch::options::BatchError;
use crate::batch::types::{CurrentItem, ItemResult, ProgressCallback, ProgressEvent};

pub(crate) struct BatchState<I, T> {
    total: usize,
    cursor: AtomicUsize,
    cancellation: CancellationToken,
    on_progress: Option<ProgressCallback<I>>,
    inner: Mutex<StateInner<I, T>>,
}

struct StateInner<I, T> {
    results: Vec<Option<ItemResult<I, T>>>,
    completed: usize,
    succeeded: usize,
    failed: usize,
    callback_errors: usize,
}

/// Counter totals extracted from a finished batch.
#[derive(Debug)]
pub(crate) struct BatchTotals {
    pub succeeded: usize,
    pub failed: usize,
    pub callback_errors: usize,
}

impl<I: Clone, T> BatchState<I, T> {
    pub(crate) fn new(
        total: usize,
        cancellation: CancellationToken,
        on_progress: Option<ProgressCallback<I>>,
    ) -> Self {
        let mut results = Vec::with_capacity(total);
        results.resize_with(total, || None);

        Self {
            total,
            cursor: AtomicUsize::new(0),
            cancellation,
            on_progress,
            inner: Mutex::new(StateInner {
                results,
                completed: 0,
                succeeded: 0,
                failed: 0,
                callback_errors: 0,
            }),
        }
    }

    /// Claims the next unprocessed index, or `None` when the batch is drained.
    /// `fetch_add` makes every claim exclusive across worker threads.
    pub(crate) fn claim(&self) -> Option<usize> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        (index < self.total).then_some(index)
    }

    pub(crate) const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Records one finished item and emits its progress event.
    pub(crate) fn record(&self, result: ItemResult<I, T>) -> Result<(), BatchError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| BatchError::Internal("batch state mutex poisoned".to_string()))?;

        let index = result.index;
        if index >= self.total {
            return Err(BatchError::Internal(format!(
                "result index {index} out of bounds for {} items",
                self.total
            )));
        }
        if inner.results[index].is_some() {
            return Err(BatchError::Internal(format!(
                "duplicate result recorded for index {index}"
            )));
        }

        inner.completed += 1;
        if result.success {
            inner.succeeded += 1;
        } else {
            inner.failed += 1;
        }

        let event = ProgressEvent {
            completed: inner.completed,
            total: self.total,
            succeeded: inner.succeeded,
            failed: inner.failed,
            current: CurrentItem {
                index,
                input: result.input.clone(),
                success: result.success,
            },
        };
        inner.results[index] = Some(result);

        if let Some(callback) = &self.on_progress {
            if let Err(error) = callback(&event) {
                inner.callback_errors += 1;
                tracing::warn!("⚠️ Progress callback failed: {error:#}");
            }
        }

        Ok(())
    }

    /// Tears the state down into the ordered results and final counters.
    /// Fails if any slot was never filled, which would mean a worker bug.
    pub(crate) fn into_outcome(self) -> Result<(Vec<ItemResult<I, T>>, BatchTotals), BatchError> {
        let inner = self
            .inner
            .into_inner()
            .map_err(|_| BatchError::Internal("batch state mutex poisoned".to_string()))?;

        let mut items = Vec::with_capacity(self.total);
        for (index, slot) in inner.results.into_iter().enumerate() {
            match slot {
                Some(result) => items.push(result),
                None => {
                    return Err(BatchError::Internal(format!(
                        "missing result for index {index}"
                    )));
                }
            }
        }

        Ok((
            items,
            BatchTotals {
                succeeded: inner.succeeded,
                failed: inner.failed,
                callback_errors: inner.callback_errors,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn state_of(total: usize) -> BatchState<String, u32> {
        BatchState::new(total, CancellationToken::new(), None)
    }

    #[test]
    fn claims_are_unique_and_bounded() {
        let state = state_of(5);
        let mut seen = HashSet::new();
        while let Some(index) = state.claim() {
            assert!(seen.insert(index), "index {index} claimed twice");
        }
        assert_eq!(seen.len(), 5);
        assert!(state.claim().is_none());
    }

    #[test]
    fn record_updates_counters_and_outcome_orders_items() {
        let state = state_of(3);
        state
            .record(ItemResult::success(2, "c".to_string(), 3, 1, 5))
            .expect("record");
        state
            .record(ItemResult::failure(
                0,
                "a".to_string(),
                crate::batch::types::SerializedError::new("Network", "boom"),
                2,
                9,
            ))
            .expect("record");
        state
            .record(ItemResult::success(1, "b".to_string(), 2, 1, 4))
            .expect("record");

        let (items, totals) = state.into_outcome().expect("outcome");
        assert_eq!(totals.succeeded, 2);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.callback_errors, 0);
        let inputs: Vec<_> = items.iter().map(|item| item.input.as_str()).collect();
        assert_eq!(inputs, ["a", "b", "c"]);
    }

    #[test]
    fn duplicate_record_is_an_internal_error() {
        let state = state_of(1);
        state
            .record(ItemResult::success(0, "a".to_string(), 1, 1, 1))
            .expect("first record");
        let error = state
            .record(ItemResult::success(0, "a".to_string(), 1, 1, 1))
            .expect_err("second record must fail");
        assert!(matches!(error, BatchError::Internal(_)));
    }

    #[test]
    fn missing_slot_fails_the_outcome() {
        let state = state_of(2);
        state
            .record(ItemResult::success(0, "a".to_string(), 1, 1, 1))
            .expect("record");
        let error = state.into_outcome().expect_err("must fail");
        assert!(matches!(error, BatchError::Internal(_)));
    }

    #[test]
    fn progress_events_are_strictly_increasing() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = std::sync::Arc::clone(&seen);
        let state: BatchState<String, u32> = BatchState::new(
            3,
            CancellationToken::new(),
            Some(std::sync::Arc::new(move |event: &ProgressEvent<String>| {
                seen_in_callback
                    .lock()
                    .expect("test lock")
                    .push(event.completed);
                Ok(())
            })),
        );

        for index in [1, 0, 2] {
            state
                .record(ItemResult::success(index, format!("i{index}"), 0, 1, 1))
                .expect("record");
        }

        assert_eq!(*seen.lock().expect("test lock"), vec![1, 2, 3]);
    }

    #[test]
    fn callback_errors_are_counted_not_fatal() {
        let state: BatchState<String, u32> = BatchState::new(
            2,
            CancellationToken::new(),
            Some(std::sync::Arc::new(|_event: &ProgressEvent<String>| {
                anyhow::bail!("observer crashed")
            })),
        );

        state
            .record(ItemResult::success(0, "a".to_string(), 1, 1, 1))
            .expect("record");
        state
            .record(ItemResult::success(1, "b".to_string(), 2, 1, 1))
            .expect("record");

        let (_items, totals) = state.into_outcome().expect("outcome");
        assert_eq!(totals.callback_errors, 2);
    }
}
