//! # Batch Result Types
//!
//! Wire-stable result and progress types for the batch execution engine.
//! Serialized field names are camelCase (`durationMs`,
//! `progressCallbackErrors`); existing JSON consumers match on these keys,
//! so they must not change.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::domain::services::ScrapeError;

/// Fallible per-item progress callback.
///
/// Invoked exactly once per completed item while the batch state lock is
/// held, so calls never overlap and `completed` is strictly increasing.
/// An `Err` is counted into `progress_callback_errors` and never aborts
/// the batch.
pub type ProgressCallback<I> =
    Arc<dyn Fn(&ProgressEvent<I>) -> anyhow::Result<()> + Send + Sync>;

/// Plain-data snapshot of a task error, safe to store and serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    /// Error kind name (the `ScrapeError` variant for engine-produced errors).
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Stable machine code, e.g. `ITEM_TIMEOUT`. Serialized as `null` when absent.
    pub code: Option<String>,
}

impl SerializedError {
    /// Creates a serialized error without a machine code.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Attaches a stable machine code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<&ScrapeError> for SerializedError {
    fn from(error: &ScrapeError) -> Self {
        Self {
            name: error.name().to_string(),
            message: error.to_string(),
            code: error.code().map(str::to_string),
        }
    }
}

/// Outcome of one batch item, success or failure.
///
/// Exactly one of `data` / `error` is populated; the constructors enforce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult<I, T> {
    /// Position of the item in the submitted inputs.
    pub index: usize,
    /// The original input, echoed back untouched.
    pub input: I,
    pub success: bool,
    /// Attempts actually spent on this item (`<= retries + 1`).
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl<I, T> ItemResult<I, T> {
    /// Creates a successful item result.
    #[must_use]
    pub fn success(index: usize, input: I, data: T, attempts: u32, duration_ms: u64) -> Self {
        Self {
            index,
            input,
            success: true,
            attempts,
            duration_ms,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed item result carrying the serialized last error.
    #[must_use]
    pub fn failure(
        index: usize,
        input: I,
        error: SerializedError,
        attempts: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            index,
            input,
            success: false,
            attempts,
            duration_ms,
            data: None,
            error: Some(error),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }
}

/// The item a progress event refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentItem<I> {
    pub index: usize,
    pub input: I,
    pub success: bool,
}

/// Progress notification emitted once per completed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent<I> {
    /// Completed item count so far, strictly increasing up to `total`.
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub current: CurrentItem<I>,
}

/// Aggregate batch counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub progress_callback_errors: usize,
    pub duration_ms: u64,
}

/// Full batch outcome: per-item results in input order plus the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport<I, T> {
    /// `items[i]` corresponds to `inputs[i]`, every slot populated.
    pub items: Vec<ItemResult<I, T>>,
    pub summary: BatchSummary,
}

impl<I, T> BatchReport<I, T> {
    /// Iterates over the successfully scraped payloads in input order.
    pub fn succeeded_data(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| item.data.as_ref())
    }
}

/// Milliseconds elapsed since `started`, saturating instead of wrapping.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_item_serializes_without_error_key() {
        let item = ItemResult::success(0, "item-1".to_string(), json!({"id": 1}), 1, 12);
        let value = serde_json::to_value(&item).expect("serialize");
        assert_eq!(
            value,
            json!({
                "index": 0,
                "input": "item-1",
                "success": true,
                "attempts": 1,
                "durationMs": 12,
                "data": {"id": 1},
            })
        );
    }

    #[test]
    fn failure_item_serializes_code_as_null_when_absent() {
        let error = SerializedError::new("Network", "connection reset");
        let item: ItemResult<String, serde_json::Value> =
            ItemResult::failure(3, "item-4".to_string(), error, 2, 40);
        let value = serde_json::to_value(&item).expect("serialize");
        assert_eq!(value["error"], json!({"name": "Network", "message": "connection reset", "code": null}));
        assert!(value.get("data").is_none());
    }

    #[test]
    fn summary_uses_camel_case_wire_names() {
        let summary = BatchSummary {
            total: 5,
            succeeded: 4,
            failed: 1,
            progress_callback_errors: 2,
            duration_ms: 321,
        };
        let value = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(
            value,
            json!({
                "total": 5,
                "succeeded": 4,
                "failed": 1,
                "progressCallbackErrors": 2,
                "durationMs": 321,
            })
        );
    }

    #[test]
    fn serialized_error_carries_scrape_error_code() {
        let error = ScrapeError::ItemTimeout {
            input: "123".to_string(),
            timeout_ms: 50,
            attempt: 2,
        };
        let serialized = SerializedError::from(&error);
        assert_eq!(serialized.name, "ItemTimeout");
        assert_eq!(serialized.code.as_deref(), Some("ITEM_TIMEOUT"));
        assert!(serialized.message.contains("after 50ms (attempt 2)"));
    }
}
