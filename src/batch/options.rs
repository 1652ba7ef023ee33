//! # Batch Options
//!
//! Tuning knobs for a batch run plus fail-fast validation. Validation
//! messages mirror the wire-facing texts consumers already match on.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::batch::types::{ProgressCallback, ProgressEvent};
use crate::domain::services::ScrapeOptions;

/// Default worker cap when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 3;
/// Default per-item retry budget.
pub const DEFAULT_RETRIES: u32 = 1;
/// Default per-item timeout.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Errors that fail the whole batch call.
///
/// Item-level failures never surface here; they are serialized into the
/// report instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchError {
    /// Options or inputs rejected before any worker started.
    #[error("{0}")]
    InvalidOptions(String),

    /// Pool machinery fault: worker panic, poisoned state, missing slot.
    #[error("Batch engine internal error: {0}")]
    Internal(String),
}

/// Options controlling a batch run.
#[derive(Clone)]
pub struct BatchOptions<I> {
    /// Worker cap, `>= 1`. The pool spawns `min(concurrency, inputs.len())`.
    pub concurrency: usize,
    /// Extra attempts after the first failure. `0` disables retrying.
    pub retries: u32,
    /// Per-attempt deadline. `None` disables the timeout entirely.
    pub item_timeout: Option<Duration>,
    /// Per-item completion callback.
    pub on_progress: Option<ProgressCallback<I>>,
    /// Pass-through options handed to every attempt unchanged.
    pub scrape: ScrapeOptions,
    /// External whole-batch cancellation. Once fired, in-flight attempts are
    /// cut short and the remaining items drain as `BATCH_CANCELLED` failures.
    pub cancellation: Option<CancellationToken>,
}

impl<I> Default for BatchOptions<I> {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
            item_timeout: Some(DEFAULT_ITEM_TIMEOUT),
            on_progress: None,
            scrape: ScrapeOptions::default(),
            cancellation: None,
        }
    }
}

impl<I> fmt::Debug for BatchOptions<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("concurrency", &self.concurrency)
            .field("retries", &self.retries)
            .field("item_timeout", &self.item_timeout)
            .field("on_progress", &self.on_progress.is_some())
            .field("scrape", &self.scrape)
            .field("cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl<I> BatchOptions<I> {
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_item_timeout(mut self, item_timeout: Option<Duration>) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    /// Installs a progress callback.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent<I>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn with_scrape_options(mut self, scrape: ScrapeOptions) -> Self {
        self.scrape = scrape;
        self
    }

    /// Attaches an external cancellation token for the whole batch.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fail-fast validation, run before any worker spawns.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.concurrency == 0 {
            return Err(BatchError::InvalidOptions(
                "`concurrency` must be an integer >= 1".to_string(),
            ));
        }

        if let Some(item_timeout) = self.item_timeout {
            if item_timeout.is_zero() {
                return Err(BatchError::InvalidOptions(
                    "`itemTimeout` must be a positive number when provided".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let options: BatchOptions<String> = BatchOptions::default();
        assert_eq!(options.concurrency, 3);
        assert_eq!(options.retries, 1);
        assert_eq!(options.item_timeout, Some(Duration::from_millis(120_000)));
        assert!(options.on_progress.is_none());
        assert!(options.cancellation.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected_with_the_original_message() {
        let options: BatchOptions<String> = BatchOptions::default().with_concurrency(0);
        let error = options.validate().expect_err("must fail");
        assert_eq!(error.to_string(), "`concurrency` must be an integer >= 1");
    }

    #[test]
    fn zero_timeout_is_rejected_but_none_disables_it() {
        let zero: BatchOptions<String> =
            BatchOptions::default().with_item_timeout(Some(Duration::ZERO));
        let error = zero.validate().expect_err("must fail");
        assert_eq!(
            error.to_string(),
            "`itemTimeout` must be a positive number when provided"
        );

        let disabled: BatchOptions<String> = BatchOptions::default().with_item_timeout(None);
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn builder_installs_progress_callback() {
        let options: BatchOptions<String> =
            BatchOptions::default().with_progress(|_event| Ok(()));
        assert!(options.on_progress.is_some());
        let rendered = format!("{options:?}");
        assert!(rendered.contains("on_progress: true"));
    }
}
