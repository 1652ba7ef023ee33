//! # Concurrent Batch Engine
//!
//! Generic machinery for running one scrape task over many inputs: a
//! bounded worker pool with a shared claim cursor, per-item retry and
//! timeout, order-preserving result collection and progress reporting.
//! The engine knows nothing about AliExpress; it runs any task shaped
//! as `Fn(I, AttemptContext) -> Future<Result<T, ScrapeError>>`.

pub mod attempt;
pub mod engine;
pub mod options;
pub mod retry;
pub mod state;
pub mod types;

// Re-export the surface callers actually touch.
pub use attempt::AttemptContext;
pub use engine::run_batch;
pub use options::{
    BatchError, BatchOptions, DEFAULT_CONCURRENCY, DEFAULT_ITEM_TIMEOUT, DEFAULT_RETRIES,
};
pub use types::{
    BatchReport, BatchSummary, CurrentItem, ItemResult, ProgressCallback, ProgressEvent,
    SerializedError,
};
