//! AliExpress Product Scraper
//!
//! This crate scrapes AliExpress product pages into structured JSON and
//! provides a concurrent batch engine for scraping many products at once
//! with retries, per-item timeouts, cancellation, and progress reporting.

// Module declarations
pub mod batch;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

// Re-export the public surface for easier access
pub use batch::{
    run_batch, AttemptContext, BatchError, BatchOptions, BatchReport, BatchSummary, ItemResult,
    ProgressEvent, SerializedError,
};
pub use domain::{
    ProductData, ProductField, ProductId, ProductScraper, ScrapeError, ScrapeOptions,
};
pub use infrastructure::{AliexpressScraper, AppConfig, HttpClient, HttpClientConfig};

/// Scrape a single product by id or URL.
///
/// Builds a default scraper, resolves the input to a product id, and runs
/// one attempt without retries or a timeout.
pub async fn scrape_one(input: &str, options: ScrapeOptions) -> Result<ProductData, ScrapeError> {
    let product_id = ProductId::parse(input)?;
    let scraper = AliexpressScraper::with_defaults()
        .map_err(|error| ScrapeError::Initialization(error.to_string()))?;

    let ctx = AttemptContext::new(1, Arc::new(options), CancellationToken::new());
    scraper.scrape(&product_id, &ctx).await
}

/// Scrape a batch of products by id or URL.
///
/// Every input is resolved and scraped through the batch engine; the report
/// carries one entry per input, in input order, successes and failures alike.
pub async fn scrape_many(
    inputs: Vec<String>,
    options: BatchOptions<String>,
) -> Result<BatchReport<String, ProductData>, BatchError> {
    let scraper = AliexpressScraper::with_defaults()
        .map_err(|error| BatchError::Internal(format!("failed to build scraper: {error}")))?;

    scrape_many_with(Arc::new(scraper), inputs, options).await
}

/// Scrape a batch of products through a caller-supplied scraper.
///
/// This is the seam the tests use to drive the batch engine without network
/// access; `scrape_many` delegates here with the default scraper.
pub async fn scrape_many_with(
    scraper: Arc<dyn ProductScraper>,
    inputs: Vec<String>,
    options: BatchOptions<String>,
) -> Result<BatchReport<String, ProductData>, BatchError> {
    run_batch(inputs, options, move |input, ctx| {
        let scraper = Arc::clone(&scraper);
        async move {
            let product_id = ProductId::parse(&input)?;
            scraper.scrape(&product_id, &ctx).await
        }
    })
    .await
}
