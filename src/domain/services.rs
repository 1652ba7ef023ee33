//! # Scrape Service Contracts
//!
//! The failure taxonomy and pass-through options shared by the batch engine
//! and the live scraper, plus the injectable single-item scrape capability.
//! The engine only ever sees these contracts; swapping the site behind
//! `ProductScraper` never touches batch code.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::batch::attempt::AttemptContext;
use crate::domain::input::ProductId;
use crate::domain::product::{ProductData, ProductField};

/// Default number of reviews fetched per product.
pub const DEFAULT_REVIEWS_COUNT: u32 = 10;

/// Per-item failure taxonomy.
///
/// Cloneable and serializable so item failures can be recorded in batch
/// reports and shipped across process boundaries as plain data.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapeError {
    /// The caller-supplied id or URL is not a recognizable product reference.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {url}")]
    Http { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// An attempt ran past its wall-clock limit and was cancelled.
    #[error("scrape_many timeout for input \"{input}\" after {timeout_ms}ms (attempt {attempt})")]
    ItemTimeout {
        input: String,
        timeout_ms: u64,
        attempt: u32,
    },

    /// The whole-batch token fired before this item could finish.
    #[error("Batch cancelled before item completed")]
    BatchCancelled,

    /// A single operation was cancelled through its own token.
    #[error("Operation cancelled")]
    Cancelled,

    /// The site answered with a captcha or login interstitial. Reported as-is.
    #[error("Blocked by anti-bot protection: {0}")]
    Blocked(String),

    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl ScrapeError {
    /// Stable error kind name used in serialized item failures.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::Network(_) => "Network",
            Self::Http { .. } => "Http",
            Self::Parse(_) => "Parse",
            Self::ItemTimeout { .. } => "ItemTimeout",
            Self::BatchCancelled => "BatchCancelled",
            Self::Cancelled => "Cancelled",
            Self::Blocked(_) => "Blocked",
            Self::Initialization(_) => "Initialization",
        }
    }

    /// Machine-readable code carried on the wire, when the variant has one.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidInput(_) => Some("INVALID_INPUT"),
            Self::Http { .. } => Some("HTTP_STATUS"),
            Self::ItemTimeout { .. } => Some("ITEM_TIMEOUT"),
            Self::BatchCancelled => Some("BATCH_CANCELLED"),
            Self::Cancelled => Some("CANCELLED"),
            Self::Blocked(_) => Some("BLOCKED"),
            Self::Network(_) | Self::Parse(_) | Self::Initialization(_) => None,
        }
    }
}

/// Pass-through scrape configuration forwarded verbatim to every attempt.
///
/// Unknown knobs survive in `extras` so callers can thread site-specific
/// settings through the engine without the engine learning about them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeOptions {
    /// How many reviews to collect. The feedback endpoint serves pages of 20.
    pub reviews_count: u32,
    /// Review filter forwarded to the feedback endpoint (`"all"`, star buckets).
    pub filter_reviews_by: String,
    /// Skip the slow extras (description page, review pages) entirely.
    pub fast_mode: bool,
    /// Projection of the product JSON. `None` keeps every supported field.
    pub fields: Option<Vec<ProductField>>,
    /// Open-ended pass-through options, kept flat on the wire.
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            reviews_count: DEFAULT_REVIEWS_COUNT,
            filter_reviews_by: "all".to_string(),
            fast_mode: false,
            fields: None,
            extras: HashMap::new(),
        }
    }
}

impl ScrapeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reviews_count(mut self, count: u32) -> Self {
        self.reviews_count = count;
        self
    }

    #[must_use]
    pub fn with_review_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_reviews_by = filter.into();
        self
    }

    #[must_use]
    pub const fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<ProductField>) -> Self {
        self.fields = Some(fields);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Whether `field` should be fetched under the current options.
    ///
    /// Fast mode drops the expensive fields (description, reviews) even when
    /// an explicit field list asks for them.
    #[must_use]
    pub fn wants(&self, field: ProductField) -> bool {
        if self.fast_mode
            && matches!(field, ProductField::Description | ProductField::Reviews)
        {
            return false;
        }
        match &self.fields {
            Some(fields) => fields.contains(&field),
            None => true,
        }
    }
}

/// The single-item scrape, modeled as an injectable capability.
///
/// Implementations observe `ctx.cancellation` on a best-effort basis so
/// timeouts and batch-level cancellation can cut outstanding I/O short.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    /// Scrapes one product and returns its normalized data.
    async fn scrape(
        &self,
        product_id: &ProductId,
        ctx: &AttemptContext,
    ) -> Result<ProductData, ScrapeError>;
}
