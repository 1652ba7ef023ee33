//! # Domain
//!
//! Site-independent business types: validated product inputs, the public
//! product schema, and the scrape contracts the batch engine runs against.

pub mod input;
pub mod product;
pub mod services;

// Re-export commonly used items for convenience
pub use input::ProductId;
pub use product::{PriceRange, ProductData, ProductField, Quantity, Ratings, StoreInfo};
pub use services::{ProductScraper, ScrapeError, ScrapeOptions, DEFAULT_REVIEWS_COUNT};
