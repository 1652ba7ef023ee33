//! Live smoke test against aliexpress.com
//!
//! Opt-in because it performs real network requests: does nothing unless
//! ALIX_SMOKE=1 is set. Verifies that a known product page still yields the
//! expected top level fields. Override the target with ALIX_PRODUCT_ID.

use anyhow::{Result, bail};

use aliexpress_scraper::domain::ScrapeOptions;
use aliexpress_scraper::scrape_one;

const DEFAULT_PRODUCT_ID: &str = "1005007429636284";

const REQUIRED_KEYS: [&str; 6] = [
    "title",
    "productId",
    "images",
    "reviews",
    "variants",
    "shipping",
];

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("ALIX_SMOKE").as_deref() != Ok("1") {
        println!("Set ALIX_SMOKE=1 to run the smoke test.");
        return Ok(());
    }

    let _ = aliexpress_scraper::infrastructure::logging::init_logging();

    let product_id =
        std::env::var("ALIX_PRODUCT_ID").unwrap_or_else(|_| DEFAULT_PRODUCT_ID.to_string());

    let options = ScrapeOptions::default()
        .with_reviews_count(5)
        .with_review_filter("all");

    let product = scrape_one(&product_id, options).await?;
    let value = product.to_json(None)?;

    let Some(object) = value.as_object() else {
        bail!("Scrape result is not a JSON object");
    };

    for key in REQUIRED_KEYS {
        match object.get(key) {
            None => bail!("Missing required key: {key}"),
            Some(serde_json::Value::Null) => bail!("Required key is null: {key}"),
            Some(_) => {}
        }
    }

    // Description may legitimately be null, but the key must exist.
    if !object.contains_key("description") {
        bail!("Missing key: description");
    }

    let image_count = object["images"].as_array().map_or(0, Vec::len);
    if image_count == 0 {
        bail!("Expected at least one product image");
    }

    let scraped_id = match &object["productId"] {
        serde_json::Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    println!(
        "Smoke OK: {} ({scraped_id})",
        object["title"].as_str().unwrap_or("?")
    );
    Ok(())
}
