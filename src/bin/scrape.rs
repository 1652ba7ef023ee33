//! Command line product scraper
//!
//! Scrapes one AliExpress product (by id or URL) and prints the result as
//! pretty JSON. Configuration comes from the user config file, overridable
//! through ALIX_* environment variables:
//! - ALIX_CONFIG: path to an alternative config file
//! - ALIX_FIELDS: comma separated field projection (e.g. "title,salePrice")
//! - ALIX_OUTPUT_DIR: also write the result to <dir>/<productId>.json

use anyhow::{Context, Result, bail};
use tracing::info;

use aliexpress_scraper::domain::{ProductField, ProductId};
use aliexpress_scraper::infrastructure::{AppConfig, ConfigManager, init_logging_with_config};
use aliexpress_scraper::scrape_one;

#[tokio::main]
async fn main() -> Result<()> {
    let Some(input) = std::env::args().nth(1) else {
        bail!("Usage: scrape <product-id-or-url>");
    };

    let config = match std::env::var("ALIX_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        Err(_) => ConfigManager::new()?.initialize_on_first_run().await?,
    };
    init_logging_with_config(config.logging.clone())?;

    let fields = match std::env::var("ALIX_FIELDS") {
        Ok(raw) => {
            let names: Vec<&str> = raw.split(',').collect();
            Some(ProductField::parse_list(&names)?)
        }
        Err(_) => None,
    };

    let mut options = config.scrape_options();
    if let Some(fields) = fields.clone() {
        options = options.with_fields(fields);
    }

    let product_id = ProductId::parse(&input)?;
    info!("🔍 Scraping product {product_id}");

    let product = scrape_one(product_id.as_str(), options).await?;
    let value = product.to_json(fields.as_deref())?;
    let rendered = serde_json::to_string_pretty(&value)?;
    println!("{rendered}");

    if let Ok(output_dir) = std::env::var("ALIX_OUTPUT_DIR") {
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create output directory {output_dir}"))?;
        let path = std::path::Path::new(&output_dir).join(format!("{product_id}.json"));
        tokio::fs::write(&path, &rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("✅ Saved result to {:?}", path);
    }

    Ok(())
}
