//! # AliExpress Scraper
//!
//! The live `ProductScraper` implementation. AliExpress product pages embed
//! their full render state as `window.runParams = {...}` inside a script tag;
//! we lift that object out, map its stable component fields into
//! `ProductData`, and leave the volatile subtrees raw. Descriptions and
//! reviews come from two follow-up requests, both skippable through
//! `ScrapeOptions`.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::batch::attempt::AttemptContext;
use crate::domain::input::ProductId;
use crate::domain::product::{PriceRange, ProductData, ProductField, Quantity, Ratings, StoreInfo};
use crate::domain::services::{ProductScraper, ScrapeError, ScrapeOptions};
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};

const FEEDBACK_ENDPOINT: &str = "https://feedback.aliexpress.com/pc/searchEvaluation.do";
const REVIEWS_PER_PAGE: u32 = 20;
const MAX_REVIEW_PAGES: u32 = 5;

// Strings that only appear on the anti-bot challenge interstitials.
const BLOCK_MARKERS: [&str; 3] = ["_____tmd_____", "x5sec", "captcha"];

static RUN_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.runParams\s*=\s*\{").unwrap());

/// Scrapes AliExpress product pages through a shared rate-limited client.
pub struct AliexpressScraper {
    http: Arc<HttpClient>,
}

impl AliexpressScraper {
    #[must_use]
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Builds a scraper over a default-configured HTTP client.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let http = HttpClient::new(HttpClientConfig::default())?;
        Ok(Self::new(Arc::new(http)))
    }

    async fn fetch_description(
        &self,
        description_url: &str,
        token: &CancellationToken,
    ) -> Result<String, ScrapeError> {
        self.http
            .get_text_with_cancellation(description_url, token)
            .await
    }

    async fn fetch_reviews(
        &self,
        product_id: &ProductId,
        options: &ScrapeOptions,
        token: &CancellationToken,
    ) -> Result<Vec<Value>, ScrapeError> {
        let mut reviews = Vec::new();
        let total_pages = reviews_page_count(options.reviews_count);

        for page in 1..=total_pages {
            let url = feedback_url(product_id, page, &options.filter_reviews_by)?;
            let body = self
                .http
                .get_text_with_cancellation(url.as_str(), token)
                .await?;
            let parsed: Value = serde_json::from_str(&body).map_err(|error| {
                ScrapeError::Parse(format!("invalid feedback response: {error}"))
            })?;

            let page_reviews = parsed
                .pointer("/data/evaViewList")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if page_reviews.is_empty() {
                break;
            }
            reviews.extend(page_reviews);
        }

        Ok(reviews)
    }
}

#[async_trait]
impl ProductScraper for AliexpressScraper {
    async fn scrape(
        &self,
        product_id: &ProductId,
        ctx: &AttemptContext,
    ) -> Result<ProductData, ScrapeError> {
        let url = product_page_url(product_id);
        tracing::info!("🔍 Scraping product {} (attempt {})", product_id, ctx.attempt);

        let html = self
            .http
            .get_text_with_cancellation(&url, &ctx.cancellation)
            .await?;

        let run_params = extract_run_params(&html)?;
        let data = run_params.get("data").cloned().ok_or_else(|| {
            ScrapeError::Parse("`runParams.data` missing from product page".to_string())
        })?;

        let mut product = map_product(&data);

        if ctx.options.wants(ProductField::Description) {
            if let Some(description_url) = str_at(&data, "/productDescComponent/descriptionUrl")
            {
                let description = self
                    .fetch_description(&description_url, &ctx.cancellation)
                    .await?;
                product.description = Some(description);
            }
        }

        if ctx.options.wants(ProductField::Reviews) && product.ratings.total_start_count > 0 {
            product.reviews = self
                .fetch_reviews(product_id, &ctx.options, &ctx.cancellation)
                .await?;
        }

        tracing::debug!(
            "Scraped product {}: {} images, {} reviews",
            product_id,
            product.images.len(),
            product.reviews.len()
        );
        Ok(product)
    }
}

fn product_page_url(product_id: &ProductId) -> String {
    format!("https://www.aliexpress.com/item/{product_id}.html")
}

fn feedback_url(
    product_id: &ProductId,
    page: u32,
    filter: &str,
) -> Result<Url, ScrapeError> {
    Url::parse_with_params(
        FEEDBACK_ENDPOINT,
        [
            ("productId", product_id.as_str()),
            ("page", page.to_string().as_str()),
            ("pageSize", REVIEWS_PER_PAGE.to_string().as_str()),
            ("filter", filter),
        ],
    )
    .map_err(|error| ScrapeError::Parse(format!("invalid feedback URL: {error}")))
}

/// Number of review pages to fetch for a requested review count.
fn reviews_page_count(reviews_count: u32) -> u32 {
    reviews_count.div_ceil(REVIEWS_PER_PAGE).min(MAX_REVIEW_PAGES)
}

/// Lifts the `window.runParams` object out of the page HTML.
///
/// Kept synchronous on purpose: `scraper::Html` is not `Send`, so it must
/// never live across an await point.
fn extract_run_params(html: &str) -> Result<Value, ScrapeError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").unwrap();

    for script in document.select(&selector) {
        let text: String = script.text().collect();
        let Some(found) = RUN_PARAMS.find(&text) else {
            continue;
        };

        // The match ends on the opening brace; scan to its balanced close.
        let start = found.end() - 1;
        let Some(object) = extract_json_object(&text[start..]) else {
            return Err(ScrapeError::Parse(
                "unterminated window.runParams object".to_string(),
            ));
        };
        return serde_json::from_str(object).map_err(|error| {
            ScrapeError::Parse(format!("window.runParams is not valid JSON: {error}"))
        });
    }

    if let Some(marker) = BLOCK_MARKERS.into_iter().find(|marker| html.contains(*marker)) {
        return Err(ScrapeError::Blocked(format!(
            "challenge marker \"{marker}\" present"
        )));
    }
    Err(ScrapeError::Parse(
        "window.runParams not found in page".to_string(),
    ))
}

/// Returns the balanced `{...}` prefix of `text`, honoring JSON strings and
/// escape sequences.
fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Maps the stable component fields of `runParams.data` into `ProductData`.
/// Everything volatile stays as raw JSON.
fn map_product(data: &Value) -> ProductData {
    ProductData {
        title: str_at(data, "/productInfoComponent/subject"),
        category_id: clone_at(data, "/productInfoComponent/categoryId"),
        product_id: clone_at(data, "/productInfoComponent/id"),
        quantity: Quantity {
            total: u64_at(data, "/inventoryComponent/totalQuantity"),
            available: u64_at(data, "/inventoryComponent/totalAvailQuantity"),
        },
        description: None,
        orders: string_or_number(data, "/tradeComponent/formatTradeCount", "0"),
        store_info: StoreInfo {
            name: str_at(data, "/sellerComponent/storeName"),
            logo: str_at(data, "/sellerComponent/storeLogo"),
            company_id: clone_at(data, "/sellerComponent/companyId"),
            store_number: clone_at(data, "/sellerComponent/storeNum"),
            is_top_rated: bool_at(data, "/sellerComponent/topRatedSeller"),
            has_pay_pal_account: bool_at(data, "/sellerComponent/payPalAccount"),
            rating_count: u64_at(data, "/storeFeedbackComponent/sellerPositiveNum"),
            rating: string_or_number(data, "/storeFeedbackComponent/sellerPositiveRate", "0"),
        },
        ratings: Ratings {
            total_star: 5,
            average_star: string_or_number(data, "/feedbackComponent/evarageStar", "0"),
            total_start_count: u64_at(data, "/feedbackComponent/totalValidNum"),
            five_star_count: u64_at(data, "/feedbackComponent/fiveStarNum"),
            four_star_count: u64_at(data, "/feedbackComponent/fourStarNum"),
            three_star_count: u64_at(data, "/feedbackComponent/threeStarNum"),
            two_star_count: u64_at(data, "/feedbackComponent/twoStarNum"),
            one_star_count: u64_at(data, "/feedbackComponent/oneStarNum"),
        },
        images: data
            .pointer("/imageComponent/imagePathList")
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        reviews: Vec::new(),
        variants: serde_json::json!({
            "options": clone_at(data, "/skuComponent/productSKUPropertyList")
                .unwrap_or_else(|| Value::Array(Vec::new())),
            "prices": clone_at(data, "/priceComponent/skuPriceList")
                .unwrap_or_else(|| Value::Array(Vec::new())),
        }),
        specs: clone_at(data, "/productPropComponent/props")
            .unwrap_or_else(|| Value::Array(Vec::new())),
        currency_info: clone_at(data, "/currencyComponent")
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        original_price: PriceRange {
            min: clone_at(data, "/priceComponent/origPrice/minAmount"),
            max: clone_at(data, "/priceComponent/origPrice/maxAmount"),
        },
        sale_price: PriceRange {
            min: clone_at(data, "/priceComponent/discountPrice/minActivityAmount"),
            max: clone_at(data, "/priceComponent/discountPrice/maxActivityAmount"),
        },
        shipping: clone_at(data, "/webGeneralFreightCalculateComponent/originalLayoutResultList")
            .unwrap_or_else(|| Value::Array(Vec::new())),
    }
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn u64_at(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value
        .pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn clone_at(value: &Value, pointer: &str) -> Option<Value> {
    value
        .pointer(pointer)
        .filter(|found| !found.is_null())
        .cloned()
}

fn string_or_number(value: &Value, pointer: &str, default: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => default.to_string(),
    }
}
