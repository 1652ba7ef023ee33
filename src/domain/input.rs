//! # Product Input Normalization
//!
//! Callers hand in raw product ids or AliExpress product URLs; everything
//! downstream works with a validated `ProductId`. Recognized URL shapes:
//! `/item/<id>.html`, the compact `/i/<id>.html`, and a `productId=` query
//! parameter fallback.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::services::ScrapeError;

const INVALID_INPUT_MESSAGE: &str =
    "Please provide a valid product id or AliExpress product URL";

static PRODUCT_ID_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static ZERO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0+$").unwrap());

// Tried in order; an invalid capture falls through to the next pattern.
static URL_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)/item/(\d+)(?:\.html|/)?").unwrap(),
        Regex::new(r"(?i)/i/(\d+)\.html").unwrap(),
        Regex::new(r"(?i)[?&]productId=(\d+)").unwrap(),
    ]
});

fn is_valid_product_id(value: &str) -> bool {
    PRODUCT_ID_ONLY.is_match(value) && !ZERO_ID.is_match(value)
}

fn invalid_input() -> ScrapeError {
    ScrapeError::InvalidInput(INVALID_INPUT_MESSAGE.to_string())
}

/// A validated AliExpress product id: all digits, not zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Normalizes a raw id or a product URL into a `ProductId`.
    ///
    /// Accepts a trimmed digit string outright, otherwise tries the known
    /// URL patterns in order.
    pub fn parse(input: &str) -> Result<Self, ScrapeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid_input());
        }

        if is_valid_product_id(trimmed) {
            return Ok(Self(trimmed.to_string()));
        }

        for pattern in URL_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(trimmed) {
                if let Some(id) = captures.get(1) {
                    if is_valid_product_id(id.as_str()) {
                        return Ok(Self(id.as_str().to_string()));
                    }
                }
            }
        }

        Err(invalid_input())
    }

    /// Builds a `ProductId` from a numeric id. Zero is never a product id.
    pub fn from_numeric(id: u64) -> Result<Self, ScrapeError> {
        if id == 0 {
            return Err(invalid_input());
        }
        Ok(Self(id.to_string()))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_raw_product_id() {
        let id = ProductId::parse("1005007429636284").expect("valid");
        assert_eq!(id.as_str(), "1005007429636284");
    }

    #[test]
    fn accepts_numeric_product_id() {
        let id = ProductId::from_numeric(1_234_567_890_123).expect("valid");
        assert_eq!(id.as_str(), "1234567890123");
    }

    #[test]
    fn accepts_item_url() {
        let id = ProductId::parse("https://www.aliexpress.com/item/1005007429636284.html")
            .expect("valid");
        assert_eq!(id.as_str(), "1005007429636284");
    }

    #[test]
    fn accepts_compact_i_url() {
        let id = ProductId::parse("https://www.aliexpress.com/i/1005007429636284.html")
            .expect("valid");
        assert_eq!(id.as_str(), "1005007429636284");
    }

    #[test]
    fn accepts_query_param_fallback() {
        let id = ProductId::parse(
            "https://www.aliexpress.com/p/item?foo=bar&productId=1005007429636284",
        )
        .expect("valid");
        assert_eq!(id.as_str(), "1005007429636284");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = ProductId::parse("  1005007429636284  ").expect("valid");
        assert_eq!(id.as_str(), "1005007429636284");
    }

    #[test]
    fn rejects_non_product_urls() {
        let error = ProductId::parse("https://www.aliexpress.com/category/200000001.html")
            .expect_err("must reject");
        assert!(error
            .to_string()
            .contains("valid product id or AliExpress product URL"));
    }

    #[test]
    fn rejects_zero_like_ids() {
        assert!(ProductId::parse("0000000").is_err());
        assert!(ProductId::parse("https://www.aliexpress.com/item/0.html").is_err());
        assert!(ProductId::from_numeric(0).is_err());
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(ProductId::parse("").is_err());
        assert!(ProductId::parse("   ").is_err());
        assert!(ProductId::parse("not-a-product").is_err());
        assert!(ProductId::parse("12.34").is_err());
    }

    #[test]
    fn from_str_round_trips_through_display() {
        let id: ProductId = "1005007429636284".parse().expect("valid");
        assert_eq!(id.to_string(), "1005007429636284");
    }
}
