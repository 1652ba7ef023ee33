//! # Product Schema
//!
//! The public product JSON contract. Stable top-level fields are typed;
//! volatile site-shaped subtrees (variants, specs, shipping, reviews,
//! currency info) stay raw `serde_json::Value` on purpose, so site markup
//! churn never forces a schema migration here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::services::ScrapeError;

/// Inventory counters for a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub total: u64,
    pub available: u64,
}

/// Seller block of the product JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub name: Option<String>,
    pub logo: Option<String>,
    pub company_id: Option<Value>,
    pub store_number: Option<Value>,
    pub is_top_rated: bool,
    pub has_pay_pal_account: bool,
    pub rating_count: u64,
    pub rating: String,
}

impl Default for StoreInfo {
    fn default() -> Self {
        Self {
            name: None,
            logo: None,
            company_id: None,
            store_number: None,
            is_top_rated: false,
            has_pay_pal_account: false,
            rating_count: 0,
            rating: "0".to_string(),
        }
    }
}

/// Star-rating block of the product JSON.
///
/// `total_start_count` is not a typo on our side: the upstream key is
/// literally `totalStartCount` and the wire shape keeps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratings {
    pub total_star: u8,
    pub average_star: String,
    pub total_start_count: u64,
    pub five_star_count: u64,
    pub four_star_count: u64,
    pub three_star_count: u64,
    pub two_star_count: u64,
    pub one_star_count: u64,
}

impl Default for Ratings {
    fn default() -> Self {
        Self {
            total_star: 5,
            average_star: "0".to_string(),
            total_start_count: 0,
            five_star_count: 0,
            four_star_count: 0,
            three_star_count: 0,
            two_star_count: 0,
            one_star_count: 0,
        }
    }
}

/// Min/max price pair. Amounts keep the site's own object shape
/// (`{ currency, value, formatedAmount }`), so they stay raw.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

/// One scraped product, in the shape callers see.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub title: Option<String>,
    pub category_id: Option<Value>,
    pub product_id: Option<Value>,
    pub quantity: Quantity,
    /// Raw HTML of the description page; `None` when skipped or unavailable.
    pub description: Option<String>,
    pub orders: String,
    pub store_info: StoreInfo,
    pub ratings: Ratings,
    pub images: Vec<String>,
    pub reviews: Vec<Value>,
    pub variants: Value,
    pub specs: Value,
    pub currency_info: Value,
    pub original_price: PriceRange,
    pub sale_price: PriceRange,
    pub shipping: Value,
}

impl Default for ProductData {
    fn default() -> Self {
        Self {
            title: None,
            category_id: None,
            product_id: None,
            quantity: Quantity::default(),
            description: None,
            orders: "0".to_string(),
            store_info: StoreInfo::default(),
            ratings: Ratings::default(),
            images: Vec::new(),
            reviews: Vec::new(),
            variants: serde_json::json!({ "options": [], "prices": [] }),
            specs: Value::Array(Vec::new()),
            currency_info: Value::Object(serde_json::Map::new()),
            original_price: PriceRange::default(),
            sale_price: PriceRange::default(),
            shipping: Value::Array(Vec::new()),
        }
    }
}

impl ProductData {
    /// Serializes the product, optionally projected down to `fields`.
    ///
    /// With a field list, only the selected top-level keys survive, in the
    /// order requested. Without one, the full shape is returned.
    pub fn to_json(&self, fields: Option<&[ProductField]>) -> serde_json::Result<Value> {
        let full = serde_json::to_value(self)?;
        let Some(fields) = fields else {
            return Ok(full);
        };

        let map = match full {
            Value::Object(map) => map,
            other => return Ok(other),
        };

        let mut picked = serde_json::Map::new();
        for field in fields {
            let key = field.as_str();
            picked.insert(
                key.to_string(),
                map.get(key).cloned().unwrap_or(Value::Null),
            );
        }
        Ok(Value::Object(picked))
    }
}

/// A selectable top-level field of the product JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductField {
    Title,
    CategoryId,
    ProductId,
    Quantity,
    Description,
    Orders,
    StoreInfo,
    Ratings,
    Images,
    Reviews,
    Variants,
    Specs,
    CurrencyInfo,
    OriginalPrice,
    SalePrice,
    Shipping,
}

impl ProductField {
    /// Every supported field, in wire order.
    pub const ALL: [Self; 16] = [
        Self::Title,
        Self::CategoryId,
        Self::ProductId,
        Self::Quantity,
        Self::Description,
        Self::Orders,
        Self::StoreInfo,
        Self::Ratings,
        Self::Images,
        Self::Reviews,
        Self::Variants,
        Self::Specs,
        Self::CurrencyInfo,
        Self::OriginalPrice,
        Self::SalePrice,
        Self::Shipping,
    ];

    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::CategoryId => "categoryId",
            Self::ProductId => "productId",
            Self::Quantity => "quantity",
            Self::Description => "description",
            Self::Orders => "orders",
            Self::StoreInfo => "storeInfo",
            Self::Ratings => "ratings",
            Self::Images => "images",
            Self::Reviews => "reviews",
            Self::Variants => "variants",
            Self::Specs => "specs",
            Self::CurrencyInfo => "currencyInfo",
            Self::OriginalPrice => "originalPrice",
            Self::SalePrice => "salePrice",
            Self::Shipping => "shipping",
        }
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parses a caller-supplied field list: trims, validates, de-duplicates
    /// while preserving first-seen order.
    pub fn parse_list<S: AsRef<str>>(fields: &[S]) -> Result<Vec<Self>, ScrapeError> {
        let mut selected = Vec::new();
        for field in fields {
            let parsed: Self = field.as_ref().parse()?;
            if !selected.contains(&parsed) {
                selected.push(parsed);
            }
        }
        Ok(selected)
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductField {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ScrapeError::InvalidInput(
                "`fields` must contain non-empty strings".to_string(),
            ));
        }

        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == trimmed)
            .ok_or_else(|| {
                ScrapeError::InvalidInput(format!(
                    "Unsupported field \"{trimmed}\". Supported fields: {}",
                    Self::supported_list()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_serializes_with_wire_key_names() {
        let value = serde_json::to_value(ProductData::default()).expect("serialize");
        let object = value.as_object().expect("object");

        assert_eq!(object.len(), ProductField::ALL.len());
        for field in ProductField::ALL {
            assert!(object.contains_key(field.as_str()), "missing {field}");
        }
        assert_eq!(value["ratings"]["totalStar"], 5);
        assert_eq!(value["ratings"]["totalStartCount"], 0);
        assert_eq!(value["storeInfo"]["hasPayPalAccount"], false);
        assert_eq!(value["orders"], "0");
    }

    #[test]
    fn projection_keeps_only_requested_fields() {
        let product = ProductData {
            title: Some("Bluetooth Speaker".to_string()),
            ..ProductData::default()
        };
        let picked = product
            .to_json(Some(&[ProductField::Title, ProductField::SalePrice]))
            .expect("serialize");
        let object = picked.as_object().expect("object");

        assert_eq!(object.len(), 2);
        assert_eq!(picked["title"], "Bluetooth Speaker");
        assert!(object.contains_key("salePrice"));
        assert!(!object.contains_key("images"));
    }

    #[test]
    fn field_names_round_trip() {
        for field in ProductField::ALL {
            let parsed: ProductField = field.as_str().parse().expect("round trip");
            assert_eq!(parsed, field);
        }
    }

    #[test]
    fn unsupported_field_reports_the_supported_list() {
        let error = "priceHistory".parse::<ProductField>().expect_err("reject");
        let message = error.to_string();
        assert!(message.starts_with("Unsupported field \"priceHistory\". Supported fields: "));
        assert!(message.contains("title, categoryId, productId"));
        assert!(message.ends_with("salePrice, shipping"));
    }

    #[test]
    fn empty_field_names_are_rejected() {
        let error = "   ".parse::<ProductField>().expect_err("reject");
        assert_eq!(error.to_string(), "`fields` must contain non-empty strings");
    }

    #[test]
    fn parse_list_trims_and_dedups_preserving_order() {
        let fields =
            ProductField::parse_list(&["salePrice", " title ", "salePrice"]).expect("valid");
        assert_eq!(fields, vec![ProductField::SalePrice, ProductField::Title]);
    }
}
