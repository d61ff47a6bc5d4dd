use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Number of leading title characters that identify a listing across sources.
pub const DEDUP_KEY_CHARS: usize = 30;

/// Rounds a price to whole cents.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unified review summary. Sources report ratings in different shapes; every
/// fetcher converts into this one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    /// Average score in `[0, 5]`.
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub count: u32,
}

impl Rating {
    /// Builds a rating, clamping `rate` into `[0, 5]` and mapping NaN to `0`.
    #[must_use]
    pub fn new(rate: f64, count: u32) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 5.0) };
        Self { rate, count }
    }
}

/// A catalog product in the canonical shape every fetcher normalizes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Source-prefixed id, e.g. `"fs_3"` or `"dj_17"`. Globally unique.
    ///
    /// Accepts either a JSON string or a JSON integer on input, since
    /// persisted snapshots and imports may carry either representation.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Current price, never negative.
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub image: String,
    /// Human-readable name of the catalog the product came from.
    #[serde(default)]
    pub source: String,
}

impl Product {
    /// Case-insensitive key built from the first 30 characters of the title.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        self.title
            .to_lowercase()
            .chars()
            .take(DEDUP_KEY_CHARS)
            .collect()
    }

    /// Returns `true` when `query` appears (case-insensitively) in the
    /// title, category, description or brand. An empty query matches all.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .brand
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(&needle))
    }

    /// Returns `true` when the product's category contains `category`
    /// (case-insensitive).
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .to_lowercase()
            .contains(&category.trim().to_lowercase())
    }

    /// Loose id comparison: surrounding whitespace is ignored so that ids
    /// arriving as `17` and `"17 "` compare equal once stringified.
    #[must_use]
    pub fn has_id(&self, id: &str) -> bool {
        self.id.trim() == id.trim()
    }
}

/// Splits a source-prefixed id into its source tag and the upstream id:
/// `"dj_17"` becomes `("dj", "17")`. `None` when either half is empty.
#[must_use]
pub fn split_source_id(id: &str) -> Option<(&str, &str)> {
    id.trim()
        .split_once('_')
        .filter(|(tag, raw)| !tag.is_empty() && !raw.is_empty())
}

/// Deserializes an id that may arrive as a JSON string or number into a
/// trimmed string. Usable with `#[serde(deserialize_with = ...)]`.
///
/// # Errors
///
/// Fails when the value is neither a string nor a number.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(s) => Ok(s.trim().to_string()),
        RawId::Int(n) => Ok(n.to_string()),
        RawId::Float(f) => Ok(f.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    Limited,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::InStock => write!(f, "In Stock"),
            Availability::Limited => write!(f, "Limited Stock"),
        }
    }
}

/// One retailer's synthesized offer for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOffer {
    pub store: String,
    pub price: f64,
    pub availability: Availability,
    /// Shipping label, e.g. `"Free 2-Day Shipping"`.
    pub shipping: String,
    pub rating: f64,
}

/// A product plus its multi-store price comparison.
///
/// `product.price` holds the best offer price and `product.original_price`
/// the worst; `store_offers` is sorted ascending by price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub store_offers: Vec<StoreOffer>,
    pub best_deal: StoreOffer,
    /// Whole-number percentage between worst and best offer.
    pub discount: u32,
    pub savings: f64,
}

impl EnrichedProduct {
    #[must_use]
    pub fn total_stores(&self) -> usize {
        self.store_offers.len()
    }
}

/// Result ordering shared by search filters and user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Relevance,
    PriceLow,
    PriceHigh,
    Rating,
    Discount,
    Name,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortMode::Relevance => "relevance",
            SortMode::PriceLow => "price_low",
            SortMode::PriceHigh => "price_high",
            SortMode::Rating => "rating",
            SortMode::Discount => "discount",
            SortMode::Name => "name",
        };
        f.write_str(s)
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "relevance" => Ok(SortMode::Relevance),
            "price_low" => Ok(SortMode::PriceLow),
            "price_high" => Ok(SortMode::PriceHigh),
            "rating" => Ok(SortMode::Rating),
            "discount" => Ok(SortMode::Discount),
            "name" => Ok(SortMode::Name),
            other => Err(format!("unknown sort mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_product(id: &str, title: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            price: 19.99,
            original_price: None,
            category: "Electronics".to_string(),
            description: "Wireless over-ear headphones".to_string(),
            rating: Rating::new(4.4, 120),
            brand: Some("Acme".to_string()),
            image: String::new(),
            source: "FakeStore API".to_string(),
        }
    }

    #[test]
    fn dedup_key_is_lowercase_and_truncated() {
        let product = make_product(
            "fs_1",
            "Mens Casual Premium Slim Fit T-Shirts With Extra Words",
        );
        let key = product.dedup_key();
        assert_eq!(key.chars().count(), DEDUP_KEY_CHARS);
        assert_eq!(key, "mens casual premium slim fit t");
    }

    #[test]
    fn dedup_key_keeps_short_titles_whole() {
        let product = make_product("fs_1", "iPhone 9");
        assert_eq!(product.dedup_key(), "iphone 9");
    }

    #[test]
    fn matches_query_checks_all_text_fields() {
        let product = make_product("fs_1", "Studio Headphones");
        assert!(product.matches_query("studio"));
        assert!(product.matches_query("ELECTRONICS"));
        assert!(product.matches_query("over-ear"));
        assert!(product.matches_query("acme"));
        assert!(product.matches_query(""));
        assert!(!product.matches_query("laptop"));
    }

    #[test]
    fn rating_clamps_out_of_range_values() {
        assert!((Rating::new(7.2, 1).rate - 5.0).abs() < f64::EPSILON);
        assert!(Rating::new(-1.0, 1).rate.abs() < f64::EPSILON);
        assert!(Rating::new(f64::NAN, 1).rate.abs() < f64::EPSILON);
    }

    #[test]
    fn product_id_accepts_numbers_and_strings() {
        let numeric: Product = serde_json::from_str(r#"{"id": 17, "title": "x"}"#).unwrap();
        assert_eq!(numeric.id, "17");
        let text: Product = serde_json::from_str(r#"{"id": " dj_4 ", "title": "x"}"#).unwrap();
        assert_eq!(text.id, "dj_4");
        assert!(text.has_id("dj_4"));
    }

    #[test]
    fn product_without_id_fails_to_deserialize() {
        let result = serde_json::from_str::<Product>(r#"{"title": "no id"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn split_source_id_separates_tag_from_upstream_id() {
        assert_eq!(split_source_id("platzi_12"), Some(("platzi", "12")));
        assert_eq!(split_source_id("dj_sku_4"), Some(("dj", "sku_4")));
        assert_eq!(split_source_id("12"), None);
        assert_eq!(split_source_id("_12"), None);
        assert_eq!(split_source_id("fs_"), None);
    }

    #[test]
    fn sort_mode_parses_dashes_and_underscores() {
        assert_eq!("price-low".parse::<SortMode>().unwrap(), SortMode::PriceLow);
        assert_eq!("PRICE_HIGH".parse::<SortMode>().unwrap(), SortMode::PriceHigh);
        assert!("cheapest".parse::<SortMode>().is_err());
    }

    #[test]
    fn enriched_product_serializes_flat() {
        let offer = StoreOffer {
            store: "Walmart".to_string(),
            price: 18.5,
            availability: Availability::InStock,
            shipping: "Free Shipping".to_string(),
            rating: 4.5,
        };
        let enriched = EnrichedProduct {
            product: make_product("fs_1", "Studio Headphones"),
            store_offers: vec![offer.clone()],
            best_deal: offer,
            discount: 0,
            savings: 0.0,
        };
        let value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["id"], "fs_1");
        assert_eq!(value["best_deal"]["availability"], "in_stock");
        assert_eq!(enriched.total_stores(), 1);
    }

    #[test]
    fn round_cents_rounds_half_up() {
        assert!((round_cents(12.346) - 12.35).abs() < 1e-9);
        assert!((round_cents(9.999) - 10.0).abs() < 1e-9);
    }
}
