//! DummyJSON (`dummyjson.com`).
//!
//! Products come wrapped as `{"products": [...], "total", "skip", "limit"}`
//! with a bare numeric `rating`, an optional `brand` and image fields split
//! between `thumbnail` and `images`. The review count is taken from the
//! embedded `reviews` array when present.

use async_trait::async_trait;
use pricewise_core::Product;
use serde::Deserialize;
use serde_json::Value;

use super::{normalize_all, CatalogSource};
use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::normalize::{coerce_price, coerce_rating, id_to_string, select_matching};

const NAME: &str = "DummyJSON API";
const TAG: &str = "dj";
const PAGE_SIZE: u32 = 30;

#[derive(Debug, Deserialize)]
struct ProductPage {
    #[serde(default)]
    products: Vec<RawProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    price: Value,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    rating: Option<Value>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    discount_percentage: Option<f64>,
    #[serde(default)]
    reviews: Vec<Value>,
}

pub struct DummyJsonSource {
    client: CatalogClient,
    base_url: String,
}

impl DummyJsonSource {
    #[must_use]
    pub fn new(client: CatalogClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

fn normalize(raw: RawProduct) -> Result<Product, CatalogError> {
    let raw_id = id_to_string(&raw.id);
    if raw_id.is_empty() {
        return Err(CatalogError::Normalization {
            source_name: NAME.to_string(),
            product_id: raw_id,
            reason: "missing id".to_string(),
        });
    }
    let price = coerce_price(&raw.price).ok_or_else(|| CatalogError::Normalization {
        source_name: NAME.to_string(),
        product_id: raw_id.clone(),
        reason: format!("unusable price {}", raw.price),
    })?;

    // DummyJSON prices are already discounted; recover the list price.
    let original_price = raw
        .discount_percentage
        .filter(|pct| *pct > 0.0 && *pct < 100.0)
        .map(|pct| pricewise_core::round_cents(price / (1.0 - pct / 100.0)));

    let review_count = u32::try_from(raw.reviews.len()).unwrap_or(u32::MAX);
    let image = raw
        .thumbnail
        .filter(|t| !t.trim().is_empty())
        .or_else(|| raw.images.into_iter().next())
        .unwrap_or_default();

    Ok(Product {
        id: format!("{TAG}_{raw_id}"),
        title: raw.title,
        price,
        original_price,
        category: raw.category,
        description: raw.description,
        rating: coerce_rating(raw.rating.as_ref(), review_count),
        brand: raw.brand.filter(|b| !b.trim().is_empty()),
        image,
        source: NAME.to_string(),
    })
}

#[async_trait]
impl CatalogSource for DummyJsonSource {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError> {
        let page: ProductPage = self
            .client
            .get_json(
                NAME,
                &self.base_url,
                "products",
                &[("limit", PAGE_SIZE.to_string()), ("skip", "0".to_string())],
            )
            .await?;
        let products = normalize_all(NAME, page.products, normalize);
        Ok(select_matching(products, query, limit))
    }

    async fn fetch_product(&self, raw_id: &str) -> Result<Option<Product>, CatalogError> {
        let path = format!("products/{}", raw_id.trim());
        match self
            .client
            .get_json::<RawProduct>(NAME, &self.base_url, &path, &[])
            .await
        {
            Ok(raw) => normalize(raw).map(Some),
            Err(CatalogError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalize_maps_bare_rating_and_review_count() {
        let product = normalize(raw(json!({
            "id": 1,
            "title": "Essence Mascara Lash Princess",
            "price": 9.99,
            "category": "beauty",
            "rating": 4.94,
            "brand": "Essence",
            "thumbnail": "https://cdn.dummyjson.com/thumb.png",
            "reviews": [{"rating": 2}, {"rating": 5}, {"rating": 5}]
        })))
        .unwrap();

        assert_eq!(product.id, "dj_1");
        assert!((product.rating.rate - 4.94).abs() < f64::EPSILON);
        assert_eq!(product.rating.count, 3);
        assert_eq!(product.brand.as_deref(), Some("Essence"));
        assert_eq!(product.image, "https://cdn.dummyjson.com/thumb.png");
    }

    #[test]
    fn normalize_falls_back_to_first_image() {
        let product = normalize(raw(json!({
            "id": 2,
            "title": "Eyeshadow Palette",
            "price": "19.99",
            "thumbnail": "",
            "images": ["https://cdn.dummyjson.com/a.png", "https://cdn.dummyjson.com/b.png"]
        })))
        .unwrap();
        assert_eq!(product.image, "https://cdn.dummyjson.com/a.png");
    }

    #[test]
    fn normalize_recovers_list_price_from_discount() {
        let product = normalize(raw(json!({
            "id": 3,
            "title": "Powder Canister",
            "price": 75.0,
            "discountPercentage": 25.0
        })))
        .unwrap();
        assert_eq!(product.original_price, Some(100.0));
    }

    #[test]
    fn normalize_drops_blank_brand() {
        let product = normalize(raw(json!({"id": 4, "title": "Lipstick", "price": 1, "brand": " "})))
            .unwrap();
        assert!(product.brand.is_none());
    }
}
