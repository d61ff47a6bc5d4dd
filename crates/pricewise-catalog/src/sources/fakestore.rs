//! FakeStore API (`fakestoreapi.com`).
//!
//! Returns a bare array of products with `rating: {rate, count}` objects and
//! numeric prices. The API has no server-side search, so the first page is
//! fetched and filtered locally.

use async_trait::async_trait;
use pricewise_core::Product;
use serde::Deserialize;
use serde_json::Value;

use super::{normalize_all, CatalogSource};
use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::normalize::{coerce_price, coerce_rating, id_to_string, select_matching};

const NAME: &str = "FakeStore API";
const TAG: &str = "fs";
const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
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
    image: String,
    #[serde(default)]
    rating: Option<Value>,
}

pub struct FakeStoreSource {
    client: CatalogClient,
    base_url: String,
}

impl FakeStoreSource {
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
    let price = coerce_price(&raw.price).ok_or_else(|| CatalogError::Normalization {
        source_name: NAME.to_string(),
        product_id: raw_id.clone(),
        reason: format!("unusable price {}", raw.price),
    })?;
    if raw_id.is_empty() {
        return Err(CatalogError::Normalization {
            source_name: NAME.to_string(),
            product_id: raw_id,
            reason: "missing id".to_string(),
        });
    }

    Ok(Product {
        id: format!("{TAG}_{raw_id}"),
        title: raw.title,
        price,
        original_price: None,
        category: raw.category,
        description: raw.description,
        rating: coerce_rating(raw.rating.as_ref(), 0),
        brand: None,
        image: raw.image,
        source: NAME.to_string(),
    })
}

#[async_trait]
impl CatalogSource for FakeStoreSource {
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
        let raw: Vec<RawProduct> = self
            .client
            .get_json(
                NAME,
                &self.base_url,
                "products",
                &[("limit", PAGE_SIZE.to_string())],
            )
            .await?;
        let products = normalize_all(NAME, raw, normalize);
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
    fn normalize_prefixes_id_and_keeps_rating_object() {
        let product = normalize(raw(json!({
            "id": 3,
            "title": "Mens Cotton Jacket",
            "price": 55.99,
            "description": "great outerwear jackets",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/71li-ujtlUL._AC_UX679_.jpg",
            "rating": {"rate": 4.7, "count": 500}
        })))
        .unwrap();

        assert_eq!(product.id, "fs_3");
        assert_eq!(product.source, "FakeStore API");
        assert!((product.price - 55.99).abs() < f64::EPSILON);
        assert_eq!(product.rating.count, 500);
        assert!(product.brand.is_none());
    }

    #[test]
    fn normalize_accepts_string_price() {
        let product = normalize(raw(json!({"id": "9", "title": "Drive", "price": "64.00"}))).unwrap();
        assert_eq!(product.id, "fs_9");
        assert!((product.price - 64.0).abs() < f64::EPSILON);
    }

    #[test]
    fn normalize_rejects_unusable_price() {
        let err = normalize(raw(json!({"id": 1, "title": "Bag", "price": "n/a"}))).unwrap_err();
        assert!(matches!(err, CatalogError::Normalization { ref product_id, .. } if product_id == "1"));
    }

    #[test]
    fn normalize_rejects_missing_id() {
        let err = normalize(raw(json!({"id": null, "title": "Bag", "price": 3}))).unwrap_err();
        assert!(matches!(err, CatalogError::Normalization { .. }));
    }
}
