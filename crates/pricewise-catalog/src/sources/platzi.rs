//! Platzi Fake Store API (`api.escuelajs.co`).
//!
//! Categories are nested objects and `images` entries are sometimes
//! JSON-encoded array strings. The API carries no ratings at all.

use async_trait::async_trait;
use pricewise_core::{Product, Rating};
use serde::Deserialize;
use serde_json::Value;

use super::{normalize_all, CatalogSource};
use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::normalize::{clean_image_url, coerce_price, id_to_string, select_matching};

const NAME: &str = "Platzi API";
const TAG: &str = "platzi";
const PAGE_SIZE: u32 = 30;

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
    category: Option<RawCategory>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCategory {
    #[serde(default)]
    name: String,
    #[serde(default)]
    image: Option<String>,
}

pub struct PlatziSource {
    client: CatalogClient,
    base_url: String,
}

impl PlatziSource {
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

    let category = raw.category.unwrap_or_default();
    let image = raw
        .images
        .iter()
        .map(|i| clean_image_url(i))
        .find(|i| !i.is_empty())
        .or(category.image)
        .unwrap_or_default();

    Ok(Product {
        id: format!("{TAG}_{raw_id}"),
        title: raw.title,
        price,
        original_price: None,
        category: category.name,
        description: raw.description,
        rating: Rating::default(),
        brand: None,
        image,
        source: NAME.to_string(),
    })
}

#[async_trait]
impl CatalogSource for PlatziSource {
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
                "api/v1/products",
                &[("offset", "0".to_string()), ("limit", PAGE_SIZE.to_string())],
            )
            .await?;
        let products = normalize_all(NAME, raw, normalize);
        Ok(select_matching(products, query, limit))
    }

    async fn fetch_product(&self, raw_id: &str) -> Result<Option<Product>, CatalogError> {
        let path = format!("api/v1/products/{}", raw_id.trim());
        match self
            .client
            .get_json::<RawProduct>(NAME, &self.base_url, &path, &[])
            .await
        {
            Ok(raw) => normalize(raw).map(Some),
            // Platzi answers unknown ids with 400 rather than 404.
            Err(CatalogError::NotFound { .. } | CatalogError::UnexpectedStatus { status: 400, .. }) => {
                Ok(None)
            }
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
    fn normalize_flattens_category_and_cleans_image() {
        let product = normalize(raw(json!({
            "id": 12,
            "title": "Classic Heather Gray Hoodie",
            "price": 69,
            "description": "Stay cozy",
            "category": {"id": 1, "name": "Clothes", "image": "https://i.imgur.com/cat.jpeg"},
            "images": ["[\"https://i.imgur.com/cSytoSD.jpeg\""]
        })))
        .unwrap();

        assert_eq!(product.id, "platzi_12");
        assert_eq!(product.category, "Clothes");
        assert_eq!(product.image, "https://i.imgur.com/cSytoSD.jpeg");
        assert_eq!(product.rating, Rating::default());
    }

    #[test]
    fn normalize_uses_category_image_when_no_images() {
        let product = normalize(raw(json!({
            "id": 13,
            "title": "Sneakers",
            "price": 20,
            "category": {"name": "Shoes", "image": "https://i.imgur.com/shoes.jpeg"},
            "images": []
        })))
        .unwrap();
        assert_eq!(product.image, "https://i.imgur.com/shoes.jpeg");
    }

    #[test]
    fn normalize_tolerates_missing_category() {
        let product = normalize(raw(json!({"id": 14, "title": "Mystery", "price": 5}))).unwrap();
        assert_eq!(product.category, "");
    }
}
