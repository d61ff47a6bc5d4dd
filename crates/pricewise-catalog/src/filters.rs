//! Post-aggregation filtering and ordering.

use std::cmp::Ordering;

use pricewise_core::{Availability, EnrichedProduct, SortMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Case-insensitive substring of the product category.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    /// Keep only products whose best deal is in stock.
    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(default)]
    pub sort: SortMode,
}

impl SearchFilters {
    fn accepts(&self, item: &EnrichedProduct) -> bool {
        let p = &item.product;
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            if !p.in_category(category) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| p.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| p.price > max) {
            return false;
        }
        if self.min_rating.is_some_and(|min| p.rating.rate < min) {
            return false;
        }
        if self.in_stock_only && item.best_deal.availability != Availability::InStock {
            return false;
        }
        true
    }

    /// Filters `items` and orders them per [`SearchFilters::sort`].
    /// `Relevance` keeps the incoming order.
    #[must_use]
    pub fn apply(&self, items: Vec<EnrichedProduct>) -> Vec<EnrichedProduct> {
        let mut kept: Vec<EnrichedProduct> = items.into_iter().filter(|i| self.accepts(i)).collect();
        sort_products(&mut kept, self.sort);
        kept
    }
}

/// Stable in-place sort by `mode`.
pub fn sort_products(items: &mut [EnrichedProduct], mode: SortMode) {
    let cmp: fn(&EnrichedProduct, &EnrichedProduct) -> Ordering = match mode {
        SortMode::Relevance => return,
        SortMode::PriceLow => |a, b| a.product.price.total_cmp(&b.product.price),
        SortMode::PriceHigh => |a, b| b.product.price.total_cmp(&a.product.price),
        SortMode::Rating => |a, b| b.product.rating.rate.total_cmp(&a.product.rating.rate),
        SortMode::Discount => |a, b| b.discount.cmp(&a.discount),
        SortMode::Name => |a, b| {
            a.product
                .title
                .to_lowercase()
                .cmp(&b.product.title.to_lowercase())
        },
    };
    items.sort_by(cmp);
}

#[cfg(test)]
mod tests {
    use pricewise_core::{Product, Rating, StoreOffer};

    use super::*;

    fn item(id: &str, title: &str, price: f64, rate: f64, discount: u32, stock: Availability) -> EnrichedProduct {
        let offer = StoreOffer {
            store: "Walmart".to_string(),
            price,
            availability: stock,
            shipping: "Free Shipping".to_string(),
            rating: 4.5,
        };
        EnrichedProduct {
            product: Product {
                id: id.to_string(),
                title: title.to_string(),
                price,
                original_price: None,
                category: if id.starts_with("fs") { "electronics" } else { "jewelery" }.to_string(),
                description: String::new(),
                rating: Rating::new(rate, 10),
                brand: None,
                image: String::new(),
                source: String::new(),
            },
            store_offers: vec![offer.clone()],
            best_deal: offer,
            discount,
            savings: 0.0,
        }
    }

    fn sample() -> Vec<EnrichedProduct> {
        vec![
            item("fs_1", "Monitor", 200.0, 4.1, 10, Availability::InStock),
            item("dj_2", "bracelet", 40.0, 4.8, 30, Availability::Limited),
            item("fs_3", "Keyboard", 90.0, 3.2, 5, Availability::InStock),
        ]
    }

    fn ids(items: &[EnrichedProduct]) -> Vec<&str> {
        items.iter().map(|i| i.product.id.as_str()).collect()
    }

    #[test]
    fn default_filters_keep_everything_in_order() {
        let out = SearchFilters::default().apply(sample());
        assert_eq!(ids(&out), ["fs_1", "dj_2", "fs_3"]);
    }

    #[test]
    fn price_range_and_rating_floor() {
        let filters = SearchFilters {
            min_price: Some(50.0),
            min_rating: Some(4.0),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&filters.apply(sample())), ["fs_1"]);

        let filters = SearchFilters {
            max_price: Some(100.0),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&filters.apply(sample())), ["dj_2", "fs_3"]);
    }

    #[test]
    fn category_and_stock_filters() {
        let filters = SearchFilters {
            category: Some("Electronics".to_string()),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&filters.apply(sample())), ["fs_1", "fs_3"]);

        let filters = SearchFilters {
            in_stock_only: true,
            ..SearchFilters::default()
        };
        assert_eq!(ids(&filters.apply(sample())), ["fs_1", "fs_3"]);
    }

    #[test]
    fn sort_modes() {
        let mut items = sample();
        sort_products(&mut items, SortMode::PriceLow);
        assert_eq!(ids(&items), ["dj_2", "fs_3", "fs_1"]);
        sort_products(&mut items, SortMode::PriceHigh);
        assert_eq!(ids(&items), ["fs_1", "fs_3", "dj_2"]);
        sort_products(&mut items, SortMode::Rating);
        assert_eq!(ids(&items), ["dj_2", "fs_1", "fs_3"]);
        sort_products(&mut items, SortMode::Discount);
        assert_eq!(ids(&items), ["dj_2", "fs_1", "fs_3"]);
        sort_products(&mut items, SortMode::Name);
        assert_eq!(ids(&items), ["dj_2", "fs_3", "fs_1"]);
    }
}
