//! Static catalog served when every upstream source is unavailable.

use pricewise_core::{Product, Rating};

pub const FALLBACK_SOURCE: &str = "Fallback Data";

struct Seed {
    id: &'static str,
    title: &'static str,
    price: f64,
    original_price: f64,
    category: &'static str,
    description: &'static str,
    rate: f64,
    count: u32,
    brand: &'static str,
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "fallback_1",
        title: "Apple iPhone 14 Pro Max 128GB",
        price: 999.99,
        original_price: 1199.99,
        category: "Electronics",
        description: "Latest iPhone with A16 Bionic chip",
        rate: 4.8,
        count: 2547,
        brand: "Apple",
    },
    Seed {
        id: "fallback_2",
        title: "Samsung Galaxy S23 Ultra 256GB",
        price: 849.99,
        original_price: 1049.99,
        category: "Electronics",
        description: "Premium Android smartphone",
        rate: 4.7,
        count: 1823,
        brand: "Samsung",
    },
    Seed {
        id: "fallback_3",
        title: "Sony WH-1000XM5 Wireless Headphones",
        price: 329.99,
        original_price: 399.99,
        category: "Electronics",
        description: "Noise cancelling over-ear headphones",
        rate: 4.6,
        count: 3120,
        brand: "Sony",
    },
    Seed {
        id: "fallback_4",
        title: "Levi's 501 Original Fit Jeans",
        price: 59.5,
        original_price: 79.5,
        category: "Clothing",
        description: "Classic straight leg denim",
        rate: 4.5,
        count: 980,
        brand: "Levi's",
    },
    Seed {
        id: "fallback_5",
        title: "Instant Pot Duo 7-in-1 Pressure Cooker",
        price: 89.0,
        original_price: 119.99,
        category: "Home & Kitchen",
        description: "Multi-use programmable pressure cooker",
        rate: 4.7,
        count: 5211,
        brand: "Instant Pot",
    },
    Seed {
        id: "fallback_6",
        title: "Nike Air Zoom Pegasus 40",
        price: 119.99,
        original_price: 139.99,
        category: "Shoes",
        description: "Responsive everyday running shoe",
        rate: 4.4,
        count: 742,
        brand: "Nike",
    },
    Seed {
        id: "fallback_7",
        title: "Kindle Paperwhite 16GB",
        price: 139.99,
        original_price: 159.99,
        category: "Electronics",
        description: "Waterproof e-reader with adjustable warm light",
        rate: 4.6,
        count: 4410,
        brand: "Amazon",
    },
    Seed {
        id: "fallback_8",
        title: "CeraVe Moisturizing Cream 16oz",
        price: 16.99,
        original_price: 19.99,
        category: "Beauty",
        description: "Daily face and body moisturizer",
        rate: 4.8,
        count: 8830,
        brand: "CeraVe",
    },
];

/// The full embedded catalog.
#[must_use]
pub fn fallback_catalog() -> Vec<Product> {
    SEEDS
        .iter()
        .map(|s| Product {
            id: s.id.to_string(),
            title: s.title.to_string(),
            price: s.price,
            original_price: Some(s.original_price),
            category: s.category.to_string(),
            description: s.description.to_string(),
            rating: Rating::new(s.rate, s.count),
            brand: Some(s.brand.to_string()),
            image: format!(
                "https://via.placeholder.com/300x300/667eea/ffffff?text={}",
                s.title.split_whitespace().next().unwrap_or("Product")
            ),
            source: FALLBACK_SOURCE.to_string(),
        })
        .collect()
}

/// Embedded products matching `query`.
#[must_use]
pub fn fallback_products(query: &str) -> Vec<Product> {
    fallback_catalog()
        .into_iter()
        .filter(|p| p.matches_query(query))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn fallback_ids_and_titles_are_unique() {
        let catalog = fallback_catalog();
        let ids: HashSet<_> = catalog.iter().map(|p| p.id.clone()).collect();
        let keys: HashSet<_> = catalog.iter().map(Product::dedup_key).collect();
        assert_eq!(ids.len(), catalog.len());
        assert_eq!(keys.len(), catalog.len());
    }

    #[test]
    fn fallback_products_filters_by_query() {
        let phones = fallback_products("iphone");
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].id, "fallback_1");

        assert_eq!(fallback_products("").len(), fallback_catalog().len());
        assert!(fallback_products("zeppelin").is_empty());
    }
}
