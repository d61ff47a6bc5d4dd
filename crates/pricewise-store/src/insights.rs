//! Read-only summaries derived from the user's collections.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use pricewise_core::Product;
use serde::Serialize;

use crate::model::COMPARE_CAPACITY;
use crate::store::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityCounts {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub total: usize,
    pub active: usize,
    pub triggered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompareCounts {
    pub current: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub favorites: ActivityCounts,
    pub recently_viewed: ActivityCounts,
    pub price_alerts: AlertCounts,
    pub search_history: usize,
    pub compare: CompareCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandCount {
    pub brand: String,
    pub count: usize,
}

fn activity<'a>(
    stamps: impl Iterator<Item = Option<&'a DateTime<Utc>>>,
    now: DateTime<Utc>,
) -> ActivityCounts {
    let day = now - Duration::days(1);
    let week = now - Duration::days(7);
    let mut counts = ActivityCounts {
        total: 0,
        today: 0,
        this_week: 0,
    };
    for stamp in stamps {
        counts.total += 1;
        if let Some(t) = stamp {
            if *t > day {
                counts.today += 1;
            }
            if *t > week {
                counts.this_week += 1;
            }
        }
    }
    counts
}

/// Tallies labels, most frequent first; ties keep first-seen order.
fn tally<'a>(labels: impl Iterator<Item = &'a str>, limit: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for label in labels {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

impl LocalStore {
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.statistics_at(Utc::now())
    }

    pub(crate) fn statistics_at(&self, now: DateTime<Utc>) -> Statistics {
        Statistics {
            favorites: activity(self.favorites.iter().map(|f| f.added_at.as_ref()), now),
            recently_viewed: activity(self.recent.iter().map(|r| r.viewed_at.as_ref()), now),
            price_alerts: AlertCounts {
                total: self.alerts.len(),
                active: self.alerts.iter().filter(|a| a.is_pending()).count(),
                triggered: self.alerts.iter().filter(|a| a.triggered).count(),
            },
            search_history: self.history.len(),
            compare: CompareCounts {
                current: self.compare.len(),
                capacity: COMPARE_CAPACITY,
            },
        }
    }

    /// Categories of recently viewed products by view count.
    #[must_use]
    pub fn most_viewed_categories(&self, limit: usize) -> Vec<CategoryCount> {
        tally(
            self.recent.iter().map(|r| r.product.category.as_str()),
            limit,
        )
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
    }

    /// Brands across favorites and recently viewed products.
    #[must_use]
    pub fn top_brands(&self, limit: usize) -> Vec<BrandCount> {
        let brands = self
            .favorites
            .iter()
            .map(|f| &f.product)
            .chain(self.recent.iter().map(|r| &r.product))
            .filter_map(|p| p.brand.as_deref());
        tally(brands, limit)
            .into_iter()
            .map(|(brand, count)| BrandCount { brand, count })
            .collect()
    }

    fn known_products(&self) -> impl Iterator<Item = &Product> {
        self.favorites
            .iter()
            .map(|f| &f.product)
            .chain(self.recent.iter().map(|r| &r.product))
    }

    /// Favorites and recently viewed products sharing a category or brand
    /// with `product_id`. Empty when the product is in neither collection.
    #[must_use]
    pub fn similar_products(&self, product_id: &str, limit: usize) -> Vec<Product> {
        let Some(anchor) = self.known_products().find(|p| p.has_id(product_id)) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        seen.insert(anchor.id.as_str());
        self.known_products()
            .filter(|p| {
                let same_category =
                    !anchor.category.is_empty() && p.category.eq_ignore_ascii_case(&anchor.category);
                let same_brand = anchor.brand.is_some() && p.brand == anchor.brand;
                same_category || same_brand
            })
            .filter(|p| seen.insert(p.id.as_str()))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Recently viewed products that are not favorites, those in the user's
    /// most viewed categories first.
    #[must_use]
    pub fn recommendations(&self, limit: usize) -> Vec<Product> {
        let preferred: Vec<String> = self
            .most_viewed_categories(5)
            .into_iter()
            .map(|c| c.category)
            .collect();
        let rank = |p: &Product| {
            preferred
                .iter()
                .position(|c| *c == p.category.trim())
                .unwrap_or(preferred.len())
        };

        let mut candidates: Vec<&Product> = self
            .recent
            .iter()
            .map(|r| &r.product)
            .filter(|p| !self.is_favorite(&p.id))
            .collect();
        candidates.sort_by_key(|&p| rank(p));
        candidates.into_iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_orders_by_count_then_first_seen() {
        let counts = tally(
            ["shoes", "books", "shoes", "toys", "books", "", "garden"].into_iter(),
            3,
        );
        assert_eq!(
            counts,
            vec![
                ("shoes".to_string(), 2),
                ("books".to_string(), 2),
                ("toys".to_string(), 1)
            ]
        );
    }

    #[test]
    fn activity_counts_windows() {
        let now: DateTime<Utc> = "2026-06-10T12:00:00Z".parse().unwrap();
        let stamps = [
            Some(now - Duration::hours(2)),
            Some(now - Duration::days(3)),
            Some(now - Duration::days(20)),
            None,
        ];
        let counts = activity(stamps.iter().map(Option::as_ref), now);
        assert_eq!(
            counts,
            ActivityCounts {
                total: 4,
                today: 1,
                this_week: 2
            }
        );
    }
}
