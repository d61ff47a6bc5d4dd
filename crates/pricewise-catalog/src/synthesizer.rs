//! Simulated multi-store price comparison.
//!
//! Offers are intentionally randomized: each product gets 3-5 distinct
//! retailers from the roster, each quoting `base × multiplier × jitter`
//! with `jitter ∈ [0.9, 1.1]`.

use chrono::{Duration, NaiveDate, Utc};
use pricewise_core::{
    default_store_roster, round_cents, Availability, EnrichedProduct, Product, StoreOffer,
    StoreProfile,
};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

const MIN_OFFERS: usize = 3;
const MAX_OFFERS: usize = 5;

const SHIPPING_OPTIONS: [&str; 6] = [
    "Free Shipping",
    "Free 2-Day Shipping",
    "$4.99 Shipping",
    "$7.99 Shipping",
    "Free Pickup",
    "Same Day Delivery",
];

/// One day of simulated price history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct OfferSynthesizer {
    roster: Vec<StoreProfile>,
}

impl Default for OfferSynthesizer {
    fn default() -> Self {
        Self::new(default_store_roster())
    }
}

impl OfferSynthesizer {
    /// Builds a synthesizer over `roster`; an empty roster falls back to the
    /// built-in one.
    #[must_use]
    pub fn new(roster: Vec<StoreProfile>) -> Self {
        let roster = if roster.is_empty() {
            default_store_roster()
        } else {
            roster
        };
        Self { roster }
    }

    #[must_use]
    pub fn roster(&self) -> &[StoreProfile] {
        &self.roster
    }

    /// Enriches `product` using the thread-local RNG.
    #[must_use]
    pub fn enrich(&self, product: Product) -> EnrichedProduct {
        self.enrich_with(product, &mut rand::rng())
    }

    /// Enriches `product` with offers drawn from `rng`.
    ///
    /// `store_offers` is sorted ascending by price, `best_deal` is the first
    /// offer, `product.price` becomes the best price and
    /// `product.original_price` the worst.
    pub fn enrich_with<R: Rng + ?Sized>(&self, mut product: Product, rng: &mut R) -> EnrichedProduct {
        let base = product.price;
        let upper = MAX_OFFERS.min(self.roster.len());
        let lower = MIN_OFFERS.min(upper);
        let count = rng.random_range(lower..=upper);

        let mut offers: Vec<StoreOffer> = self
            .roster
            .choose_multiple(rng, count)
            .collect::<Vec<_>>()
            .into_iter()
            .map(|store| synthesize_offer(store, base, rng))
            .collect();
        offers.sort_by(|a, b| a.price.total_cmp(&b.price));

        // The roster is never empty, so at least one offer exists.
        let Some(best_deal) = offers.first().cloned() else {
            return EnrichedProduct {
                best_deal: fallback_offer(base),
                product,
                store_offers: Vec::new(),
                discount: 0,
                savings: 0.0,
            };
        };
        let best = best_deal.price;
        let worst = offers.last().map_or(best, |o| o.price);

        product.price = best;
        product.original_price = Some(worst);

        EnrichedProduct {
            product,
            store_offers: offers,
            best_deal,
            discount: discount_percent(best, worst),
            savings: round_cents(worst - best),
        }
    }

    /// Simulated daily price history for the last `days` days, oldest first,
    /// including today (`days + 1` points). Each point varies ±10 % around the
    /// product's current price.
    #[must_use]
    pub fn price_history(&self, product: &Product, days: u32) -> Vec<PricePoint> {
        price_history_with(product, days, Utc::now().date_naive(), &mut rand::rng())
    }
}

pub(crate) fn price_history_with<R: Rng + ?Sized>(
    product: &Product,
    days: u32,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<PricePoint> {
    (0..=days)
        .rev()
        .map(|offset| {
            let variation = rng.random_range(-0.1..=0.1);
            PricePoint {
                date: today - Duration::days(i64::from(offset)),
                price: round_cents(product.price * (1.0 + variation)),
            }
        })
        .collect()
}

fn synthesize_offer<R: Rng + ?Sized>(store: &StoreProfile, base: f64, rng: &mut R) -> StoreOffer {
    let jitter = rng.random_range(0.9..=1.1);
    let availability = if rng.random_bool(store.reliability.clamp(0.0, 1.0)) {
        Availability::InStock
    } else {
        Availability::Limited
    };
    let shipping = SHIPPING_OPTIONS
        .choose(rng)
        .copied()
        .unwrap_or(SHIPPING_OPTIONS[0])
        .to_string();
    let rating = (rng.random_range(4.0..=5.0_f64) * 10.0).round() / 10.0;

    StoreOffer {
        store: store.name.clone(),
        price: round_cents(base * store.price_multiplier * jitter),
        availability,
        shipping,
        rating,
    }
}

fn fallback_offer(base: f64) -> StoreOffer {
    StoreOffer {
        store: "Marketplace".to_string(),
        price: round_cents(base),
        availability: Availability::Limited,
        shipping: SHIPPING_OPTIONS[0].to_string(),
        rating: 0.0,
    }
}

/// Whole-number percentage between `worst` and `best`; `0` when `worst` is 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn discount_percent(best: f64, worst: f64) -> u32 {
    if worst <= 0.0 {
        return 0;
    }
    ((worst - best) / worst * 100.0).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pricewise_core::Rating;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn product(price: f64) -> Product {
        Product {
            id: "dj_7".to_string(),
            title: "Wireless Earbuds".to_string(),
            price,
            original_price: None,
            category: "electronics".to_string(),
            description: String::new(),
            rating: Rating::new(4.2, 80),
            brand: None,
            image: String::new(),
            source: "DummyJSON API".to_string(),
        }
    }

    #[test]
    fn enrich_produces_three_to_five_distinct_sorted_offers() {
        let synth = OfferSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let enriched = synth.enrich_with(product(100.0), &mut rng);
            let n = enriched.store_offers.len();
            assert!((3..=5).contains(&n), "got {n} offers");

            let names: HashSet<_> = enriched.store_offers.iter().map(|o| &o.store).collect();
            assert_eq!(names.len(), n);

            assert!(enriched
                .store_offers
                .windows(2)
                .all(|w| w[0].price <= w[1].price));
        }
    }

    #[test]
    fn enrich_sets_best_worst_discount_and_savings() {
        let synth = OfferSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(42);
        let enriched = synth.enrich_with(product(250.0), &mut rng);

        let best = enriched.store_offers.first().unwrap().price;
        let worst = enriched.store_offers.last().unwrap().price;
        assert_eq!(enriched.best_deal, enriched.store_offers[0]);
        assert!((enriched.product.price - best).abs() < f64::EPSILON);
        assert_eq!(enriched.product.original_price, Some(worst));
        assert!((enriched.savings - round_cents(worst - best)).abs() < 1e-9);
        assert_eq!(enriched.discount, discount_percent(best, worst));
        assert_eq!(enriched.total_stores(), enriched.store_offers.len());
    }

    #[test]
    fn offer_prices_stay_within_multiplier_and_jitter_bounds() {
        let synth = OfferSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let enriched = synth.enrich_with(product(100.0), &mut rng);
            for offer in &enriched.store_offers {
                let store = synth
                    .roster()
                    .iter()
                    .find(|s| s.name == offer.store)
                    .unwrap();
                let low = round_cents(100.0 * store.price_multiplier * 0.9);
                let high = round_cents(100.0 * store.price_multiplier * 1.1);
                assert!(offer.price >= low - 0.01 && offer.price <= high + 0.01);
                assert!((4.0..=5.0).contains(&offer.rating));
            }
        }
    }

    #[test]
    fn fully_reliable_store_is_always_in_stock() {
        let roster: Vec<StoreProfile> = (0..5)
            .map(|i| StoreProfile {
                name: format!("Store {i}"),
                price_multiplier: 1.0,
                reliability: 1.0,
            })
            .collect();
        let synth = OfferSynthesizer::new(roster);
        let mut rng = StdRng::seed_from_u64(11);
        let enriched = synth.enrich_with(product(10.0), &mut rng);
        assert!(enriched
            .store_offers
            .iter()
            .all(|o| o.availability == Availability::InStock));
    }

    #[test]
    fn empty_roster_falls_back_to_default() {
        let synth = OfferSynthesizer::new(Vec::new());
        assert_eq!(synth.roster().len(), default_store_roster().len());
    }

    #[test]
    fn zero_priced_product_has_no_discount() {
        let synth = OfferSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(1);
        let enriched = synth.enrich_with(product(0.0), &mut rng);
        assert_eq!(enriched.discount, 0);
        assert!(enriched.savings.abs() < f64::EPSILON);
    }

    #[test]
    fn discount_percent_rounds() {
        assert_eq!(discount_percent(80.0, 100.0), 20);
        assert_eq!(discount_percent(66.5, 100.0), 34);
        assert_eq!(discount_percent(5.0, 0.0), 0);
    }

    #[test]
    fn price_history_is_oldest_first_with_days_plus_one_points() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let history = price_history_with(&product(50.0), 7, today, &mut rng);

        assert_eq!(history.len(), 8);
        assert_eq!(history[0].date, NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(history[7].date, today);
        assert!(history.iter().all(|p| p.price >= 44.99 && p.price <= 55.01));
    }
}
