//! Concurrent fan-out over every registered catalog source.
//!
//! All sources are started together and awaited until each has resolved or
//! timed out; results are then concatenated in registration order, so the
//! merged list does not depend on which source answered first. A call
//! succeeds as long as one source returned data. When none did, the
//! embedded fallback catalog is served with [`ApiStatus::Offline`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use pricewise_core::{split_source_id, AppConfig, EnrichedProduct, Product, StoreProfile};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::fallback::{fallback_catalog, fallback_products};
use crate::sources::{
    fetch_with_report, CatalogSource, DummyJsonSource, FakeStoreSource, PlatziSource,
    SourceReport,
};
use crate::synthesizer::OfferSynthesizer;

/// Products requested from the sources for [`Aggregator::trending`].
pub const TRENDING_POOL: usize = 50;
/// Products requested per source for [`Aggregator::by_category`].
pub const CATEGORY_POOL: usize = 30;

/// Whether the last aggregation used live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    /// Every source answered.
    Online,
    /// Some sources failed but live data was returned.
    Limited,
    /// No source returned data; the fallback catalog was served.
    Offline,
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiStatus::Online => write!(f, "online"),
            ApiStatus::Limited => write!(f, "limited"),
            ApiStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Result of one aggregation call. Owned by the caller; the aggregator keeps
/// no per-call state.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub products: Vec<EnrichedProduct>,
    pub status: ApiStatus,
    pub sources: Vec<SourceReport>,
}

impl SearchResults {
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.status == ApiStatus::Offline
    }
}

pub struct Aggregator {
    sources: Vec<Arc<dyn CatalogSource>>,
    synthesizer: OfferSynthesizer,
    fetch_timeout: Duration,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn CatalogSource>>,
        synthesizer: OfferSynthesizer,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            synthesizer,
            fetch_timeout,
        }
    }

    /// Registers the three public catalogs (FakeStore, DummyJSON, Platzi),
    /// in that order, against the configured base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        roster: Vec<StoreProfile>,
    ) -> Result<Self, CatalogError> {
        let client = CatalogClient::new(
            config.fetch_timeout_secs,
            &config.user_agent,
            config.fetch_max_retries,
            config.fetch_backoff_base_ms,
        )?;
        let sources: Vec<Arc<dyn CatalogSource>> = vec![
            Arc::new(FakeStoreSource::new(client.clone(), &config.fakestore_url)),
            Arc::new(DummyJsonSource::new(client.clone(), &config.dummyjson_url)),
            Arc::new(PlatziSource::new(client, &config.platzi_url)),
        ];
        Ok(Self::new(
            sources,
            OfferSynthesizer::new(roster),
            Duration::from_secs(config.fetch_timeout_secs),
        ))
    }

    #[must_use]
    pub fn synthesizer(&self) -> &OfferSynthesizer {
        &self.synthesizer
    }

    /// Searches every source for `query` and returns at most `limit`
    /// deduplicated, enriched products.
    pub async fn search(&self, query: &str, limit: usize) -> SearchResults {
        let query = query.trim();
        if limit == 0 {
            return SearchResults {
                products: Vec::new(),
                status: ApiStatus::Online,
                sources: Vec::new(),
            };
        }

        let per_source = self.sub_limit(limit);
        let (merged, reports) = self.collect(query, per_source).await;
        let (mut products, status) = if merged.is_empty() {
            tracing::warn!(query, "no catalog source returned data, serving fallback catalog");
            (fallback_products(query), ApiStatus::Offline)
        } else {
            (merged, status_from(&reports))
        };
        products.truncate(limit);

        tracing::info!(query, count = products.len(), %status, "search complete");
        self.finish(products, status, reports)
    }

    /// Highest-rated products across all sources, shuffled so repeated calls
    /// do not return an identical ordering.
    pub async fn trending(&self, limit: usize) -> SearchResults {
        if limit == 0 {
            return SearchResults {
                products: Vec::new(),
                status: ApiStatus::Online,
                sources: Vec::new(),
            };
        }

        let per_source = TRENDING_POOL.max(limit).div_ceil(self.sources.len().max(1));
        let (merged, reports) = self.collect("", per_source).await;
        let (pool, status) = if merged.is_empty() {
            tracing::warn!("no catalog source returned data, serving fallback trending list");
            (fallback_catalog(), ApiStatus::Offline)
        } else {
            (merged, status_from(&reports))
        };

        let products = rank_and_shuffle(pool, limit);
        tracing::info!(count = products.len(), %status, "trending complete");
        self.finish(products, status, reports)
    }

    /// Products whose category contains `category` (case-insensitive).
    pub async fn by_category(&self, category: &str, limit: usize) -> SearchResults {
        let category = category.trim();
        if limit == 0 {
            return SearchResults {
                products: Vec::new(),
                status: ApiStatus::Online,
                sources: Vec::new(),
            };
        }

        let (merged, reports) = self.collect("", CATEGORY_POOL).await;
        let matching: Vec<Product> = merged
            .into_iter()
            .filter(|p| p.in_category(category))
            .collect();
        let (mut products, status) = if matching.is_empty() {
            tracing::warn!(category, "no live products in category, serving fallback catalog");
            let fallback = fallback_catalog()
                .into_iter()
                .filter(|p| p.in_category(category))
                .collect();
            (fallback, ApiStatus::Offline)
        } else {
            (matching, status_from(&reports))
        };
        products.truncate(limit);

        tracing::info!(category, count = products.len(), %status, "category listing complete");
        self.finish(products, status, reports)
    }

    /// Looks up one product by its source-prefixed id (`fs_3`, `dj_17`,
    /// `platzi_42`, `fallback_1`) and enriches it.
    ///
    /// Unknown prefixes, unknown ids and upstream failures all yield `None`.
    pub async fn product_details(&self, id: &str) -> Option<EnrichedProduct> {
        let id = id.trim();
        let Some((tag, raw_id)) = split_source_id(id) else {
            tracing::warn!(id, "product id has no source prefix");
            return None;
        };

        if tag == "fallback" {
            return fallback_catalog()
                .into_iter()
                .find(|p| p.has_id(id))
                .map(|p| self.synthesizer.enrich(p));
        }

        let Some(source) = self.sources.iter().find(|s| s.tag() == tag) else {
            tracing::warn!(id, tag, "unknown product source");
            return None;
        };

        match tokio::time::timeout(self.fetch_timeout, source.fetch_product(raw_id)).await {
            Ok(Ok(Some(product))) => Some(self.synthesizer.enrich(product)),
            Ok(Ok(None)) => {
                tracing::info!(id, source = source.name(), "product not found");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(id, source = source.name(), error = %e, "product lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(id, source = source.name(), "product lookup timed out");
                None
            }
        }
    }

    fn sub_limit(&self, limit: usize) -> usize {
        limit.div_ceil(self.sources.len().max(1))
    }

    /// Runs every source concurrently and merges what came back.
    async fn collect(&self, query: &str, per_source: usize) -> (Vec<Product>, Vec<SourceReport>) {
        let fetches = self
            .sources
            .iter()
            .map(|s| fetch_with_report(s.as_ref(), query, per_source, self.fetch_timeout));
        let settled = join_all(fetches).await;

        let mut reports = Vec::with_capacity(settled.len());
        let mut merged = Vec::new();
        for (products, report) in settled {
            merged.extend(products);
            reports.push(report);
        }
        (dedup_products(merged), reports)
    }

    fn finish(
        &self,
        products: Vec<Product>,
        status: ApiStatus,
        sources: Vec<SourceReport>,
    ) -> SearchResults {
        let products = products
            .into_iter()
            .map(|p| self.synthesizer.enrich(p))
            .collect();
        SearchResults {
            products,
            status,
            sources,
        }
    }
}

/// Drops every product whose [`Product::dedup_key`] was already seen,
/// keeping the first occurrence.
#[must_use]
pub fn dedup_products(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

fn status_from(reports: &[SourceReport]) -> ApiStatus {
    if reports.iter().all(SourceReport::succeeded) {
        ApiStatus::Online
    } else {
        ApiStatus::Limited
    }
}

/// Keeps the `limit * 2` best-rated products, shuffles them and returns
/// `limit` of them.
fn rank_and_shuffle(mut pool: Vec<Product>, limit: usize) -> Vec<Product> {
    pool.sort_by(|a, b| b.rating.rate.total_cmp(&a.rating.rate));
    pool.truncate(limit.saturating_mul(2));
    pool.shuffle(&mut rand::rng());
    pool.truncate(limit);
    pool
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
