//! Upstream catalog sources.
//!
//! Each source owns its raw response types and the normalization into the
//! canonical [`Product`]. Ids are prefixed with the source's short tag so
//! they stay unique once several catalogs are merged.

mod dummyjson;
mod fakestore;
mod platzi;

use std::time::Duration;

use async_trait::async_trait;
use pricewise_core::Product;
use serde::Serialize;

use crate::error::CatalogError;

pub use dummyjson::DummyJsonSource;
pub use fakestore::FakeStoreSource;
pub use platzi::PlatziSource;

/// One upstream product catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short id prefix, e.g. `"fs"`; products are returned as `"fs_<id>"`.
    fn tag(&self) -> &'static str;

    /// Human-readable name used in logs and on products.
    fn name(&self) -> &'static str;

    /// Fetches up to `limit` products matching `query` (empty matches all).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on transport, status or decoding failure.
    async fn fetch_products(&self, query: &str, limit: usize)
        -> Result<Vec<Product>, CatalogError>;

    /// Fetches one product by its upstream id (without the tag prefix).
    /// `Ok(None)` means the catalog does not know the id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on transport, status or decoding failure.
    async fn fetch_product(&self, raw_id: &str) -> Result<Option<Product>, CatalogError>;
}

/// How one source fared during an aggregation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SourceOutcome {
    Succeeded { count: usize },
    Failed { reason: String },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Succeeded { .. })
    }
}

/// Runs one source under `timeout`, never failing outward.
///
/// Errors and timeouts are logged and reported as an empty product list plus
/// a non-success [`SourceReport`].
pub(crate) async fn fetch_with_report(
    source: &dyn CatalogSource,
    query: &str,
    limit: usize,
    timeout: Duration,
) -> (Vec<Product>, SourceReport) {
    let name = source.name();
    let outcome = tokio::time::timeout(timeout, source.fetch_products(query, limit)).await;

    match outcome {
        Ok(Ok(products)) => {
            tracing::debug!(
                source = name,
                count = products.len(),
                "collected catalog products"
            );
            let report = SourceReport {
                source: name.to_string(),
                outcome: SourceOutcome::Succeeded {
                    count: products.len(),
                },
            };
            (products, report)
        }
        Ok(Err(e)) => {
            tracing::warn!(source = name, error = %e, "catalog fetch failed");
            let report = SourceReport {
                source: name.to_string(),
                outcome: SourceOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            (Vec::new(), report)
        }
        Err(_) => {
            let err = CatalogError::Timeout {
                source_name: name.to_string(),
                timeout_secs: timeout.as_secs(),
            };
            tracing::warn!(source = name, error = %err, "catalog fetch timed out");
            let report = SourceReport {
                source: name.to_string(),
                outcome: SourceOutcome::TimedOut,
            };
            (Vec::new(), report)
        }
    }
}

/// Fetches from one source, returning an empty list on any failure.
pub async fn fetch_or_empty(
    source: &dyn CatalogSource,
    query: &str,
    limit: usize,
    timeout: Duration,
) -> Vec<Product> {
    fetch_with_report(source, query, limit, timeout).await.0
}

/// Normalizes each raw item, dropping (and logging) the ones that fail.
pub(crate) fn normalize_all<T, F>(source_name: &str, raw: Vec<T>, normalize: F) -> Vec<Product>
where
    F: Fn(T) -> Result<Product, CatalogError>,
{
    raw.into_iter()
        .filter_map(|item| match normalize(item) {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::debug!(source = source_name, error = %e, "skipping unusable product");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        result: fn() -> Result<Vec<Product>, CatalogError>,
        delay: Duration,
    }

    #[async_trait]
    impl CatalogSource for StaticSource {
        fn tag(&self) -> &'static str {
            "st"
        }

        fn name(&self) -> &'static str {
            "Static"
        }

        async fn fetch_products(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Product>, CatalogError> {
            tokio::time::sleep(self.delay).await;
            (self.result)()
        }

        async fn fetch_product(&self, _raw_id: &str) -> Result<Option<Product>, CatalogError> {
            Ok(None)
        }
    }

    fn one_product() -> Result<Vec<Product>, CatalogError> {
        Ok(vec![Product {
            id: "st_1".to_string(),
            title: "Thing".to_string(),
            price: 1.0,
            original_price: None,
            category: String::new(),
            description: String::new(),
            rating: pricewise_core::Rating::default(),
            brand: None,
            image: String::new(),
            source: "Static".to_string(),
        }])
    }

    fn failing() -> Result<Vec<Product>, CatalogError> {
        Err(CatalogError::UnexpectedStatus {
            status: 500,
            url: "http://static".to_string(),
        })
    }

    #[tokio::test]
    async fn fetch_with_report_records_success() {
        let source = StaticSource {
            result: one_product,
            delay: Duration::ZERO,
        };
        let (products, report) =
            fetch_with_report(&source, "", 5, Duration::from_secs(1)).await;
        assert_eq!(products.len(), 1);
        assert_eq!(report.outcome, SourceOutcome::Succeeded { count: 1 });
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn fetch_with_report_swallows_errors() {
        let source = StaticSource {
            result: failing,
            delay: Duration::ZERO,
        };
        let (products, report) =
            fetch_with_report(&source, "", 5, Duration::from_secs(1)).await;
        assert!(products.is_empty());
        assert!(matches!(report.outcome, SourceOutcome::Failed { ref reason } if reason.contains("500")));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_with_report_times_out() {
        let source = StaticSource {
            result: one_product,
            delay: Duration::from_secs(30),
        };
        let products = fetch_or_empty(&source, "", 5, Duration::from_secs(2)).await;
        assert!(products.is_empty());
        let (_, report) = fetch_with_report(&source, "", 5, Duration::from_secs(2)).await;
        assert_eq!(report.outcome, SourceOutcome::TimedOut);
    }
}
