pub mod aggregator;
pub mod client;
pub mod error;
pub mod fallback;
pub mod filters;
pub mod normalize;
mod retry;
pub mod sources;
pub mod synthesizer;

pub use aggregator::{dedup_products, Aggregator, ApiStatus, SearchResults};
pub use client::CatalogClient;
pub use error::CatalogError;
pub use fallback::{fallback_catalog, fallback_products};
pub use filters::{sort_products, SearchFilters};
pub use sources::{
    fetch_or_empty, CatalogSource, DummyJsonSource, FakeStoreSource, PlatziSource, SourceOutcome,
    SourceReport,
};
pub use synthesizer::{OfferSynthesizer, PricePoint};
