//! Catalog command handlers: search, trending, category listing, product
//! details and simulated price history.
//!
//! Every listing honours the user's stored `min_rating` and `sort_by`
//! preferences unless overridden on the command line.

use clap::Args;
use pricewise_catalog::{Aggregator, SearchFilters, SearchResults};
use pricewise_core::SortMode;
use pricewise_store::{LocalStore, UserPreferences};

use crate::output;

/// Narrowing and ordering options shared by the listing commands.
#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// Keep only products whose category contains this text
    #[arg(long)]
    pub category: Option<String>,
    /// Minimum best-deal price
    #[arg(long)]
    pub min_price: Option<f64>,
    /// Maximum best-deal price
    #[arg(long)]
    pub max_price: Option<f64>,
    /// Minimum product rating (defaults to the stored preference)
    #[arg(long)]
    pub min_rating: Option<f64>,
    /// Keep only products whose best deal is in stock
    #[arg(long)]
    pub in_stock: bool,
    /// relevance, price-low, price-high, rating, discount or name
    #[arg(long)]
    pub sort: Option<SortMode>,
}

impl FilterArgs {
    pub(crate) fn to_filters(&self, prefs: &UserPreferences) -> SearchFilters {
        let min_rating = self
            .min_rating
            .or((prefs.min_rating > 0.0).then_some(prefs.min_rating));
        SearchFilters {
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_rating,
            in_stock_only: self.in_stock,
            sort: self.sort.unwrap_or(prefs.sort_by),
        }
    }
}

fn emit(json: bool, mut results: SearchResults, filters: &SearchFilters) -> anyhow::Result<()> {
    results.products = filters.apply(results.products);
    if json {
        return output::print_json(&results);
    }
    output::print_results(&results);
    Ok(())
}

/// Searches every catalog and records the query in the search history.
///
/// # Errors
///
/// Returns an error if the search history cannot be written or the output
/// cannot be encoded.
pub(crate) async fn run_search(
    aggregator: &Aggregator,
    store: &mut LocalStore,
    json: bool,
    query: &str,
    limit: usize,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters(store.preferences());
    let results = aggregator.search(query, limit).await;
    if let Err(e) = store.add_search(query) {
        tracing::warn!(error = %e, "could not record search history");
    }
    emit(json, results, &filters)
}

pub(crate) async fn run_trending(
    aggregator: &Aggregator,
    store: &LocalStore,
    json: bool,
    limit: usize,
) -> anyhow::Result<()> {
    let results = aggregator.trending(limit).await;
    // Trending keeps its shuffled order unless asked otherwise.
    let filters = SearchFilters {
        min_rating: Some(store.preferences().min_rating).filter(|r| *r > 0.0),
        ..SearchFilters::default()
    };
    emit(json, results, &filters)
}

pub(crate) async fn run_category(
    aggregator: &Aggregator,
    store: &LocalStore,
    json: bool,
    category: &str,
    limit: usize,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters(store.preferences());
    let results = aggregator.by_category(category, limit).await;
    emit(json, results, &filters)
}

/// Shows one product with its store offers and, unless `record` is off,
/// adds it to the recently-viewed trail.
///
/// # Errors
///
/// Returns an error if the product cannot be found.
pub(crate) async fn run_details(
    aggregator: &Aggregator,
    store: &mut LocalStore,
    json: bool,
    id: &str,
    record: bool,
) -> anyhow::Result<()> {
    let item = aggregator
        .product_details(id)
        .await
        .ok_or_else(|| anyhow::anyhow!("product '{id}' not found"))?;

    if record {
        if let Err(e) = store.add_recently_viewed(&item.product) {
            tracing::warn!(id, error = %e, "could not record recently viewed product");
        }
    }

    if json {
        return output::print_json(&item);
    }
    output::print_details(&item);
    if store.is_favorite(&item.product.id) {
        println!("\u{2665} in favorites");
    }
    if store.is_in_compare(&item.product.id) {
        println!("\u{2696} in compare set");
    }
    Ok(())
}

/// Prints a simulated daily price series for one product.
///
/// # Errors
///
/// Returns an error if the product cannot be found.
pub(crate) async fn run_history(
    aggregator: &Aggregator,
    json: bool,
    id: &str,
    days: u32,
) -> anyhow::Result<()> {
    let item = aggregator
        .product_details(id)
        .await
        .ok_or_else(|| anyhow::anyhow!("product '{id}' not found"))?;
    let history = aggregator
        .synthesizer()
        .price_history(&item.product, days);

    if json {
        return output::print_json(&history);
    }
    println!("{} ({})", item.product.title, item.product.id);
    for point in &history {
        println!("{}  {:>10}", point.date, output::fmt_price(point.price));
    }
    if let (Some(low), Some(high)) = (
        history.iter().map(|p| p.price).reduce(f64::min),
        history.iter().map(|p| p.price).reduce(f64::max),
    ) {
        println!();
        println!(
            "low {}  high {}",
            output::fmt_price(low),
            output::fmt_price(high)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_fall_back_to_stored_preferences() {
        let prefs = UserPreferences {
            min_rating: 4.0,
            sort_by: SortMode::PriceLow,
            ..UserPreferences::default()
        };
        let filters = FilterArgs::default().to_filters(&prefs);
        assert_eq!(filters.min_rating, Some(4.0));
        assert_eq!(filters.sort, SortMode::PriceLow);
    }

    #[test]
    fn explicit_flags_override_preferences() {
        let prefs = UserPreferences {
            min_rating: 4.0,
            ..UserPreferences::default()
        };
        let args = FilterArgs {
            min_rating: Some(2.5),
            sort: Some(SortMode::Rating),
            in_stock: true,
            ..FilterArgs::default()
        };
        let filters = args.to_filters(&prefs);
        assert_eq!(filters.min_rating, Some(2.5));
        assert_eq!(filters.sort, SortMode::Rating);
        assert!(filters.in_stock_only);
    }

    #[test]
    fn zero_rating_preference_means_no_minimum() {
        let filters = FilterArgs::default().to_filters(&UserPreferences::default());
        assert_eq!(filters.min_rating, None);
        assert_eq!(filters.sort, SortMode::Relevance);
    }
}
