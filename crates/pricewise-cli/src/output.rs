//! Terminal rendering shared by the command handlers.

use chrono::{DateTime, Utc};
use pricewise_catalog::{SearchResults, SourceOutcome};
use pricewise_core::{EnrichedProduct, Product};
use serde::Serialize;

/// Pretty-prints `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn fmt_price(price: f64) -> String {
    format!("${price:.2}")
}

/// Format an optional timestamp for display, returning `"—"` when `None`.
pub(crate) fn fmt_time(at: Option<&DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('\u{2026}');
    cut
}

pub(crate) fn print_product_row(product: &Product) {
    println!(
        "{:<14} {:<44} {:>10}  {:>3.1}\u{2605}  {}",
        product.id,
        truncate(&product.title, 44),
        fmt_price(product.price),
        product.rating.rate,
        product.category
    );
}

pub(crate) fn print_products(products: &[EnrichedProduct]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    println!(
        "{:<14} {:<44} {:>10}  {:>4}  {:>6}  {:<16} STORES",
        "ID", "TITLE", "BEST", "RATE", "SAVE", "BEST DEAL"
    );
    for item in products {
        let p = &item.product;
        println!(
            "{:<14} {:<44} {:>10}  {:>4.1}  {:>5}%  {:<16} {}",
            p.id,
            truncate(&p.title, 44),
            fmt_price(p.price),
            p.rating.rate,
            item.discount,
            truncate(&item.best_deal.store, 16),
            item.total_stores()
        );
    }
}

/// Prints the result list followed by the status line and any failed
/// sources.
pub(crate) fn print_results(results: &SearchResults) {
    print_products(&results.products);
    println!();
    println!("status: {}", results.status);
    for report in &results.sources {
        match &report.outcome {
            SourceOutcome::Succeeded { .. } => {}
            SourceOutcome::Failed { reason } => {
                println!("  {} unavailable: {reason}", report.source);
            }
            SourceOutcome::TimedOut => println!("  {} timed out", report.source),
        }
    }
    if results.used_fallback() {
        println!("  showing built-in sample data");
    }
}

pub(crate) fn print_details(item: &EnrichedProduct) {
    let p = &item.product;
    println!("{}  ({})", p.title, p.id);
    if let Some(brand) = &p.brand {
        println!("brand:    {brand}");
    }
    println!("category: {}", p.category);
    println!(
        "rating:   {:.1} ({} reviews)",
        p.rating.rate, p.rating.count
    );
    println!("source:   {}", p.source);
    if !p.description.is_empty() {
        println!();
        println!("{}", p.description);
    }
    println!();
    println!("{:<16} {:>10}  {:<14} {:<22} RATING", "STORE", "PRICE", "AVAILABILITY", "SHIPPING");
    for offer in &item.store_offers {
        println!(
            "{:<16} {:>10}  {:<14} {:<22} {:.1}",
            offer.store,
            fmt_price(offer.price),
            offer.availability.to_string(),
            offer.shipping,
            offer.rating
        );
    }
    println!();
    println!(
        "best deal: {} at {}, save {} ({}%)",
        fmt_price(item.best_deal.price),
        item.best_deal.store,
        fmt_price(item.savings),
        item.discount
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 6), "a ver\u{2026}");
    }

    #[test]
    fn fmt_time_handles_missing_values() {
        assert_eq!(fmt_time(None), "\u{2014}");
        let t: DateTime<Utc> = "2026-03-04T05:06:07Z".parse().unwrap();
        assert_eq!(fmt_time(Some(&t)), "2026-03-04 05:06");
    }

    #[test]
    fn fmt_price_uses_two_decimals() {
        assert_eq!(fmt_price(5.0), "$5.00");
        assert_eq!(fmt_price(1234.567), "$1234.57");
    }
}
