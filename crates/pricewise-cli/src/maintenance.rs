//! Data management commands: export/import, backup/restore, repair,
//! integrity checks, statistics and reset.

use std::path::Path;

use pricewise_store::{ImportOutcome, LocalStore};

use crate::output;

/// Writes the export payload to `path`, or stdout when `None`.
///
/// # Errors
///
/// Returns an error if the payload cannot be encoded or the file written.
pub(crate) fn run_export(store: &LocalStore, path: Option<&Path>) -> anyhow::Result<()> {
    let payload = store.export()?;
    match path {
        Some(path) => {
            std::fs::write(path, &payload)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
            println!("exported to {}", path.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}

/// Imports an export payload from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or the
/// imported collections cannot be written.
pub(crate) fn run_import(store: &mut LocalStore, json: bool, path: &Path) -> anyhow::Result<()> {
    let payload = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let report = store.import(&payload)?;
    if json {
        return output::print_json(&report);
    }
    for (collection, outcome) in &report.collections {
        match outcome {
            ImportOutcome::Imported { count } => println!("{collection:<16} imported {count}"),
            ImportOutcome::Rejected { reason } => println!("{collection:<16} rejected: {reason}"),
            ImportOutcome::Skipped => println!("{collection:<16} not in file"),
        }
    }
    Ok(())
}

pub(crate) fn run_backup(store: &LocalStore) -> anyhow::Result<()> {
    let at = store.create_backup()?;
    println!("backup created at {}", output::fmt_time(Some(&at)));
    Ok(())
}

pub(crate) fn run_restore(store: &mut LocalStore) -> anyhow::Result<()> {
    let at = store.restore_backup()?;
    println!("restored backup from {}", output::fmt_time(Some(&at)));
    Ok(())
}

pub(crate) fn run_repair(store: &mut LocalStore, json: bool) -> anyhow::Result<()> {
    let report = store.repair()?;
    if json {
        return output::print_json(&report);
    }
    if !report.changed() {
        println!("nothing to repair");
        return Ok(());
    }
    println!("duplicate favorites removed: {}", report.duplicate_favorites_removed);
    println!("invalid alerts removed:      {}", report.invalid_alerts_removed);
    println!("duplicate alerts removed:    {}", report.duplicate_alerts_removed);
    println!("alert ids assigned:          {}", report.alert_ids_assigned);
    println!("timestamps backfilled:       {}", report.timestamps_backfilled);
    Ok(())
}

/// Prints integrity problems and storage usage. Exits non-zero when
/// problems are found.
///
/// # Errors
///
/// Returns an error if storage cannot be read or issues were found.
pub(crate) fn run_validate(store: &LocalStore, json: bool) -> anyhow::Result<()> {
    let issues = store.validate_integrity();
    let usage = store.storage_usage()?;
    if json {
        output::print_json(&serde_json::json!({ "issues": issues, "usage": usage }))?;
    } else {
        for key in &usage.keys {
            println!("{:<18} {:>8} bytes  {:>4} items", key.key, key.bytes, key.items);
        }
        println!("{:<18} {:>8} bytes", "total", usage.total_bytes);
        println!();
        if issues.is_empty() {
            println!("no integrity issues");
        }
        for issue in &issues {
            println!("- {issue}");
        }
    }
    if !issues.is_empty() {
        anyhow::bail!("{} integrity issue(s) found; run `pricewise repair`", issues.len());
    }
    Ok(())
}

pub(crate) fn run_optimize(store: &mut LocalStore) -> anyhow::Result<()> {
    let report = store.optimize_storage()?;
    println!(
        "storage {} -> {} bytes ({} recently viewed entries evicted)",
        report.before_bytes, report.after_bytes, report.recent_removed
    );
    Ok(())
}

pub(crate) fn run_stats(store: &LocalStore, json: bool) -> anyhow::Result<()> {
    let stats = store.statistics();
    let categories = store.most_viewed_categories(5);
    let brands = store.top_brands(5);
    if json {
        return output::print_json(&serde_json::json!({
            "statistics": stats,
            "most_viewed_categories": categories,
            "top_brands": brands,
        }));
    }

    println!(
        "favorites        {:>4} total  {:>3} today  {:>3} this week",
        stats.favorites.total, stats.favorites.today, stats.favorites.this_week
    );
    println!(
        "recently viewed  {:>4} total  {:>3} today  {:>3} this week",
        stats.recently_viewed.total, stats.recently_viewed.today, stats.recently_viewed.this_week
    );
    println!(
        "price alerts     {:>4} total  {:>3} active {:>3} triggered",
        stats.price_alerts.total, stats.price_alerts.active, stats.price_alerts.triggered
    );
    println!("searches         {:>4}", stats.search_history);
    println!(
        "compare set      {:>4} of {}",
        stats.compare.current, stats.compare.capacity
    );
    if !categories.is_empty() {
        println!();
        println!("most viewed categories:");
        for c in &categories {
            println!("  {:<24} {}", c.category, c.count);
        }
    }
    if !brands.is_empty() {
        println!();
        println!("top brands:");
        for b in &brands {
            println!("  {:<24} {}", b.brand, b.count);
        }
    }
    Ok(())
}

/// Clears every collection. Requires `confirmed`.
///
/// # Errors
///
/// Returns an error without touching anything when not confirmed, or if
/// storage cannot be cleared.
pub(crate) fn run_reset(store: &mut LocalStore, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("reset deletes all favorites, alerts and history; re-run with --yes");
    }
    store.reset_to_defaults()?;
    println!("all collections cleared and preferences reset");
    Ok(())
}
