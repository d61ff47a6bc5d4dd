//! Handlers for the user's curated collections: favorites, compare set,
//! recently viewed, price alerts, search history and preferences.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use pricewise_catalog::Aggregator;
use pricewise_core::Product;
use pricewise_store::{spawn_autosave, FavoriteSort, LocalStore, SharedStore};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::output::{self, fmt_price, fmt_time};

/// Sub-commands available under `favorites`.
#[derive(Debug, Subcommand)]
pub enum FavoritesCommands {
    /// List favorites
    List {
        /// newest, oldest, name, price-low, price-high or rating
        #[arg(long, default_value = "newest")]
        sort: FavoriteSort,
        /// Only favorites in this category
        #[arg(long)]
        category: Option<String>,
        /// Only favorites matching this text
        #[arg(long)]
        query: Option<String>,
    },
    /// Look up a product and add it to favorites
    Add { id: String },
    /// Remove a product from favorites
    Remove { id: String },
    /// Products related to a favorite or recently viewed product
    Similar {
        id: String,
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}

/// Sub-commands available under `compare`.
#[derive(Debug, Subcommand)]
pub enum CompareCommands {
    /// Show the compare set side by side
    List,
    /// Look up a product and add it to the compare set
    Add { id: String },
    Remove { id: String },
    Clear,
}

/// Sub-commands available under `viewed`.
#[derive(Debug, Subcommand)]
pub enum ViewedCommands {
    /// Recently viewed products, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Products you viewed but have not favorited
    Recommend {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    Clear,
    /// Evict entries past the age limit or beyond capacity
    Cleanup,
}

/// Sub-commands available under `alerts`.
#[derive(Debug, Subcommand)]
pub enum AlertsCommands {
    /// List price alerts
    List {
        /// Only alerts still waiting to trigger
        #[arg(long, conflicts_with = "triggered")]
        active: bool,
        /// Only alerts that have triggered
        #[arg(long)]
        triggered: bool,
    },
    /// Alert when a product drops to a target price
    Add {
        id: String,
        target: f64,
    },
    /// Remove an alert by alert id or product id
    Remove { id: String },
    /// Re-price every product with an active alert and trigger matches
    Check,
    /// Keep checking active alerts until interrupted
    Watch {
        /// Seconds between checks
        #[arg(long, default_value = "300")]
        interval: u64,
    },
}

/// Sub-commands available under `searches`.
#[derive(Debug, Subcommand)]
pub enum SearchesCommands {
    List,
    Remove { query: String },
    Clear,
}

/// Sub-commands available under `prefs`.
#[derive(Debug, Subcommand)]
pub enum PrefsCommands {
    Show,
    /// Set one preference; the value is parsed as JSON, falling back to text
    Set { key: String, value: String },
}

async fn lookup(aggregator: &Aggregator, id: &str) -> anyhow::Result<Product> {
    aggregator
        .product_details(id)
        .await
        .map(|item| item.product)
        .ok_or_else(|| anyhow::anyhow!("product '{id}' not found"))
}

pub(crate) async fn run_favorites(
    aggregator: &Aggregator,
    store: &mut LocalStore,
    json: bool,
    command: FavoritesCommands,
) -> anyhow::Result<()> {
    match command {
        FavoritesCommands::List {
            sort,
            category,
            query,
        } => {
            let mut entries = store.sorted_favorites(sort);
            if let Some(category) = category.as_deref() {
                let wanted = store.favorites_by_category(category);
                entries.retain(|e| wanted.iter().any(|w| w.product.id == e.product.id));
            }
            if let Some(query) = query.as_deref() {
                entries.retain(|e| e.product.matches_query(query));
            }
            if json {
                return output::print_json(&entries);
            }
            if entries.is_empty() {
                println!("No favorites yet.");
            }
            for entry in entries {
                output::print_product_row(&entry.product);
            }
        }
        FavoritesCommands::Add { id } => {
            let product = lookup(aggregator, &id).await?;
            if store.add_favorite(&product)? {
                println!("added {} to favorites", product.title);
            } else {
                println!("{} is already a favorite", product.title);
            }
        }
        FavoritesCommands::Remove { id } => {
            if store.remove_favorite(&id)? {
                println!("removed {id} from favorites");
            } else {
                println!("{id} is not a favorite");
            }
        }
        FavoritesCommands::Similar { id, limit } => {
            let similar = store.similar_products(&id, limit);
            if json {
                return output::print_json(&similar);
            }
            if similar.is_empty() {
                println!("Nothing similar among your favorites and recent views.");
            }
            for product in &similar {
                output::print_product_row(product);
            }
        }
    }
    Ok(())
}

pub(crate) async fn run_compare(
    aggregator: &Aggregator,
    store: &mut LocalStore,
    json: bool,
    command: CompareCommands,
) -> anyhow::Result<()> {
    match command {
        CompareCommands::List => {
            let items = store.compare_items();
            if json {
                return output::print_json(items);
            }
            if items.is_empty() {
                println!("The compare set is empty.");
                return Ok(());
            }
            println!("{:<14} {:>10}  {:>6}  {:<14} TITLE", "ID", "PRICE", "RATING", "CATEGORY");
            for entry in items {
                let p = &entry.product;
                println!(
                    "{:<14} {:>10}  {:>6.1}  {:<14} {}",
                    p.id,
                    fmt_price(p.price),
                    p.rating.rate,
                    p.category,
                    p.title
                );
            }
            println!();
            println!("{}/{} slots used", items.len(), pricewise_store::COMPARE_CAPACITY);
        }
        CompareCommands::Add { id } => {
            if store.is_in_compare(&id) {
                println!("{id} is already in the compare set");
                return Ok(());
            }
            if !store.can_add_to_compare() {
                anyhow::bail!(
                    "the compare set is full ({} items); remove one first",
                    pricewise_store::COMPARE_CAPACITY
                );
            }
            let product = lookup(aggregator, &id).await?;
            if store.add_to_compare(&product)? {
                println!("added {} to the compare set", product.title);
            } else {
                println!("{} was not added", product.title);
            }
        }
        CompareCommands::Remove { id } => {
            if store.remove_from_compare(&id)? {
                println!("removed {id} from the compare set");
            } else {
                println!("{id} is not in the compare set");
            }
        }
        CompareCommands::Clear => {
            store.clear_compare()?;
            println!("compare set cleared");
        }
    }
    Ok(())
}

pub(crate) fn run_viewed(
    store: &mut LocalStore,
    json: bool,
    command: ViewedCommands,
) -> anyhow::Result<()> {
    match command {
        ViewedCommands::List { limit } => {
            let entries = store.recently_viewed(limit);
            if json {
                return output::print_json(entries);
            }
            if entries.is_empty() {
                println!("Nothing viewed recently.");
            }
            for entry in entries {
                print!("{}  ", fmt_time(entry.viewed_at.as_ref()));
                output::print_product_row(&entry.product);
            }
        }
        ViewedCommands::Recommend { limit } => {
            let products = store.recommendations(limit);
            if json {
                return output::print_json(&products);
            }
            if products.is_empty() {
                println!("No recommendations yet; view a few products first.");
            }
            for product in &products {
                output::print_product_row(product);
            }
        }
        ViewedCommands::Clear => {
            store.clear_recently_viewed()?;
            println!("recently viewed cleared");
        }
        ViewedCommands::Cleanup => {
            let removed = store.cleanup_recently_viewed()?;
            println!("removed {removed} stale entries");
        }
    }
    Ok(())
}

/// Re-prices each product with an active alert and evaluates its alerts.
/// Returns how many alerts fired.
async fn check_alerts(aggregator: &Aggregator, store: &SharedStore) -> anyhow::Result<usize> {
    let product_ids: BTreeSet<String> = store
        .lock()
        .await
        .active_price_alerts()
        .into_iter()
        .map(|a| a.product_id.clone())
        .collect();

    let mut fired_total = 0;
    for product_id in product_ids {
        let Some(item) = aggregator.product_details(&product_id).await else {
            tracing::warn!(product_id, "could not price product for alert check");
            continue;
        };
        let fired = store
            .lock()
            .await
            .evaluate_price(&product_id, item.product.price)?;
        for alert in &fired {
            println!(
                "\u{1F514} {} is now {} (target {})",
                alert.product_title,
                fmt_price(item.product.price),
                fmt_price(alert.target_price)
            );
        }
        fired_total += fired.len();
    }
    Ok(fired_total)
}

pub(crate) async fn run_alerts(
    aggregator: &Aggregator,
    store: LocalStore,
    json: bool,
    command: AlertsCommands,
    autosave_every: Duration,
) -> anyhow::Result<LocalStore> {
    let shared: SharedStore = Arc::new(Mutex::new(store));
    match command {
        AlertsCommands::List { active, triggered } => {
            let guard = shared.lock().await;
            let alerts: Vec<_> = if active {
                guard.active_price_alerts()
            } else if triggered {
                guard.triggered_price_alerts()
            } else {
                guard.price_alerts().iter().collect()
            };
            if json {
                output::print_json(&alerts)?;
            } else if alerts.is_empty() {
                println!("No price alerts.");
            } else {
                println!("{:<36} {:<14} {:>10}  {:<10} PRODUCT", "ID", "PRODUCT ID", "TARGET", "STATE");
                for alert in alerts {
                    let state = if alert.triggered {
                        "triggered"
                    } else if alert.active {
                        "active"
                    } else {
                        "paused"
                    };
                    println!(
                        "{:<36} {:<14} {:>10}  {:<10} {}",
                        alert.id,
                        alert.product_id,
                        fmt_price(alert.target_price),
                        state,
                        alert.product_title
                    );
                }
            }
        }
        AlertsCommands::Add { id, target } => {
            let title = aggregator
                .product_details(&id)
                .await
                .map(|item| item.product.title);
            let alert = shared
                .lock()
                .await
                .add_price_alert(&id, target, title.as_deref())?
                .ok_or_else(|| anyhow::anyhow!("invalid alert: target must be a positive price"))?;
            println!(
                "alert {} set for {} at {}",
                alert.id,
                alert.product_title,
                fmt_price(alert.target_price)
            );
        }
        AlertsCommands::Remove { id } => {
            if shared.lock().await.remove_price_alert(&id)? {
                println!("removed alert {id}");
            } else {
                println!("no alert matches {id}");
            }
        }
        AlertsCommands::Check => {
            let fired = check_alerts(aggregator, &shared).await?;
            println!("{fired} alert(s) triggered");
        }
        AlertsCommands::Watch { interval } => {
            watch_alerts(aggregator, &shared, Duration::from_secs(interval.max(1)), autosave_every)
                .await?;
        }
    }

    let store = Arc::try_unwrap(shared)
        .map_err(|_| anyhow::anyhow!("store is still shared after alerts command"))?
        .into_inner();
    Ok(store)
}

async fn watch_alerts(
    aggregator: &Aggregator,
    store: &SharedStore,
    every: Duration,
    autosave_every: Duration,
) -> anyhow::Result<()> {
    let autosave = spawn_autosave(Arc::clone(store), autosave_every);
    let mut ticker = tokio::time::interval(every);
    tracing::info!(interval_secs = every.as_secs(), "watching price alerts");

    let shutdown = crate::shutdown_signal();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = check_alerts(aggregator, store).await {
                    break Err(e);
                }
            }
            () = &mut shutdown => break Ok(()),
        }
    };
    autosave.stop().await;
    result
}

pub(crate) fn run_searches(
    store: &mut LocalStore,
    json: bool,
    command: SearchesCommands,
) -> anyhow::Result<()> {
    match command {
        SearchesCommands::List => {
            let history = store.search_history();
            if json {
                return output::print_json(history);
            }
            if history.is_empty() {
                println!("No searches yet.");
            }
            for entry in history {
                println!("{}  {}", fmt_time(entry.timestamp.as_ref()), entry.query);
            }
        }
        SearchesCommands::Remove { query } => {
            if store.remove_search_history_entry(&query)? {
                println!("removed \"{query}\"");
            } else {
                println!("\"{query}\" is not in the history");
            }
        }
        SearchesCommands::Clear => {
            store.clear_search_history()?;
            println!("search history cleared");
        }
    }
    Ok(())
}

/// Interprets a command-line preference value: JSON when it parses, plain
/// text otherwise.
pub(crate) fn parse_pref_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn run_prefs(
    store: &mut LocalStore,
    json: bool,
    command: PrefsCommands,
) -> anyhow::Result<()> {
    match command {
        PrefsCommands::Show => {
            let prefs = store.preferences();
            if json {
                return output::print_json(prefs);
            }
            let value = serde_json::to_value(prefs)?;
            if let Value::Object(map) = value {
                for (key, value) in map {
                    println!("{key:<18} {value}");
                }
            }
        }
        PrefsCommands::Set { key, value } => {
            let value = parse_pref_value(&value);
            if !store.set_preference(&key, value.clone())? {
                anyhow::bail!("preference '{key}' was not changed (unknown key, invalid value, or already set)");
            }
            println!("{key} = {value}");
        }
    }
    Ok(())
}
