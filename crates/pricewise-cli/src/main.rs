mod catalog;
mod curation;
mod maintenance;
mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pricewise_catalog::Aggregator;
use pricewise_core::AppConfig;
use pricewise_store::{ChangeNotifier, FileStorage, LocalStore};
use tracing_subscriber::EnvFilter;

use crate::catalog::FilterArgs;
use crate::curation::{
    AlertsCommands, CompareCommands, FavoritesCommands, PrefsCommands, SearchesCommands,
    ViewedCommands,
};

#[derive(Debug, Parser)]
#[command(name = "pricewise")]
#[command(about = "Compare prices across product catalogs and keep a local shortlist")]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search every catalog
    Search {
        query: String,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Highest-rated products right now
    Trending {
        #[arg(long, default_value = "12")]
        limit: usize,
    },
    /// Browse one category
    Category {
        name: String,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show store offers for one product
    Details {
        /// Source-prefixed product id, e.g. fs_3 or dj_17
        id: String,
        /// Do not add the product to recently viewed
        #[arg(long)]
        no_record: bool,
    },
    /// Simulated daily price history for one product
    History {
        id: String,
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
    /// Manage the compare set
    Compare {
        #[command(subcommand)]
        command: CompareCommands,
    },
    /// Recently viewed products
    Viewed {
        #[command(subcommand)]
        command: ViewedCommands,
    },
    /// Manage price alerts
    Alerts {
        #[command(subcommand)]
        command: AlertsCommands,
    },
    /// Search history
    Searches {
        #[command(subcommand)]
        command: SearchesCommands,
    },
    /// Show or change preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
    /// Export all collections as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import collections from an export file
    Import { path: PathBuf },
    /// Snapshot all collections
    Backup,
    /// Replace all collections with the last snapshot
    Restore,
    /// Deduplicate and backfill stored data
    Repair,
    /// Report integrity issues and storage usage
    Validate,
    /// Shrink stored data
    Optimize,
    /// Activity statistics
    Stats,
    /// Clear every collection and restore default preferences
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn build_aggregator(config: &AppConfig) -> anyhow::Result<Aggregator> {
    let roster = match &config.stores_path {
        Some(path) => pricewise_core::load_store_roster(path)?,
        None => pricewise_core::default_store_roster(),
    };
    Ok(Aggregator::from_config(config, roster)?)
}

fn open_store(config: &AppConfig) -> anyhow::Result<LocalStore> {
    let storage = FileStorage::new(&config.data_dir);
    tracing::debug!(dir = %config.data_dir.display(), "opening local store");
    Ok(LocalStore::open(Arc::new(storage), ChangeNotifier::default())?)
}

#[allow(clippy::too_many_lines)]
async fn run(config: &AppConfig, json: bool, command: Commands) -> anyhow::Result<()> {
    let mut store = open_store(config)?;

    match command {
        Commands::Search {
            query,
            limit,
            filters,
        } => {
            let aggregator = build_aggregator(config)?;
            catalog::run_search(&aggregator, &mut store, json, &query, limit, &filters).await?;
        }
        Commands::Trending { limit } => {
            let aggregator = build_aggregator(config)?;
            catalog::run_trending(&aggregator, &store, json, limit).await?;
        }
        Commands::Category {
            name,
            limit,
            filters,
        } => {
            let aggregator = build_aggregator(config)?;
            catalog::run_category(&aggregator, &store, json, &name, limit, &filters).await?;
        }
        Commands::Details { id, no_record } => {
            let aggregator = build_aggregator(config)?;
            catalog::run_details(&aggregator, &mut store, json, &id, !no_record).await?;
        }
        Commands::History { id, days } => {
            let aggregator = build_aggregator(config)?;
            catalog::run_history(&aggregator, json, &id, days).await?;
        }
        Commands::Favorites { command } => {
            let aggregator = build_aggregator(config)?;
            curation::run_favorites(&aggregator, &mut store, json, command).await?;
        }
        Commands::Compare { command } => {
            let aggregator = build_aggregator(config)?;
            curation::run_compare(&aggregator, &mut store, json, command).await?;
        }
        Commands::Viewed { command } => curation::run_viewed(&mut store, json, command)?,
        Commands::Alerts { command } => {
            let aggregator = build_aggregator(config)?;
            let autosave_every = Duration::from_secs(config.autosave_interval_secs);
            store = curation::run_alerts(&aggregator, store, json, command, autosave_every).await?;
        }
        Commands::Searches { command } => curation::run_searches(&mut store, json, command)?,
        Commands::Prefs { command } => curation::run_prefs(&mut store, json, command)?,
        Commands::Export { output } => maintenance::run_export(&store, output.as_deref())?,
        Commands::Import { path } => maintenance::run_import(&mut store, json, &path)?,
        Commands::Backup => maintenance::run_backup(&store)?,
        Commands::Restore => maintenance::run_restore(&mut store)?,
        Commands::Repair => maintenance::run_repair(&mut store, json)?,
        Commands::Validate => maintenance::run_validate(&store, json)?,
        Commands::Optimize => maintenance::run_optimize(&mut store)?,
        Commands::Stats => maintenance::run_stats(&store, json)?,
        Commands::Reset { yes } => maintenance::run_reset(&mut store, yes)?,
    }

    // Collections cleaned up on load are written back before exiting.
    let written = store.flush()?;
    if written > 0 {
        tracing::info!(written, "saved cleaned collections");
    }
    Ok(())
}

/// Resolves on ctrl-c or, on unix, SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = pricewise_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pricewise: run with --help to see available commands");
        return Ok(());
    };
    run(&config, cli.json, command).await
}
