//! Canonical domain types and configuration shared by the pricewise crates.

mod app_config;
mod config;
pub mod products;
pub mod stores;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{
    round_cents, split_source_id, Availability, EnrichedProduct, Product, Rating, SortMode,
    StoreOffer,
};
pub use stores::{default_store_roster, load_store_roster, StoreProfile, StoresFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read store roster {path}: {source}")]
    StoresFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store roster: {0}")]
    StoresFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
