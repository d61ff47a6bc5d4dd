use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// The offer synthesizer picks up to this many stores per product, so a
/// roster must contain at least this many entries.
pub const MIN_ROSTER_SIZE: usize = 5;

/// A simulated retailer used when synthesizing store offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProfile {
    pub name: String,
    /// Scales the catalog price, e.g. `0.85` for a discounter.
    pub price_multiplier: f64,
    /// Probability in `[0, 1]` that an offer from this store is in stock.
    pub reliability: f64,
}

impl StoreProfile {
    fn new(name: &str, price_multiplier: f64, reliability: f64) -> Self {
        Self {
            name: name.to_string(),
            price_multiplier,
            reliability,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoresFile {
    pub stores: Vec<StoreProfile>,
}

/// Built-in roster used when no roster file is configured.
#[must_use]
pub fn default_store_roster() -> Vec<StoreProfile> {
    vec![
        StoreProfile::new("Amazon", 1.0, 0.95),
        StoreProfile::new("eBay", 0.85, 0.90),
        StoreProfile::new("Walmart", 0.92, 0.98),
        StoreProfile::new("Target", 0.88, 0.96),
        StoreProfile::new("Best Buy", 1.05, 0.94),
        StoreProfile::new("Costco", 0.90, 0.97),
        StoreProfile::new("Home Depot", 0.95, 0.93),
        StoreProfile::new("Newegg", 1.02, 0.91),
    ]
}

/// Load and validate a store roster from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_store_roster(path: &Path) -> Result<Vec<StoreProfile>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let stores_file: StoresFile = serde_yaml::from_str(&content)?;

    validate_roster(&stores_file.stores)?;

    Ok(stores_file.stores)
}

fn validate_roster(stores: &[StoreProfile]) -> Result<(), ConfigError> {
    if stores.len() < MIN_ROSTER_SIZE {
        return Err(ConfigError::Validation(format!(
            "store roster has {} stores; at least {MIN_ROSTER_SIZE} are required",
            stores.len()
        )));
    }

    let mut seen_names = HashSet::new();

    for store in stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store name must be non-empty".to_string(),
            ));
        }

        if !(store.price_multiplier.is_finite() && store.price_multiplier > 0.0) {
            return Err(ConfigError::Validation(format!(
                "store '{}' has invalid price_multiplier {}; must be > 0",
                store.name, store.price_multiplier
            )));
        }

        if !(0.0..=1.0).contains(&store.reliability) {
            return Err(ConfigError::Validation(format!(
                "store '{}' has invalid reliability {}; must be within [0, 1]",
                store.name, store.reliability
            )));
        }

        if !seen_names.insert(store.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store name: '{}'",
                store.name
            )));
        }
    }

    Ok(())
}
