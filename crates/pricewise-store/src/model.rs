//! Persisted record shapes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pricewise_core::products::deserialize_id;
use pricewise_core::{Product, SortMode};
use serde::{Deserialize, Serialize};

/// Maximum number of products in the comparison set.
pub const COMPARE_CAPACITY: usize = 4;
/// Recently-viewed entries older than this are evicted.
pub const RECENT_MAX_AGE_DAYS: i64 = 30;
pub const SEARCH_HISTORY_CAP: usize = 20;
/// Shorter normalized queries are not recorded.
pub const SEARCH_MIN_CHARS: usize = 2;
/// Tag written into export and backup payloads.
pub const FORMAT_VERSION: &str = "1.0";
/// Storage key of the standalone snapshot.
pub const BACKUP_KEY: &str = "backup";

/// One of the store's collections. `All` only appears in change events that
/// affect every collection at once (import, repair, restore, reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Favorites,
    Compare,
    RecentlyViewed,
    PriceAlerts,
    SearchHistory,
    Preferences,
    All,
}

impl Collection {
    /// Every collection with its own durable entry, in persistence order.
    pub const PERSISTED: [Collection; 6] = [
        Collection::Favorites,
        Collection::Compare,
        Collection::RecentlyViewed,
        Collection::PriceAlerts,
        Collection::SearchHistory,
        Collection::Preferences,
    ];

    /// Key of the durable entry, `None` for [`Collection::All`].
    #[must_use]
    pub fn storage_key(self) -> Option<&'static str> {
        match self {
            Collection::Favorites => Some("favorites"),
            Collection::Compare => Some("compare_items"),
            Collection::RecentlyViewed => Some("recently_viewed"),
            Collection::PriceAlerts => Some("price_alerts"),
            Collection::SearchHistory => Some("search_history"),
            Collection::Preferences => Some("user_preferences"),
            Collection::All => None,
        }
    }

    #[must_use]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::PERSISTED
            .into_iter()
            .find(|c| c.storage_key() == Some(key))
    }

    /// Field names accepted for this collection in import payloads: the
    /// storage key plus the camelCase spelling older exports used.
    pub(crate) fn import_names(self) -> &'static [&'static str] {
        match self {
            Collection::Favorites => &["favorites"],
            Collection::Compare => &["compare_items", "compareItems"],
            Collection::RecentlyViewed => &["recently_viewed", "recentlyViewed"],
            Collection::PriceAlerts => &["price_alerts", "priceAlerts"],
            Collection::SearchHistory => &["search_history", "searchHistory"],
            Collection::Preferences => &["user_preferences", "userPreferences"],
            Collection::All => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Collection::Favorites => "favorites",
            Collection::Compare => "compare",
            Collection::RecentlyViewed => "recently_viewed",
            Collection::PriceAlerts => "price_alerts",
            Collection::SearchHistory => "search_history",
            Collection::Preferences => "preferences",
            Collection::All => "all",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareEntry {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    #[serde(flatten)]
    pub product: Product,
    /// Entries without a view time are dropped on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub product_id: String,
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub target_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_price: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl PriceAlert {
    /// Active and not yet triggered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.active && !self.triggered
    }

    #[must_use]
    pub fn matches(&self, id_or_product_id: &str) -> bool {
        let needle = id_or_product_id.trim();
        self.id == needle || self.product_id.trim() == needle
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    /// Trimmed, lowercased query text.
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Normalizes a query for history: trim plus lowercase. `None` when the
/// result is shorter than [`SEARCH_MIN_CHARS`].
#[must_use]
pub fn normalize_query(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    (normalized.chars().count() >= SEARCH_MIN_CHARS).then_some(normalized)
}

/// Closed set of user options. Unknown keys are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub theme: String,
    pub currency: String,
    /// Hide products rated below this.
    pub min_rating: f64,
    pub sort_by: SortMode,
    pub page_size: u32,
    pub notifications: bool,
    pub price_drop_alerts: bool,
    /// Enables the periodic flush of unsaved collections.
    pub auto_save: bool,
    pub max_recent_items: usize,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            currency: "USD".to_string(),
            min_rating: 0.0,
            sort_by: SortMode::Relevance,
            page_size: 20,
            notifications: true,
            price_drop_alerts: true,
            auto_save: true,
            max_recent_items: 50,
        }
    }
}

impl UserPreferences {
    /// Recently-viewed capacity, never below one.
    #[must_use]
    pub fn recent_capacity(&self) -> usize {
        self.max_recent_items.max(1)
    }
}

/// Orderings offered for the favorites list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteSort {
    #[default]
    Newest,
    Oldest,
    Name,
    PriceLow,
    PriceHigh,
    Rating,
}

impl FromStr for FavoriteSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "newest" => Ok(FavoriteSort::Newest),
            "oldest" => Ok(FavoriteSort::Oldest),
            "name" => Ok(FavoriteSort::Name),
            "price_low" => Ok(FavoriteSort::PriceLow),
            "price_high" => Ok(FavoriteSort::PriceHigh),
            "rating" => Ok(FavoriteSort::Rating),
            other => Err(format!("unknown favorites order '{other}'")),
        }
    }
}
