//! Durable, validated client-side state for the price comparison app.
//!
//! [`LocalStore`] owns six collections (favorites, compare set, recently
//! viewed, price alerts, search history, preferences) persisted through a
//! [`Storage`] backend, and announces every change on a [`ChangeNotifier`].

pub mod error;
mod insights;
mod maintenance;
pub mod model;
mod notifier;
pub mod storage;
mod store;
pub mod sync;
mod validate;

pub use error::{StorageError, StoreError};
pub use insights::{ActivityCounts, AlertCounts, BrandCount, CategoryCount, CompareCounts, Statistics};
pub use maintenance::{
    ImportOutcome, ImportReport, KeyUsage, OptimizeReport, RepairReport, StorageUsage,
};
pub use model::{
    normalize_query, Collection, CompareEntry, FavoriteEntry, FavoriteSort, PriceAlert,
    RecentEntry, SearchHistoryEntry, UserPreferences, COMPARE_CAPACITY,
};
pub use notifier::{ChangeAction, ChangeEvent, ChangeNotifier};
pub use storage::{
    ExternalChange, ExternalChanges, FileStorage, MemoryStorage, Storage, StorageEvent,
};
pub use store::LocalStore;
pub use sync::{spawn_autosave, spawn_external_sync, AutosaveHandle, SharedStore};
