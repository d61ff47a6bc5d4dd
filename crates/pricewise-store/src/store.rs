//! The local state store: six durable collections of user curation.
//!
//! In-memory state is authoritative for the current context. Every mutating
//! call writes its one collection straight back to storage; a failed write
//! frees space (drops the backup snapshot, trims recently-viewed) and is
//! retried once. If that also fails the mutation stays in memory, the
//! collection is marked dirty for the periodic flush, and the error is
//! returned.
//!
//! Expected conditions (duplicates, full compare set, unknown ids) are
//! reported as `Ok(false)` / `Ok(None)`, never as errors. A
//! [`ChangeEvent`](crate::ChangeEvent) is published for every call that
//! changed state, and for no other.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pricewise_core::Product;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::model::{
    normalize_query, Collection, CompareEntry, FavoriteEntry, FavoriteSort, PriceAlert,
    RecentEntry, SearchHistoryEntry, UserPreferences, BACKUP_KEY, COMPARE_CAPACITY,
    SEARCH_HISTORY_CAP,
};
use crate::notifier::{ChangeAction, ChangeNotifier};
use crate::storage::Storage;
use crate::validate;

pub struct LocalStore {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) notifier: ChangeNotifier,
    pub(crate) favorites: Vec<FavoriteEntry>,
    pub(crate) compare: Vec<CompareEntry>,
    pub(crate) recent: Vec<RecentEntry>,
    pub(crate) alerts: Vec<PriceAlert>,
    pub(crate) history: Vec<SearchHistoryEntry>,
    pub(crate) prefs: UserPreferences,
    pub(crate) dirty: HashSet<Collection>,
}

impl LocalStore {
    /// Loads every collection from `storage`, validating as it goes.
    ///
    /// Corrupted documents never fail the load: they are reset to empty and
    /// logged. Collections that validation changed are marked dirty so the
    /// next flush writes the cleaned version back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] only when the backend cannot be read.
    pub fn open(storage: Arc<dyn Storage>, notifier: ChangeNotifier) -> Result<Self, StoreError> {
        let mut store = Self {
            storage,
            notifier,
            favorites: Vec::new(),
            compare: Vec::new(),
            recent: Vec::new(),
            alerts: Vec::new(),
            history: Vec::new(),
            prefs: UserPreferences::default(),
            dirty: HashSet::new(),
        };

        // Preferences first: the recently-viewed capacity depends on them.
        store.reload(Collection::Preferences)?;
        for collection in Collection::PERSISTED {
            if collection != Collection::Preferences {
                store.reload(collection)?;
            }
        }

        tracing::info!(
            favorites = store.favorites.len(),
            compare = store.compare.len(),
            recently_viewed = store.recent.len(),
            price_alerts = store.alerts.len(),
            search_history = store.history.len(),
            "local store loaded"
        );
        Ok(store)
    }

    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Replaces `collection` in memory with what storage currently holds.
    pub(crate) fn reload(&mut self, collection: Collection) -> Result<(), StoreError> {
        let Some(key) = collection.storage_key() else {
            return Ok(());
        };
        let raw = self.storage.get(key)?;
        let document = validate::parse_document(collection, raw.as_deref());
        let original = document.clone();
        let now = Utc::now();

        match collection {
            Collection::Favorites => {
                self.favorites = validate::favorites(validate::array_items(collection, document));
            }
            Collection::Compare => {
                self.compare = validate::compare(validate::array_items(collection, document));
            }
            Collection::RecentlyViewed => {
                self.recent = validate::recently_viewed(
                    validate::array_items(collection, document),
                    self.prefs.recent_capacity(),
                    now,
                );
            }
            Collection::PriceAlerts => {
                self.alerts = validate::price_alerts(validate::array_items(collection, document));
            }
            Collection::SearchHistory => {
                self.history =
                    validate::search_history(validate::array_items(collection, document));
            }
            Collection::Preferences => self.prefs = validate::preferences(document),
            Collection::All => {}
        }

        let cleaned = self.collection_value(collection)?;
        let changed = match original {
            Some(original) => original != cleaned,
            None => raw.is_some(),
        };
        if changed {
            self.dirty.insert(collection);
        } else {
            self.dirty.remove(&collection);
        }
        Ok(())
    }

    pub(crate) fn collection_value(&self, collection: Collection) -> Result<Value, StoreError> {
        let value = match collection {
            Collection::Favorites => serde_json::to_value(&self.favorites),
            Collection::Compare => serde_json::to_value(&self.compare),
            Collection::RecentlyViewed => serde_json::to_value(&self.recent),
            Collection::PriceAlerts => serde_json::to_value(&self.alerts),
            Collection::SearchHistory => serde_json::to_value(&self.history),
            Collection::Preferences => serde_json::to_value(&self.prefs),
            Collection::All => return Ok(Value::Null),
        };
        value.map_err(|e| StoreError::Serialize {
            context: collection.to_string(),
            source: e,
        })
    }

    fn collection_json(&self, collection: Collection) -> Result<String, StoreError> {
        let value = self.collection_value(collection)?;
        serde_json::to_string(&value).map_err(|e| StoreError::Serialize {
            context: collection.to_string(),
            source: e,
        })
    }

    /// Writes one collection, with a single cleanup-and-retry on failure.
    pub(crate) fn persist(&mut self, collection: Collection) -> Result<(), StoreError> {
        let Some(key) = collection.storage_key() else {
            return Ok(());
        };
        let json = self.collection_json(collection)?;
        match self.storage.set(key, &json) {
            Ok(()) => {
                self.dirty.remove(&collection);
                Ok(())
            }
            Err(first) => {
                tracing::warn!(key, error = %first, "storage write failed, freeing space and retrying");
                self.free_space();
                let json = self.collection_json(collection)?;
                match self.storage.set(key, &json) {
                    Ok(()) => {
                        self.dirty.remove(&collection);
                        Ok(())
                    }
                    Err(second) => {
                        tracing::error!(key, error = %second, "storage write failed after cleanup");
                        self.dirty.insert(collection);
                        Err(second.into())
                    }
                }
            }
        }
    }

    /// Best-effort space recovery: drops the backup snapshot and slims the
    /// recently-viewed trail.
    fn free_space(&mut self) {
        if let Err(e) = self.storage.remove(BACKUP_KEY) {
            tracing::warn!(error = %e, "could not remove backup while freeing space");
        }
        self.slim_recent(Utc::now());
        let Some(key) = Collection::RecentlyViewed.storage_key() else {
            return;
        };
        match self.collection_json(Collection::RecentlyViewed) {
            Ok(json) => {
                if let Err(e) = self.storage.set(key, &json) {
                    tracing::warn!(error = %e, "could not rewrite trimmed recently viewed");
                    self.dirty.insert(Collection::RecentlyViewed);
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize recently viewed"),
        }
    }

    /// Drops descriptions from recently-viewed snapshots and applies the age
    /// and capacity bounds.
    pub(crate) fn slim_recent(&mut self, now: DateTime<Utc>) {
        for entry in &mut self.recent {
            entry.product.description.clear();
        }
        validate::evict_recent(&mut self.recent, self.prefs.recent_capacity(), now);
    }

    /// Persists `collection` then announces the change. The event goes out
    /// even when the write fails, since in-memory state did change.
    pub(crate) fn commit(
        &mut self,
        collection: Collection,
        action: ChangeAction,
        payload: Option<Value>,
    ) -> Result<(), StoreError> {
        let written = self.persist(collection);
        self.notifier.publish(collection, action, payload);
        written
    }

    /// Writes every dirty collection and returns how many were written.
    /// The `auto_save` preference only gates the background autosave task,
    /// not this call.
    ///
    /// # Errors
    ///
    /// Returns the first write failure; remaining collections stay dirty.
    pub fn flush(&mut self) -> Result<usize, StoreError> {
        if self.dirty.is_empty() {
            return Ok(0);
        }
        let pending: Vec<Collection> = Collection::PERSISTED
            .into_iter()
            .filter(|c| self.dirty.contains(c))
            .collect();
        for collection in &pending {
            self.persist(*collection)?;
        }
        tracing::debug!(count = pending.len(), "flushed dirty collections");
        Ok(pending.len())
    }

    #[must_use]
    pub fn is_dirty(&self, collection: Collection) -> bool {
        self.dirty.contains(&collection)
    }

    /// Reconciles a change another context made to storage `key`: the
    /// affected collection is re-read and an `external_update` is announced.
    /// Keys that are not collections are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] when the backend cannot be read.
    pub fn apply_external_change(&mut self, key: &str) -> Result<bool, StoreError> {
        let Some(collection) = Collection::from_storage_key(key) else {
            return Ok(false);
        };
        self.reload(collection)?;
        tracing::info!(%collection, "reloaded collection changed by another context");
        self.notifier
            .publish(collection, ChangeAction::ExternalUpdate, None);
        if collection == Collection::Preferences {
            self.cleanup_recently_viewed_at(Utc::now())?;
        }
        Ok(true)
    }

    /// Re-reads every collection after change notifications were lost, then
    /// announces one `external_update` for [`Collection::All`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] when the backend cannot be read.
    pub fn resync_all(&mut self) -> Result<(), StoreError> {
        // Preferences first so the recently-viewed capacity is current.
        self.reload(Collection::Preferences)?;
        for collection in Collection::PERSISTED {
            if collection != Collection::Preferences {
                self.reload(collection)?;
            }
        }
        tracing::info!("reloaded every collection after missed change notifications");
        self.notifier
            .publish(Collection::All, ChangeAction::ExternalUpdate, None);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Favorites
    // -----------------------------------------------------------------------

    /// Adds `product` to the front of the favorites. `Ok(false)` when the id
    /// is blank or already a favorite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn add_favorite(&mut self, product: &Product) -> Result<bool, StoreError> {
        if product.id.trim().is_empty() || self.is_favorite(&product.id) {
            return Ok(false);
        }
        let mut product = product.clone();
        product.id = product.id.trim().to_string();
        let entry = FavoriteEntry {
            product,
            added_at: Some(Utc::now()),
        };
        let payload = serde_json::to_value(&entry).ok();
        self.favorites.insert(0, entry);
        self.commit(Collection::Favorites, ChangeAction::Add, payload)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn remove_favorite(&mut self, product_id: &str) -> Result<bool, StoreError> {
        let before = self.favorites.len();
        self.favorites.retain(|f| !f.product.has_id(product_id));
        if self.favorites.len() == before {
            return Ok(false);
        }
        self.commit(
            Collection::Favorites,
            ChangeAction::Remove,
            Some(json!({ "product_id": product_id.trim() })),
        )?;
        Ok(true)
    }

    #[must_use]
    pub fn is_favorite(&self, product_id: &str) -> bool {
        self.favorites.iter().any(|f| f.product.has_id(product_id))
    }

    #[must_use]
    pub fn favorites(&self) -> &[FavoriteEntry] {
        &self.favorites
    }

    #[must_use]
    pub fn get_favorite(&self, product_id: &str) -> Option<&FavoriteEntry> {
        self.favorites.iter().find(|f| f.product.has_id(product_id))
    }

    /// Favorites whose title, category, description or brand contain `query`.
    #[must_use]
    pub fn search_favorites(&self, query: &str) -> Vec<&FavoriteEntry> {
        self.favorites
            .iter()
            .filter(|f| f.product.matches_query(query))
            .collect()
    }

    /// Favorites in exactly `category` (case-insensitive). Empty or `"all"`
    /// returns everything.
    #[must_use]
    pub fn favorites_by_category(&self, category: &str) -> Vec<&FavoriteEntry> {
        let category = category.trim();
        if category.is_empty() || category.eq_ignore_ascii_case("all") {
            return self.favorites.iter().collect();
        }
        self.favorites
            .iter()
            .filter(|f| f.product.category.eq_ignore_ascii_case(category))
            .collect()
    }

    #[must_use]
    pub fn sorted_favorites(&self, order: FavoriteSort) -> Vec<&FavoriteEntry> {
        let mut items: Vec<&FavoriteEntry> = self.favorites.iter().collect();
        match order {
            FavoriteSort::Newest => items.sort_by(|a, b| b.added_at.cmp(&a.added_at)),
            FavoriteSort::Oldest => items.sort_by(|a, b| a.added_at.cmp(&b.added_at)),
            FavoriteSort::Name => items.sort_by(|a, b| {
                a.product
                    .title
                    .to_lowercase()
                    .cmp(&b.product.title.to_lowercase())
            }),
            FavoriteSort::PriceLow => {
                items.sort_by(|a, b| a.product.price.total_cmp(&b.product.price));
            }
            FavoriteSort::PriceHigh => {
                items.sort_by(|a, b| b.product.price.total_cmp(&a.product.price));
            }
            FavoriteSort::Rating => {
                items.sort_by(|a, b| b.product.rating.rate.total_cmp(&a.product.rating.rate));
            }
        }
        items
    }

    // -----------------------------------------------------------------------
    // Compare set
    // -----------------------------------------------------------------------

    /// Appends `product` to the compare set. `Ok(false)`, with no write and
    /// no event, when it is already present or the set is full.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn add_to_compare(&mut self, product: &Product) -> Result<bool, StoreError> {
        if product.id.trim().is_empty() || self.is_in_compare(&product.id) || !self.can_add_to_compare()
        {
            return Ok(false);
        }
        let mut product = product.clone();
        product.id = product.id.trim().to_string();
        let entry = CompareEntry {
            product,
            added_at: Some(Utc::now()),
        };
        let payload = serde_json::to_value(&entry).ok();
        self.compare.push(entry);
        self.commit(Collection::Compare, ChangeAction::Add, payload)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn remove_from_compare(&mut self, product_id: &str) -> Result<bool, StoreError> {
        let before = self.compare.len();
        self.compare.retain(|c| !c.product.has_id(product_id));
        if self.compare.len() == before {
            return Ok(false);
        }
        self.commit(
            Collection::Compare,
            ChangeAction::Remove,
            Some(json!({ "product_id": product_id.trim() })),
        )?;
        Ok(true)
    }

    #[must_use]
    pub fn is_in_compare(&self, product_id: &str) -> bool {
        self.compare.iter().any(|c| c.product.has_id(product_id))
    }

    #[must_use]
    pub fn can_add_to_compare(&self) -> bool {
        self.compare.len() < COMPARE_CAPACITY
    }

    #[must_use]
    pub fn compare_items(&self) -> &[CompareEntry] {
        &self.compare
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn clear_compare(&mut self) -> Result<bool, StoreError> {
        if self.compare.is_empty() {
            return Ok(false);
        }
        self.compare.clear();
        self.commit(Collection::Compare, ChangeAction::Clear, None)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Recently viewed
    // -----------------------------------------------------------------------

    /// Moves (or inserts) `product` to the front of the trail, then
    /// truncates to the `max_recent_items` preference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn add_recently_viewed(&mut self, product: &Product) -> Result<bool, StoreError> {
        if product.id.trim().is_empty() {
            return Ok(false);
        }
        self.recent.retain(|r| !r.product.has_id(&product.id));
        let mut product = product.clone();
        product.id = product.id.trim().to_string();
        let entry = RecentEntry {
            product,
            viewed_at: Some(Utc::now()),
        };
        let payload = serde_json::to_value(&entry).ok();
        self.recent.insert(0, entry);
        self.recent.truncate(self.prefs.recent_capacity());
        self.commit(Collection::RecentlyViewed, ChangeAction::Add, payload)?;
        Ok(true)
    }

    /// Most recent first; `limit` of `None` returns the whole trail.
    #[must_use]
    pub fn recently_viewed(&self, limit: Option<usize>) -> &[RecentEntry] {
        let end = limit.map_or(self.recent.len(), |l| l.min(self.recent.len()));
        &self.recent[..end]
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn clear_recently_viewed(&mut self) -> Result<bool, StoreError> {
        if self.recent.is_empty() {
            return Ok(false);
        }
        self.recent.clear();
        self.commit(Collection::RecentlyViewed, ChangeAction::Clear, None)?;
        Ok(true)
    }

    /// Evicts entries past the age limit or beyond capacity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn cleanup_recently_viewed(&mut self) -> Result<usize, StoreError> {
        self.cleanup_recently_viewed_at(Utc::now())
    }

    pub(crate) fn cleanup_recently_viewed_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let removed = validate::evict_recent(&mut self.recent, self.prefs.recent_capacity(), now);
        if removed == 0 {
            return Ok(0);
        }
        tracing::info!(removed, "evicted stale recently viewed entries");
        self.commit(
            Collection::RecentlyViewed,
            ChangeAction::Cleanup,
            Some(json!({ "removed": removed })),
        )?;
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Price alerts
    // -----------------------------------------------------------------------

    /// Sets a price alert for `product_id`. An existing pending alert for
    /// the same product is updated in place (same id, new target and
    /// timestamp) instead of duplicated. `Ok(None)` for a blank id or a
    /// target that is not a positive number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn add_price_alert(
        &mut self,
        product_id: &str,
        target_price: f64,
        product_title: Option<&str>,
    ) -> Result<Option<PriceAlert>, StoreError> {
        let product_id = product_id.trim();
        if product_id.is_empty() || !target_price.is_finite() || target_price <= 0.0 {
            return Ok(None);
        }
        let title = product_title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| format!("Product #{product_id}"), str::to_string);
        let now = Utc::now();

        let existing = self
            .alerts
            .iter_mut()
            .find(|a| a.is_pending() && a.product_id == product_id);
        let (alert, action) = if let Some(alert) = existing {
            alert.target_price = target_price;
            alert.product_title = title;
            alert.created_at = Some(now);
            (alert.clone(), ChangeAction::Update)
        } else {
            let alert = PriceAlert {
                id: uuid::Uuid::new_v4().to_string(),
                product_id: product_id.to_string(),
                product_title: title,
                target_price,
                created_at: Some(now),
                active: true,
                triggered: false,
                triggered_at: None,
                triggered_price: None,
            };
            self.alerts.push(alert.clone());
            (alert, ChangeAction::Add)
        };

        self.commit(
            Collection::PriceAlerts,
            action,
            serde_json::to_value(&alert).ok(),
        )?;
        Ok(Some(alert))
    }

    /// Removes every alert whose own id or product id equals `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn remove_price_alert(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.alerts.len();
        self.alerts.retain(|a| !a.matches(id));
        if self.alerts.len() == before {
            return Ok(false);
        }
        self.commit(
            Collection::PriceAlerts,
            ChangeAction::Remove,
            Some(json!({ "id": id.trim() })),
        )?;
        Ok(true)
    }

    /// Replaces the alert with the same id. `Ok(false)` when no alert has
    /// that id, nothing differs, or the update lacks a product id or a
    /// positive target. A pending update supersedes any other pending alert
    /// for the same product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn update_price_alert(&mut self, updated: &PriceAlert) -> Result<bool, StoreError> {
        if updated.product_id.trim().is_empty() || !validate::valid_target(updated.target_price) {
            return Ok(false);
        }
        let Some(slot) = self.alerts.iter_mut().find(|a| a.id == updated.id) else {
            return Ok(false);
        };
        if *slot == *updated {
            return Ok(false);
        }
        *slot = updated.clone();
        if updated.is_pending() {
            // The updated alert becomes the single pending one for its product.
            self.alerts.retain(|a| {
                a.id == updated.id || !a.is_pending() || a.product_id != updated.product_id
            });
        }
        self.commit(
            Collection::PriceAlerts,
            ChangeAction::Update,
            serde_json::to_value(updated).ok(),
        )?;
        Ok(true)
    }

    /// Triggers every pending alert for `product_id` whose target is at or
    /// above `current_price`, stamping the trigger time and price. Returns
    /// the alerts that fired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn evaluate_price(
        &mut self,
        product_id: &str,
        current_price: f64,
    ) -> Result<Vec<PriceAlert>, StoreError> {
        let product_id = product_id.trim();
        if !current_price.is_finite() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut fired = Vec::new();
        for alert in &mut self.alerts {
            if alert.is_pending()
                && alert.product_id == product_id
                && current_price <= alert.target_price
            {
                alert.triggered = true;
                alert.triggered_at = Some(now);
                alert.triggered_price = Some(current_price);
                fired.push(alert.clone());
            }
        }
        if fired.is_empty() {
            return Ok(fired);
        }
        tracing::info!(product_id, current_price, count = fired.len(), "price alerts triggered");
        self.commit(
            Collection::PriceAlerts,
            ChangeAction::Update,
            serde_json::to_value(&fired).ok(),
        )?;
        Ok(fired)
    }

    #[must_use]
    pub fn price_alerts(&self) -> &[PriceAlert] {
        &self.alerts
    }

    #[must_use]
    pub fn active_price_alerts(&self) -> Vec<&PriceAlert> {
        self.alerts.iter().filter(|a| a.is_pending()).collect()
    }

    #[must_use]
    pub fn triggered_price_alerts(&self) -> Vec<&PriceAlert> {
        self.alerts.iter().filter(|a| a.triggered).collect()
    }

    // -----------------------------------------------------------------------
    // Search history
    // -----------------------------------------------------------------------

    /// Records `query` (trimmed, lowercased) at the front of the history,
    /// removing an older copy. `Ok(false)` for queries under two characters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn add_search(&mut self, query: &str) -> Result<bool, StoreError> {
        let Some(query) = normalize_query(query) else {
            return Ok(false);
        };
        self.history.retain(|h| h.query != query);
        self.history.insert(
            0,
            SearchHistoryEntry {
                query: query.clone(),
                timestamp: Some(Utc::now()),
            },
        );
        self.history.truncate(SEARCH_HISTORY_CAP);
        self.commit(
            Collection::SearchHistory,
            ChangeAction::Add,
            Some(json!({ "query": query })),
        )?;
        Ok(true)
    }

    #[must_use]
    pub fn search_history(&self) -> &[SearchHistoryEntry] {
        &self.history
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn remove_search_history_entry(&mut self, query: &str) -> Result<bool, StoreError> {
        let normalized = query.trim().to_lowercase();
        let before = self.history.len();
        self.history.retain(|h| h.query != normalized);
        if self.history.len() == before {
            return Ok(false);
        }
        self.commit(
            Collection::SearchHistory,
            ChangeAction::Remove,
            Some(json!({ "query": normalized })),
        )?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn clear_search_history(&mut self) -> Result<bool, StoreError> {
        if self.history.is_empty() {
            return Ok(false);
        }
        self.history.clear();
        self.commit(Collection::SearchHistory, ChangeAction::Clear, None)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Preferences
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn preferences(&self) -> &UserPreferences {
        &self.prefs
    }

    /// Sets one preference. Unknown keys and values of the wrong type are
    /// rejected with `Ok(false)`, as is setting the current value again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn set_preference(&mut self, key: &str, value: Value) -> Result<bool, StoreError> {
        let mut incoming = serde_json::Map::new();
        incoming.insert(key.to_string(), value.clone());
        let merged = validate::merge_preferences(&self.prefs, &incoming);
        if merged.applied.is_empty() {
            tracing::warn!(key, "rejected preference update");
            return Ok(false);
        }
        if merged.preferences == self.prefs {
            return Ok(false);
        }
        self.prefs = merged.preferences;
        let written = self.commit(
            Collection::Preferences,
            ChangeAction::Update,
            Some(json!({ "key": key, "value": value })),
        );
        let trimmed = self.cleanup_recently_viewed_at(Utc::now());
        written?;
        trimmed?;
        Ok(true)
    }

    /// Merges every known, well-typed key of `partial` (a JSON object) into
    /// the preferences. Returns the keys that were applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails after cleanup-and-retry.
    pub fn update_preferences(&mut self, partial: &Value) -> Result<Vec<String>, StoreError> {
        let Some(incoming) = partial.as_object() else {
            return Ok(Vec::new());
        };
        let merged = validate::merge_preferences(&self.prefs, incoming);
        if !merged.rejected.is_empty() {
            tracing::warn!(rejected = ?merged.rejected, "ignored unknown or invalid preferences");
        }
        if merged.preferences == self.prefs {
            return Ok(Vec::new());
        }
        self.prefs = merged.preferences;
        let written = self.commit(
            Collection::Preferences,
            ChangeAction::Update,
            Some(json!({ "keys": merged.applied })),
        );
        let trimmed = self.cleanup_recently_viewed_at(Utc::now());
        written?;
        trimmed?;
        Ok(merged.applied)
    }
}

/// Serializable view used by export and backup payloads.
#[derive(Serialize)]
pub(crate) struct CollectionsView<'a> {
    pub favorites: &'a [FavoriteEntry],
    pub compare_items: &'a [CompareEntry],
    pub recently_viewed: &'a [RecentEntry],
    pub price_alerts: &'a [PriceAlert],
    pub search_history: &'a [SearchHistoryEntry],
    pub user_preferences: &'a UserPreferences,
}

impl LocalStore {
    pub(crate) fn collections_view(&self) -> CollectionsView<'_> {
        CollectionsView {
            favorites: &self.favorites,
            compare_items: &self.compare,
            recently_viewed: &self.recent,
            price_alerts: &self.alerts,
            search_history: &self.history,
            user_preferences: &self.prefs,
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
