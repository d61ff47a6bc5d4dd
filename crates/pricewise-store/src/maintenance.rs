//! Import/export, backup/restore, repair and storage housekeeping.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::model::{Collection, UserPreferences, BACKUP_KEY, FORMAT_VERSION};
use crate::notifier::ChangeAction;
use crate::store::{CollectionsView, LocalStore};
use crate::validate;

#[derive(Serialize)]
struct ExportDocument<'a> {
    version: &'static str,
    exported_at: DateTime<Utc>,
    data: CollectionsView<'a>,
}

#[derive(Serialize)]
struct BackupDocument<'a> {
    timestamp: DateTime<Utc>,
    version: &'static str,
    data: CollectionsView<'a>,
}

#[derive(Deserialize)]
struct StoredBackup {
    timestamp: DateTime<Utc>,
    data: Value,
}

/// What happened to one collection during an import or restore.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Replaced with `count` valid entries (keys, for preferences).
    Imported { count: usize },
    /// Present but not the right shape; the existing data was kept.
    Rejected { reason: String },
    /// Absent from the payload.
    Skipped,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub collections: Vec<(Collection, ImportOutcome)>,
}

impl ImportReport {
    #[must_use]
    pub fn outcome(&self, collection: Collection) -> Option<&ImportOutcome> {
        self.collections
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, o)| o)
    }

    #[must_use]
    pub fn imported(&self) -> Vec<Collection> {
        self.collections
            .iter()
            .filter(|(_, o)| matches!(o, ImportOutcome::Imported { .. }))
            .map(|(c, _)| *c)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub duplicate_favorites_removed: usize,
    pub invalid_alerts_removed: usize,
    pub duplicate_alerts_removed: usize,
    pub alert_ids_assigned: usize,
    pub timestamps_backfilled: usize,
}

impl RepairReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        *self != Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyUsage {
    pub key: String,
    pub bytes: usize,
    /// Array length, or number of fields for object documents.
    pub items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub keys: Vec<KeyUsage>,
    pub total_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub before_bytes: usize,
    pub after_bytes: usize,
    pub recent_removed: usize,
}

impl LocalStore {
    /// Serializes every collection with the format version tag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if a collection cannot be encoded.
    pub fn export(&self) -> Result<String, StoreError> {
        let document = ExportDocument {
            version: FORMAT_VERSION,
            exported_at: Utc::now(),
            data: self.collections_view(),
        };
        serde_json::to_string_pretty(&document).map_err(|e| StoreError::Serialize {
            context: "export".to_string(),
            source: e,
        })
    }

    /// Imports an export payload.
    ///
    /// The payload must parse and carry a `data` object, otherwise nothing is
    /// touched. Each collection found in `data` is then validated with the
    /// load-time rules and replaces the current one; preferences merge their
    /// known keys. Collections that are present but malformed are rejected
    /// individually.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Deserialize`] for unparseable input,
    /// [`StoreError::InvalidImport`] when `data` is missing, or the first
    /// storage failure while persisting.
    pub fn import(&mut self, payload: &str) -> Result<ImportReport, StoreError> {
        let document: Value =
            serde_json::from_str(payload).map_err(|e| StoreError::Deserialize {
                context: "import payload".to_string(),
                source: e,
            })?;
        let Some(data) = document.get("data").and_then(Value::as_object) else {
            return Err(StoreError::InvalidImport(
                "missing or non-object \"data\" field".to_string(),
            ));
        };
        if let Some(version) = document.get("version").and_then(Value::as_str) {
            if version != FORMAT_VERSION {
                tracing::warn!(version, expected = FORMAT_VERSION, "importing payload with a different version tag");
            }
        }

        let report = self.apply_snapshot(data);
        self.persist_imported(&report)?;
        self.cleanup_recently_viewed_at(Utc::now())?;
        tracing::info!(imported = ?report.imported(), "import complete");
        self.notifier.publish(
            Collection::All,
            ChangeAction::Import,
            serde_json::to_value(&report).ok(),
        );
        Ok(report)
    }

    fn persist_imported(&mut self, report: &ImportReport) -> Result<(), StoreError> {
        let mut first_error = None;
        for collection in report.imported() {
            if let Err(e) = self.persist(collection) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Replaces collections in memory from `data`. Never fails; shape
    /// problems are reported per collection.
    fn apply_snapshot(&mut self, data: &Map<String, Value>) -> ImportReport {
        let now = Utc::now();
        let mut report = ImportReport::default();
        // Preferences first so the recently-viewed capacity is current.
        let order = [
            Collection::Preferences,
            Collection::Favorites,
            Collection::Compare,
            Collection::RecentlyViewed,
            Collection::PriceAlerts,
            Collection::SearchHistory,
        ];
        for collection in order {
            let incoming = collection
                .import_names()
                .iter()
                .find_map(|name| data.get(*name));
            let outcome = match incoming {
                None => ImportOutcome::Skipped,
                Some(value) => self.apply_collection(collection, value, now),
            };
            if let ImportOutcome::Rejected { reason } = &outcome {
                tracing::warn!(%collection, reason = %reason, "rejected imported collection");
            }
            report.collections.push((collection, outcome));
        }
        report
    }

    fn apply_collection(
        &mut self,
        collection: Collection,
        value: &Value,
        now: DateTime<Utc>,
    ) -> ImportOutcome {
        if collection == Collection::Preferences {
            let Some(map) = value.as_object() else {
                return ImportOutcome::Rejected {
                    reason: format!("expected an object, got {}", validate::json_kind(value)),
                };
            };
            let merged = validate::merge_preferences(&self.prefs, map);
            self.prefs = merged.preferences;
            return ImportOutcome::Imported {
                count: merged.applied.len(),
            };
        }

        let Some(items) = value.as_array() else {
            return ImportOutcome::Rejected {
                reason: format!("expected an array, got {}", validate::json_kind(value)),
            };
        };
        let items = items.clone();
        let count = match collection {
            Collection::Favorites => {
                self.favorites = validate::favorites(items);
                self.favorites.len()
            }
            Collection::Compare => {
                self.compare = validate::compare(items);
                self.compare.len()
            }
            Collection::RecentlyViewed => {
                self.recent = validate::recently_viewed(items, self.prefs.recent_capacity(), now);
                self.recent.len()
            }
            Collection::PriceAlerts => {
                self.alerts = validate::price_alerts(items);
                self.alerts.len()
            }
            Collection::SearchHistory => {
                self.history = validate::search_history(items);
                self.history.len()
            }
            Collection::Preferences | Collection::All => 0,
        };
        ImportOutcome::Imported { count }
    }

    /// Stores a snapshot of every collection under the backup key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be encoded or written.
    pub fn create_backup(&self) -> Result<DateTime<Utc>, StoreError> {
        let timestamp = Utc::now();
        let document = BackupDocument {
            timestamp,
            version: FORMAT_VERSION,
            data: self.collections_view(),
        };
        let json = serde_json::to_string(&document).map_err(|e| StoreError::Serialize {
            context: "backup".to_string(),
            source: e,
        })?;
        self.storage.set(BACKUP_KEY, &json)?;
        tracing::info!(%timestamp, bytes = json.len(), "backup created");
        Ok(timestamp)
    }

    /// Replaces live collections with the stored snapshot. Returns the
    /// snapshot's timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BackupNotFound`] when no snapshot exists,
    /// [`StoreError::InvalidBackup`] when it cannot be read, or a storage
    /// failure while persisting the restored collections.
    pub fn restore_backup(&mut self) -> Result<DateTime<Utc>, StoreError> {
        let raw = self
            .storage
            .get(BACKUP_KEY)?
            .ok_or(StoreError::BackupNotFound)?;
        let backup: StoredBackup = serde_json::from_str(&raw)
            .map_err(|e| StoreError::InvalidBackup(e.to_string()))?;
        let Some(data) = backup.data.as_object() else {
            return Err(StoreError::InvalidBackup(
                "snapshot data is not an object".to_string(),
            ));
        };

        let report = self.apply_snapshot(data);
        self.persist_imported(&report)?;
        self.cleanup_recently_viewed_at(Utc::now())?;
        tracing::info!(timestamp = %backup.timestamp, "backup restored");
        self.notifier.publish(
            Collection::All,
            ChangeAction::Restore,
            Some(serde_json::json!({ "timestamp": backup.timestamp })),
        );
        Ok(backup.timestamp)
    }

    /// Deduplicates favorites by id, drops alerts without a product id or a
    /// positive target, keeps one pending alert per product, and backfills
    /// missing alert ids and timestamps.
    /// Running it again on repaired state changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a repaired collection cannot be written.
    pub fn repair(&mut self) -> Result<RepairReport, StoreError> {
        let now = Utc::now();
        let mut report = RepairReport::default();
        let mut touched = Vec::new();

        let mut seen = HashSet::new();
        let before = self.favorites.len();
        self.favorites.retain(|f| seen.insert(f.product.id.clone()));
        report.duplicate_favorites_removed = before - self.favorites.len();
        let mut favorites_touched = report.duplicate_favorites_removed > 0;
        for entry in &mut self.favorites {
            if entry.added_at.is_none() {
                entry.added_at = Some(now);
                report.timestamps_backfilled += 1;
                favorites_touched = true;
            }
        }
        if favorites_touched {
            touched.push(Collection::Favorites);
        }

        let mut compare_touched = false;
        for entry in &mut self.compare {
            if entry.added_at.is_none() {
                entry.added_at = Some(now);
                report.timestamps_backfilled += 1;
                compare_touched = true;
            }
        }
        if compare_touched {
            touched.push(Collection::Compare);
        }

        let before = self.alerts.len();
        self.alerts
            .retain(|a| !a.product_id.trim().is_empty() && validate::valid_target(a.target_price));
        report.invalid_alerts_removed = before - self.alerts.len();
        report.duplicate_alerts_removed = validate::collapse_pending_alerts(&mut self.alerts);
        let mut alerts_touched =
            report.invalid_alerts_removed > 0 || report.duplicate_alerts_removed > 0;
        for alert in &mut self.alerts {
            if alert.id.trim().is_empty() {
                alert.id = uuid::Uuid::new_v4().to_string();
                report.alert_ids_assigned += 1;
                alerts_touched = true;
            }
            if alert.created_at.is_none() {
                alert.created_at = Some(now);
                report.timestamps_backfilled += 1;
                alerts_touched = true;
            }
        }
        if alerts_touched {
            touched.push(Collection::PriceAlerts);
        }

        if !report.changed() {
            tracing::debug!("repair found nothing to fix");
            return Ok(report);
        }

        let mut first_error = None;
        for collection in touched {
            if let Err(e) = self.persist(collection) {
                first_error.get_or_insert(e);
            }
        }
        tracing::info!(?report, "store repaired");
        self.notifier.publish(
            Collection::All,
            ChangeAction::Repair,
            serde_json::to_value(&report).ok(),
        );
        first_error.map_or(Ok(report), Err)
    }

    /// Describes integrity problems without changing anything.
    #[must_use]
    pub fn validate_integrity(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for entry in &self.favorites {
            if !seen.insert(entry.product.id.as_str()) {
                issues.push(format!("duplicate favorite {}", entry.product.id));
            }
            if entry.added_at.is_none() {
                issues.push(format!("favorite {} has no added timestamp", entry.product.id));
            }
        }

        if self.compare.len() > crate::model::COMPARE_CAPACITY {
            issues.push(format!(
                "compare set holds {} items, capacity is {}",
                self.compare.len(),
                crate::model::COMPARE_CAPACITY
            ));
        }

        if self.recent.len() > self.prefs.recent_capacity() {
            issues.push(format!(
                "recently viewed holds {} items, capacity is {}",
                self.recent.len(),
                self.prefs.recent_capacity()
            ));
        }

        for alert in &self.alerts {
            let label = if alert.id.is_empty() {
                format!("alert for {}", alert.product_id)
            } else {
                format!("alert {}", alert.id)
            };
            if alert.id.trim().is_empty() {
                issues.push(format!("{label} has no id"));
            }
            if alert.product_id.trim().is_empty() {
                issues.push(format!("{label} has no product id"));
            }
            if !validate::valid_target(alert.target_price) {
                issues.push(format!("{label} has invalid target price {}", alert.target_price));
            }
        }
        let mut pending = HashSet::new();
        for alert in self.alerts.iter().filter(|a| a.is_pending()) {
            if !pending.insert(alert.product_id.as_str()) {
                issues.push(format!("product {} has more than one pending alert", alert.product_id));
            }
        }

        for collection in Collection::PERSISTED {
            if self.dirty.contains(&collection) {
                issues.push(format!("{collection} has unsaved changes"));
            }
        }
        issues
    }

    /// Bytes held per stored key, including the backup snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] when a key cannot be read.
    pub fn storage_usage(&self) -> Result<StorageUsage, StoreError> {
        let keys = Collection::PERSISTED
            .iter()
            .filter_map(|c| c.storage_key())
            .chain(std::iter::once(BACKUP_KEY));

        let mut usage = StorageUsage::default();
        for key in keys {
            let Some(raw) = self.storage.get(key)? else {
                continue;
            };
            let items = match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => items.len(),
                Ok(Value::Object(map)) => map.len(),
                _ => 0,
            };
            let bytes = key.len() + raw.len();
            usage.total_bytes += bytes;
            usage.keys.push(KeyUsage {
                key: key.to_string(),
                bytes,
                items,
            });
        }
        Ok(usage)
    }

    /// Drops product descriptions from recently-viewed snapshots and runs the
    /// age and capacity eviction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when usage cannot be read or the trimmed
    /// collection cannot be written.
    pub fn optimize_storage(&mut self) -> Result<OptimizeReport, StoreError> {
        let before_bytes = self.storage_usage()?.total_bytes;
        let before_len = self.recent.len();
        let had_descriptions = self
            .recent
            .iter()
            .any(|r| !r.product.description.is_empty());

        self.slim_recent(Utc::now());
        let recent_removed = before_len - self.recent.len();

        if had_descriptions || recent_removed > 0 {
            self.commit(
                Collection::RecentlyViewed,
                ChangeAction::Cleanup,
                Some(serde_json::json!({ "removed": recent_removed })),
            )?;
        }
        let after_bytes = self.storage_usage()?.total_bytes;
        tracing::info!(before_bytes, after_bytes, recent_removed, "storage optimized");
        Ok(OptimizeReport {
            before_bytes,
            after_bytes,
            recent_removed,
        })
    }

    /// Empties every collection and restores default preferences. The
    /// backup snapshot is left alone.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure; other collections are still reset.
    pub fn reset_to_defaults(&mut self) -> Result<(), StoreError> {
        self.favorites.clear();
        self.compare.clear();
        self.recent.clear();
        self.alerts.clear();
        self.history.clear();
        self.prefs = UserPreferences::default();

        let mut first_error = None;
        for collection in Collection::PERSISTED {
            let Some(key) = collection.storage_key() else {
                continue;
            };
            match self.storage.remove(key) {
                Ok(()) => {
                    self.dirty.remove(&collection);
                }
                Err(e) => {
                    self.dirty.insert(collection);
                    first_error.get_or_insert(StoreError::from(e));
                }
            }
        }
        tracing::info!("store reset to defaults");
        self.notifier.publish(Collection::All, ChangeAction::Clear, None);
        first_error.map_or(Ok(()), Err)
    }
}
