//! Shape rules applied to every collection read from storage, an import
//! payload or a backup.
//!
//! Anything that is not an array becomes an empty collection, entries that
//! fail to decode or lack an id are dropped, and the capacity and age
//! bounds are re-established. The rules never fail; they only discard.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::{
    normalize_query, Collection, CompareEntry, FavoriteEntry, PriceAlert, RecentEntry,
    SearchHistoryEntry, UserPreferences, COMPARE_CAPACITY, RECENT_MAX_AGE_DAYS,
    SEARCH_HISTORY_CAP,
};

/// Parses a stored document. Unparseable bytes are logged and treated as
/// absent.
pub(crate) fn parse_document(collection: Collection, raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(%collection, error = %e, "stored collection is not valid JSON, resetting");
            None
        }
    }
}

/// The array items of `value`; anything else yields an empty list.
pub(crate) fn array_items(collection: Collection, value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(
                %collection,
                kind = json_kind(&other),
                "stored collection is not an array, resetting"
            );
            Vec::new()
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn log_dropped(collection: Collection, before: usize, after: usize) {
    if after < before {
        tracing::warn!(%collection, dropped = before - after, "dropped invalid entries");
    }
}

fn decode<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

pub(crate) fn favorites(items: Vec<Value>) -> Vec<FavoriteEntry> {
    let before = items.len();
    let mut entries: Vec<FavoriteEntry> = decode(items);
    entries.retain(|e| !e.product.id.is_empty());
    log_dropped(Collection::Favorites, before, entries.len());
    entries
}

pub(crate) fn compare(items: Vec<Value>) -> Vec<CompareEntry> {
    let before = items.len();
    let mut seen = HashSet::new();
    let mut entries: Vec<CompareEntry> = decode(items);
    entries.retain(|e| !e.product.id.is_empty() && seen.insert(e.product.id.clone()));
    entries.truncate(COMPARE_CAPACITY);
    log_dropped(Collection::Compare, before, entries.len());
    entries
}

pub(crate) fn recently_viewed(
    items: Vec<Value>,
    capacity: usize,
    now: DateTime<Utc>,
) -> Vec<RecentEntry> {
    let before = items.len();
    let mut entries: Vec<RecentEntry> = decode(items);
    entries.retain(|e| !e.product.id.is_empty());
    evict_recent(&mut entries, capacity, now);
    log_dropped(Collection::RecentlyViewed, before, entries.len());
    entries
}

/// Orders newest first, keeps one entry per id, drops entries without a
/// view time or older than the age limit, then truncates to `capacity`.
/// Returns the number of entries removed.
pub(crate) fn evict_recent(
    entries: &mut Vec<RecentEntry>,
    capacity: usize,
    now: DateTime<Utc>,
) -> usize {
    let before = entries.len();
    let cutoff = now - Duration::days(RECENT_MAX_AGE_DAYS);
    entries.retain(|e| e.viewed_at.is_some_and(|t| t > cutoff));
    entries.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.product.id.clone()));
    entries.truncate(capacity);
    before - entries.len()
}

/// A target price an alert can meaningfully wait for.
pub(crate) fn valid_target(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Alerts need a product id and a positive target, and each product keeps
/// at most one pending alert.
pub(crate) fn price_alerts(items: Vec<Value>) -> Vec<PriceAlert> {
    let before = items.len();
    let mut alerts: Vec<PriceAlert> = decode(items);
    alerts.retain(|a| !a.product_id.trim().is_empty() && valid_target(a.target_price));
    collapse_pending_alerts(&mut alerts);
    log_dropped(Collection::PriceAlerts, before, alerts.len());
    alerts
}

/// Keeps only the newest pending alert per product (latest `created_at`,
/// later position on a tie). Triggered and inactive alerts are untouched.
/// Returns the number of alerts removed.
pub(crate) fn collapse_pending_alerts(alerts: &mut Vec<PriceAlert>) -> usize {
    let mut newest: HashMap<String, (Option<DateTime<Utc>>, usize)> = HashMap::new();
    for (idx, alert) in alerts.iter().enumerate() {
        if !alert.is_pending() {
            continue;
        }
        let rank = (alert.created_at, idx);
        newest
            .entry(alert.product_id.clone())
            .and_modify(|best| {
                if rank > *best {
                    *best = rank;
                }
            })
            .or_insert(rank);
    }

    let before = alerts.len();
    let mut idx = 0;
    alerts.retain(|alert| {
        let keep = !alert.is_pending()
            || newest
                .get(&alert.product_id)
                .is_some_and(|&(_, winner)| winner == idx);
        idx += 1;
        keep
    });
    before - alerts.len()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHistoryEntry {
    Text(String),
    Entry(SearchHistoryEntry),
}

pub(crate) fn search_history(items: Vec<Value>) -> Vec<SearchHistoryEntry> {
    let before = items.len();
    let mut seen = HashSet::new();
    let entries: Vec<SearchHistoryEntry> = decode::<RawHistoryEntry>(items)
        .into_iter()
        .filter_map(|raw| {
            let (query, timestamp) = match raw {
                RawHistoryEntry::Text(q) => (q, None),
                RawHistoryEntry::Entry(e) => (e.query, e.timestamp),
            };
            normalize_query(&query).map(|query| SearchHistoryEntry { query, timestamp })
        })
        .filter(|e| seen.insert(e.query.clone()))
        .take(SEARCH_HISTORY_CAP)
        .collect();
    log_dropped(Collection::SearchHistory, before, entries.len());
    entries
}

pub(crate) fn preferences(value: Option<Value>) -> UserPreferences {
    let defaults = UserPreferences::default();
    match value {
        None | Some(Value::Null) => defaults,
        Some(Value::Object(map)) => {
            let merged = merge_preferences(&defaults, &map);
            if !merged.rejected.is_empty() {
                tracing::warn!(rejected = ?merged.rejected, "ignored invalid stored preferences");
            }
            merged.preferences
        }
        Some(other) => {
            tracing::warn!(kind = json_kind(&other), "stored preferences are not an object, using defaults");
            defaults
        }
    }
}

pub(crate) struct MergedPreferences {
    pub preferences: UserPreferences,
    pub applied: Vec<String>,
    pub rejected: Vec<String>,
}

/// Applies each known key of `incoming` over `base`, one at a time. Keys
/// that are unknown or whose value has the wrong type are rejected without
/// affecting the others.
pub(crate) fn merge_preferences(
    base: &UserPreferences,
    incoming: &Map<String, Value>,
) -> MergedPreferences {
    let mut applied = Vec::new();
    let mut rejected = Vec::new();

    let Ok(Value::Object(mut current)) = serde_json::to_value(base) else {
        return MergedPreferences {
            preferences: base.clone(),
            applied,
            rejected: incoming.keys().cloned().collect(),
        };
    };

    for (key, value) in incoming {
        if !current.contains_key(key) {
            rejected.push(key.clone());
            continue;
        }
        let mut candidate = current.clone();
        candidate.insert(key.clone(), value.clone());
        if serde_json::from_value::<UserPreferences>(Value::Object(candidate.clone())).is_ok() {
            current = candidate;
            applied.push(key.clone());
        } else {
            rejected.push(key.clone());
        }
    }

    let preferences =
        serde_json::from_value(Value::Object(current)).unwrap_or_else(|_| base.clone());
    MergedPreferences {
        preferences,
        applied,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn non_array_documents_become_empty() {
        assert!(array_items(Collection::Favorites, Some(json!({"id": "fs_1"}))).is_empty());
        assert!(array_items(Collection::Favorites, Some(json!("oops"))).is_empty());
        assert!(array_items(Collection::Favorites, None).is_empty());
        assert_eq!(array_items(Collection::Favorites, Some(json!([1, 2]))).len(), 2);
    }

    #[test]
    fn unparseable_documents_are_absent() {
        assert!(parse_document(Collection::Compare, Some("{not json")).is_none());
        assert!(parse_document(Collection::Compare, Some("[]")).is_some());
    }

    #[test]
    fn favorites_drop_entries_without_id() {
        let entries = favorites(vec![
            json!({"id": "fs_1", "title": "Backpack"}),
            json!({"title": "No id"}),
            json!({"id": "  ", "title": "Blank id"}),
            json!(42),
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product.id, "fs_1");
    }

    #[test]
    fn compare_is_deduplicated_and_capped() {
        let items = (0..6)
            .map(|i| json!({"id": format!("dj_{}", i % 5), "title": format!("Item {i}")}))
            .collect();
        let entries = compare(items);
        assert_eq!(entries.len(), COMPARE_CAPACITY);
        assert_eq!(entries[0].product.id, "dj_0");
    }

    #[test]
    fn recently_viewed_evicts_old_missing_and_excess() {
        let items = vec![
            json!({"id": "a", "viewed_at": "2026-05-31T00:00:00Z"}),
            json!({"id": "b", "viewed_at": "2026-04-01T00:00:00Z"}),
            json!({"id": "c"}),
            json!({"id": "d", "viewed_at": "2026-05-30T00:00:00Z"}),
            json!({"id": "e", "viewed_at": "2026-06-01T00:00:00Z"}),
            json!({"id": "a", "viewed_at": "2026-05-01T00:00:00Z"}),
        ];
        let entries = recently_viewed(items, 2, now());
        let ids: Vec<_> = entries.iter().map(|e| e.product.id.as_str()).collect();
        assert_eq!(ids, ["e", "a"]);
    }

    #[test]
    fn price_alerts_require_product_id() {
        let alerts = price_alerts(vec![
            json!({"id": "x1", "product_id": "fs_1", "target_price": 10.0}),
            json!({"id": "x2", "target_price": 10.0}),
            json!({"id": "x3", "product_id": null, "target_price": 10.0}),
        ]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "x1");
    }

    #[test]
    fn price_alerts_drop_unusable_targets() {
        let alerts = price_alerts(vec![
            json!({"id": "zero", "product_id": "fs_1", "target_price": 0}),
            json!({"id": "negative", "product_id": "fs_2", "target_price": -5.0}),
            json!({"id": "missing", "product_id": "fs_3"}),
            json!({"id": "ok", "product_id": "fs_4", "target_price": 19.99}),
        ]);
        let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["ok"]);
    }

    #[test]
    fn one_pending_alert_survives_per_product() {
        let alerts = price_alerts(vec![
            json!({"id": "old", "product_id": "p1", "target_price": 50.0,
                   "created_at": "2026-05-02T00:00:00Z"}),
            json!({"id": "new", "product_id": "p1", "target_price": 45.0,
                   "created_at": "2026-05-03T00:00:00Z"}),
            json!({"id": "undated", "product_id": "p1", "target_price": 48.0}),
            json!({"id": "fired", "product_id": "p1", "target_price": 60.0,
                   "triggered": true, "triggered_price": 58.0}),
            json!({"id": "a", "product_id": "p2", "target_price": 9.0}),
            json!({"id": "b", "product_id": "p2", "target_price": 8.0}),
        ]);
        let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["new", "fired", "b"]);
    }

    #[test]
    fn search_history_accepts_strings_and_entries() {
        let entries = search_history(vec![
            json!("  Laptop "),
            json!({"query": "LAPTOP", "timestamp": "2026-05-01T00:00:00Z"}),
            json!({"query": "phone case"}),
            json!("x"),
            json!(7),
        ]);
        let queries: Vec<_> = entries.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, ["laptop", "phone case"]);
    }

    #[test]
    fn search_history_is_capped() {
        let items = (0..30).map(|i| json!(format!("query {i}"))).collect();
        assert_eq!(search_history(items).len(), SEARCH_HISTORY_CAP);
    }

    #[test]
    fn preferences_merge_rejects_unknown_and_mistyped_keys() {
        let incoming = json!({
            "theme": "dark",
            "page_size": "twenty",
            "favourite_colour": "blue",
            "min_rating": 4
        });
        let merged = merge_preferences(&UserPreferences::default(), incoming.as_object().unwrap());

        assert_eq!(merged.preferences.theme, "dark");
        assert!((merged.preferences.min_rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(merged.preferences.page_size, 20);
        let mut applied = merged.applied.clone();
        applied.sort();
        let mut rejected = merged.rejected.clone();
        rejected.sort();
        assert_eq!(applied, ["min_rating", "theme"]);
        assert_eq!(rejected, ["favourite_colour", "page_size"]);
    }

    #[test]
    fn preferences_non_object_falls_back_to_defaults() {
        assert_eq!(preferences(Some(json!([1]))), UserPreferences::default());
    }
}
