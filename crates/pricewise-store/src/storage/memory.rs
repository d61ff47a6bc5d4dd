use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use super::{ExternalChanges, Storage, StorageEvent};
use crate::error::StorageError;

const EVENT_CAPACITY: usize = 256;

struct Shared {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    quota: Option<usize>,
    next_origin: AtomicU64,
}

/// In-process storage that several handles ("tabs") can share.
///
/// Every handle obtained through [`MemoryStorage::open_tab`] sees the same
/// entries; writes made through one handle are reported to the others via
/// [`Storage::watch`]. An optional byte quota (keys plus values) mimics a
/// browser's storage limit.
#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
    origin: u64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self::build(Some(bytes))
    }

    fn build(quota: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                events,
                quota,
                next_origin: AtomicU64::new(1),
            }),
            origin: 0,
        }
    }

    /// A new handle onto the same data with its own origin id.
    #[must_use]
    pub fn open_tab(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            origin: self.shared.next_origin.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Total bytes currently held (keys plus values).
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        used(&self.entries())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn announce(&self, key: &str) {
        // No receivers simply means no other tab is listening.
        let _ = self.shared.events.send(StorageEvent {
            key: key.to_string(),
            origin: self.origin,
        });
    }
}

fn used(entries: &HashMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        {
            let mut entries = self.entries();
            if let Some(quota) = self.shared.quota {
                let current = used(&entries);
                let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
                let needed = key.len() + value.len();
                let available = quota.saturating_sub(current - replaced);
                if needed > available {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        needed,
                        available,
                    });
                }
            }
            entries.insert(key.to_string(), value.to_string());
        }
        self.announce(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.entries().remove(key).is_some();
        if removed {
            self.announce(key);
        }
        Ok(())
    }

    fn watch(&self) -> Option<ExternalChanges> {
        Some(ExternalChanges::new(
            self.shared.events.subscribe(),
            self.origin,
        ))
    }
}
