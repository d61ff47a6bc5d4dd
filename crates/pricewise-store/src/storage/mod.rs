//! Durable key/value backends for the local store.
//!
//! A [`Storage`] holds one serialized JSON document per key. Backends that
//! can be shared by several execution contexts (tabs) expose their writes
//! through [`Storage::watch`], so each context can reconcile changes it did
//! not make itself.

mod file;
mod memory;

use tokio::sync::broadcast;

use crate::error::StorageError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

pub trait Storage: Send + Sync {
    /// Returns the stored document for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the write would not fit,
    /// or [`StorageError::Io`] when the backend rejects it.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the backend rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribes to writes made by *other* handles onto the same backing
    /// data. `None` when the backend is not shared.
    fn watch(&self) -> Option<ExternalChanges> {
        None
    }
}

/// A write notification: `key` changed through the handle `origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: u64,
}

/// What [`ExternalChanges::recv`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalChange {
    /// Another handle wrote this key.
    Key(String),
    /// Notifications were dropped; any key may have changed.
    Resync,
}

/// Stream of keys changed by other handles.
pub struct ExternalChanges {
    rx: broadcast::Receiver<StorageEvent>,
    origin: u64,
}

impl ExternalChanges {
    pub(crate) fn new(rx: broadcast::Receiver<StorageEvent>, origin: u64) -> Self {
        Self { rx, origin }
    }

    /// Waits for the next key written by another handle. Own writes are
    /// skipped. A lagging listener gets [`ExternalChange::Resync`] instead
    /// of the keys it missed. Returns `None` once the backend is gone.
    pub async fn recv(&mut self) -> Option<ExternalChange> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.origin => {}
                Ok(event) => return Some(ExternalChange::Key(event.key)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "storage change listener lagged, requesting full reload");
                    return Some(ExternalChange::Resync);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
