//! Background tasks around a shared [`LocalStore`]: reconciling writes made
//! by other contexts, and periodically flushing unsaved collections.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::storage::{ExternalChange, ExternalChanges};
use crate::store::LocalStore;

pub type SharedStore = Arc<Mutex<LocalStore>>;

/// Applies every change another context makes to the shared storage until
/// the backend goes away.
pub fn spawn_external_sync(store: SharedStore, mut changes: ExternalChanges) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(change) = changes.recv().await {
            let mut guard = store.lock().await;
            match change {
                ExternalChange::Key(key) => match guard.apply_external_change(&key) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(key, "ignored external change to non-collection key");
                    }
                    Err(e) => {
                        tracing::warn!(key, error = %e, "failed to reload externally changed collection");
                    }
                },
                ExternalChange::Resync => {
                    if let Err(e) = guard.resync_all() {
                        tracing::warn!(error = %e, "failed to reload collections after missed changes");
                    }
                }
            }
        }
        tracing::debug!("external change stream closed");
    })
}

/// Handle to the periodic flush task.
pub struct AutosaveHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Stops the task after one final flush.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "autosave task ended abnormally");
        }
    }
}

async fn flush(store: &SharedStore) {
    let mut guard = store.lock().await;
    if !guard.preferences().auto_save {
        return;
    }
    match guard.flush() {
        Ok(0) => {}
        Ok(written) => tracing::debug!(written, "autosave flushed collections"),
        Err(e) => tracing::warn!(error = %e, "autosave flush failed"),
    }
}

/// Flushes dirty collections every `every` and once more on stop. Both
/// are skipped while the `auto_save` preference is off.
#[must_use]
pub fn spawn_autosave(store: SharedStore, every: Duration) -> AutosaveHandle {
    let (tx, mut rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => flush(&store).await,
                _ = &mut rx => {
                    flush(&store).await;
                    break;
                }
            }
        }
    });
    AutosaveHandle {
        shutdown: Some(tx),
        task,
    }
}
