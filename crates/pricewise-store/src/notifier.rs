//! Publish/subscribe channel announcing store mutations.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::model::Collection;

const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Add,
    Remove,
    Update,
    Clear,
    Import,
    Repair,
    Restore,
    ExternalUpdate,
    Cleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub action: ChangeAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ChangeEvent {
    /// `true` when the event concerns `collection`, counting
    /// [`Collection::All`] as a match for every collection.
    #[must_use]
    pub fn affects(&self, collection: Collection) -> bool {
        self.collection == collection || self.collection == Collection::All
    }
}

/// Cloneable handle onto one broadcast channel. The store owns a handle and
/// publishes; consumers call [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, collection: Collection, action: ChangeAction, payload: Option<Value>) {
        let event = ChangeEvent {
            collection,
            action,
            payload,
        };
        tracing::debug!(%collection, ?action, "store changed");
        // Publishing without subscribers is fine.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let notifier = ChangeNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish(
            Collection::Favorites,
            ChangeAction::Add,
            Some(json!({"id": "fs_1"})),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, Collection::Favorites);
        assert_eq!(event.action, ChangeAction::Add);
        assert_eq!(event.payload, Some(json!({"id": "fs_1"})));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        ChangeNotifier::new(4).publish(Collection::All, ChangeAction::Clear, None);
    }

    #[test]
    fn all_affects_every_collection() {
        let event = ChangeEvent {
            collection: Collection::All,
            action: ChangeAction::Import,
            payload: None,
        };
        assert!(event.affects(Collection::PriceAlerts));

        let event = ChangeEvent {
            collection: Collection::Compare,
            action: ChangeAction::Clear,
            payload: None,
        };
        assert!(!event.affects(Collection::Favorites));
    }

    #[test]
    fn actions_serialize_snake_case() {
        let value = serde_json::to_value(ChangeAction::ExternalUpdate).unwrap();
        assert_eq!(value, json!("external_update"));
    }
}
