//! Per-consumer latest-value map.

use super::decode::{decode, Payload};
use crate::types::Topic;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable map from topic to its most recent decoded payload.
pub type LatestValues = HashMap<Topic, Payload>;

/// Latest decoded value per topic for one consumer.
///
/// Every update publishes a fresh snapshot; snapshots already handed out are
/// never mutated. Clones share the same map.
#[derive(Clone)]
pub struct LatestValueStore {
    tx: Arc<watch::Sender<Arc<LatestValues>>>,
}

impl LatestValueStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(LatestValues::new()));
        Self { tx: Arc::new(tx) }
    }

    /// Decode `raw` and make it the value for `topic`. Other topics keep
    /// their values.
    pub fn on_message(&self, topic: &Topic, raw: &str) {
        let payload = decode(raw);
        self.tx.send_modify(|values| {
            Arc::make_mut(values).insert(topic.clone(), payload);
        });
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<LatestValues> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn get(&self, topic: &str) -> Option<Payload> {
        self.tx.borrow().get(topic).cloned()
    }

    /// Receiver notified on every update.
    pub fn watch(&self) -> watch::Receiver<Arc<LatestValues>> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }
}

impl Default for LatestValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_replaces_only_that_topic() {
        let store = LatestValueStore::new();
        let a = Topic::new("/topic/a");
        let b = Topic::new("/topic/b");

        store.on_message(&a, r#"{"v": 1}"#);
        store.on_message(&b, r#"{"v": 2}"#);
        store.on_message(&a, r#"{"v": 3}"#);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("/topic/a"), Some(Payload::Structured(json!({"v": 3}))));
        assert_eq!(store.get("/topic/b"), Some(Payload::Structured(json!({"v": 2}))));
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let store = LatestValueStore::new();
        let topic = Topic::new("/topic/a");

        store.on_message(&topic, "1");
        let before = store.snapshot();
        store.on_message(&topic, "2");

        assert_eq!(before.get("/topic/a"), Some(&Payload::Structured(json!(1))));
        assert_eq!(
            store.snapshot().get("/topic/a"),
            Some(&Payload::Structured(json!(2)))
        );
    }

    #[test]
    fn test_raw_body_stored_on_decode_failure() {
        let store = LatestValueStore::new();
        store.on_message(&Topic::new("/topic/a"), "{not json");
        assert_eq!(
            store.get("/topic/a"),
            Some(Payload::Raw("{not json".to_string()))
        );
    }

    #[tokio::test]
    async fn test_watch_sees_updates() {
        let store = LatestValueStore::new();
        let mut rx = store.watch();

        store.on_message(&Topic::new("/topic/a"), "true");
        rx.changed().await.unwrap();

        assert_eq!(
            rx.borrow().get("/topic/a"),
            Some(&Payload::Structured(json!(true)))
        );
    }
}
