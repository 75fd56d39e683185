use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;

use progress_core::model::UserId;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("write rejected: {0}")]
    WriteRejected(String),
}

/// One delivery on a document subscription.
///
/// Documents travel as raw `serde_json::Value`s; structural validation is
/// the Sync Gateway's job, not the store's.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    /// A point-in-time read of the user's document (`None` if absent).
    Snapshot {
        user_id: UserId,
        document: Option<Value>,
    },
    /// The subscription failed; no further snapshots should be awaited.
    Error { user_id: UserId, message: String },
}

impl SnapshotEvent {
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        match self {
            SnapshotEvent::Snapshot { user_id, .. } | SnapshotEvent::Error { user_id, .. } => {
                user_id
            }
        }
    }
}

/// An open subscription to one user's document. Dropping it unsubscribes.
pub struct DocumentSubscription {
    user_id: UserId,
    receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
}

impl DocumentSubscription {
    #[must_use]
    pub fn new(user_id: UserId, receiver: mpsc::UnboundedReceiver<SnapshotEvent>) -> Self {
        Self { user_id, receiver }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Await the next snapshot; `None` once the store drops the feed.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.receiver.recv().await
    }
}

/// The remote, eventually consistent document store, keyed per user.
///
/// `subscribe` replays the current document as its first event and then
/// delivers every subsequent write, including writes from other sessions.
#[async_trait]
pub trait ProgressDocumentStore: Send + Sync {
    /// Fetch the user's document, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached.
    async fn get(&self, user_id: &UserId) -> Result<Option<Value>, StorageError>;

    /// Write the user's document. With `merge` set, top-level fields are
    /// overlaid onto any existing document instead of replacing it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected or the store cannot
    /// be reached.
    async fn set(&self, user_id: &UserId, document: Value, merge: bool)
    -> Result<(), StorageError>;

    /// Open a snapshot feed scoped to one user.
    fn subscribe(&self, user_id: &UserId) -> DocumentSubscription;
}

/// Local durable cache of the last known document per user.
#[async_trait]
pub trait ProgressCache: Send + Sync {
    /// Load the cached document for a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be read.
    async fn load(&self, user_id: &UserId) -> Result<Option<Value>, StorageError>;

    /// Store the latest document for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    async fn save(&self, user_id: &UserId, document: &Value) -> Result<(), StorageError>;

    /// Drop the cached document for a user (sign-out path).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache cannot be written.
    async fn clear(&self, user_id: &UserId) -> Result<(), StorageError>;
}

/// In-memory document store for tests and prototyping.
///
/// Behaves like the real backend's client: subscriptions replay the current
/// document immediately and see every later write. `fail_writes` simulates
/// a backend rejecting persists.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<UserId, Value>>>,
    subscribers: Arc<Mutex<Vec<(UserId, mpsc::UnboundedSender<SnapshotEvent>)>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail, to exercise the best-effort write
    /// path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn notify(&self, user_id: &UserId, document: Option<Value>) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|(subscribed_user, sender)| {
            if subscribed_user != user_id {
                return !sender.is_closed();
            }
            sender
                .send(SnapshotEvent::Snapshot {
                    user_id: user_id.clone(),
                    document: document.clone(),
                })
                .is_ok()
        });
    }
}

#[async_trait]
impl ProgressDocumentStore for InMemoryDocumentStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Value>, StorageError> {
        let documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(documents.get(user_id).cloned())
    }

    async fn set(
        &self,
        user_id: &UserId,
        document: Value,
        merge: bool,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected("simulated failure".to_owned()));
        }

        let merged = {
            let mut documents = self
                .documents
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let merged = match (merge, documents.get(user_id), &document) {
                (true, Some(Value::Object(existing)), Value::Object(incoming)) => {
                    let mut combined = existing.clone();
                    for (key, value) in incoming {
                        combined.insert(key.clone(), value.clone());
                    }
                    Value::Object(combined)
                }
                _ => document,
            };
            documents.insert(user_id.clone(), merged.clone());
            merged
        };

        self.notify(user_id, Some(merged));
        Ok(())
    }

    fn subscribe(&self, user_id: &UserId) -> DocumentSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let current = self
            .documents
            .lock()
            .map(|documents| documents.get(user_id).cloned())
            .unwrap_or_default();
        // Replay the current state as the first snapshot.
        let _ = sender.send(SnapshotEvent::Snapshot {
            user_id: user_id.clone(),
            document: current,
        });
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((user_id.clone(), sender));
        }
        DocumentSubscription::new(user_id.clone(), receiver)
    }
}

/// In-memory cache for tests.
#[derive(Clone, Default)]
pub struct InMemoryProgressCache {
    documents: Arc<Mutex<HashMap<UserId, Value>>>,
}

impl InMemoryProgressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressCache for InMemoryProgressCache {
    async fn load(&self, user_id: &UserId) -> Result<Option<Value>, StorageError> {
        let documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(documents.get(user_id).cloned())
    }

    async fn save(&self, user_id: &UserId, document: &Value) -> Result<(), StorageError> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        documents.insert(user_id.clone(), document.clone());
        Ok(())
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), StorageError> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        documents.remove(user_id);
        Ok(())
    }
}

/// Aggregates the remote store and local cache behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub remote: Arc<dyn ProgressDocumentStore>,
    pub cache: Arc<dyn ProgressCache>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            remote: Arc::new(InMemoryDocumentStore::new()),
            cache: Arc::new(InMemoryProgressCache::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> UserId {
        UserId::new("user-1")
    }

    #[tokio::test]
    async fn subscribe_replays_current_document_first() {
        let store = InMemoryDocumentStore::new();
        store
            .set(&user(), json!({"scrollProgress": {}}), false)
            .await
            .unwrap();

        let mut subscription = store.subscribe(&user());
        match subscription.next().await {
            Some(SnapshotEvent::Snapshot { document, .. }) => {
                assert_eq!(document, Some(json!({"scrollProgress": {}})));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribers_see_later_writes_for_their_user_only() {
        let store = InMemoryDocumentStore::new();
        let mut ours = store.subscribe(&user());
        let mut theirs = store.subscribe(&UserId::new("user-2"));
        ours.next().await.unwrap();
        theirs.next().await.unwrap();

        store.set(&user(), json!({"v": 1}), false).await.unwrap();

        match ours.next().await {
            Some(SnapshotEvent::Snapshot { document, .. }) => {
                assert_eq!(document, Some(json!({"v": 1})));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        // The other user's feed stays quiet.
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), theirs.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn merge_set_overlays_top_level_fields() {
        let store = InMemoryDocumentStore::new();
        store
            .set(&user(), json!({"a": 1, "b": 2}), false)
            .await
            .unwrap();
        store.set(&user(), json!({"b": 3}), true).await.unwrap();
        assert_eq!(store.get(&user()).await.unwrap(), Some(json!({"a": 1, "b": 3})));
    }

    #[tokio::test]
    async fn failed_writes_leave_the_document_untouched() {
        let store = InMemoryDocumentStore::new();
        store.set(&user(), json!({"v": 1}), false).await.unwrap();

        store.set_fail_writes(true);
        let err = store.set(&user(), json!({"v": 2}), false).await.unwrap_err();
        assert!(matches!(err, StorageError::WriteRejected(_)));
        assert_eq!(store.get(&user()).await.unwrap(), Some(json!({"v": 1})));
    }

    #[tokio::test]
    async fn cache_round_trips_and_clears() {
        let cache = InMemoryProgressCache::new();
        assert_eq!(cache.load(&user()).await.unwrap(), None);

        cache.save(&user(), &json!({"v": 1})).await.unwrap();
        assert_eq!(cache.load(&user()).await.unwrap(), Some(json!({"v": 1})));

        cache.clear(&user()).await.unwrap();
        assert_eq!(cache.load(&user()).await.unwrap(), None);
    }
}
