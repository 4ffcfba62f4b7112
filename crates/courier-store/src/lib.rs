//! courier-store — key-value persistence and typed settings.
//!
//! The store is the generic substrate: async get/set over JSON values plus a
//! change subscription. The settings module layers typed accessors with
//! defaults on top of it.

pub mod settings;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store codec failed: {0}")]
    Codec(#[from] serde_json::Error),
}

/// One observed mutation. `area` names the storage area the change landed
/// in, so listeners watching several stores can tell them apart.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub area: &'static str,
}

/// Async get/set over JSON values, plus a change subscription.
#[allow(async_fn_in_trait)]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Typed helpers over any store.
#[allow(async_fn_in_trait)]
pub trait KvStoreExt: KvStore {
    /// Typed read. A missing key is `None`; a value that does not fit `T`
    /// is a codec error — callers with defaults flatten both to the default.
    async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_as<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.set(key, serde_json::to_value(value)?).await
    }
}

impl<S: KvStore> KvStoreExt for S {}

/// In-memory store. Concurrent, with broadcast change fan-out; lagging
/// subscribers miss changes rather than blocking writers.
pub struct MemoryStore {
    entries: DashMap<String, Value>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            entries: DashMap::new(),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let old = self.entries.insert(key.to_string(), value.clone());
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            old,
            new: Some(value),
            area: "local",
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
