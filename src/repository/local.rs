//! Local Storage Strategy
//!
//! Collections are stored whole, as one JSON array per key. Writes apply
//! to the in-memory list and the stored copy before returning.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::kv::{KeyValueStore, KvError, MemoryKeyValueStore, SqliteKeyValueStore};
use super::traits::{RecordStream, StorageStrategy, SyncMode, WriteOutcome};
use crate::clock::Clock;
use crate::config::{AppConfig, LocalBackend};
use crate::domain::{InsertAt, Record};
use crate::error::{SyncError, SyncResult};

/// Namespaced JSON collections over key-value storage
#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    /// Open the backend named in the config
    pub fn open(config: &AppConfig) -> Result<Self, KvError> {
        let kv: Arc<dyn KeyValueStore> = match &config.local_backend {
            LocalBackend::Memory => Arc::new(MemoryKeyValueStore::new()),
            LocalBackend::Sqlite { path } => Arc::new(SqliteKeyValueStore::open(path)?),
        };
        tracing::info!(namespace = %config.storage_namespace, "local store opened");
        Ok(Self::new(kv, config.storage_namespace.clone()))
    }

    /// Full storage key for a collection name
    pub fn key(&self, name: &str) -> String {
        format!("{}_{}", self.namespace, name)
    }

    /// Load a collection. Missing or unreadable payloads load as empty.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        let key = self.key(name);
        let raw = match self.kv.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(%key, error = %e, "local read failed, using empty collection");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Option<Vec<T>>>(&raw) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(%key, error = %e, "malformed local payload, using empty collection");
                Vec::new()
            }
        }
    }

    pub fn save<T: Serialize>(&self, name: &str, items: &[T]) -> SyncResult<()> {
        let raw = serde_json::to_string(items)?;
        self.kv.set(&self.key(name), &raw)?;
        Ok(())
    }
}

/// One collection held in memory and mirrored to local storage
pub struct LocalCollection<T: Record> {
    store: LocalStore,
    clock: Arc<dyn Clock>,
    items: Mutex<Arc<Vec<T>>>,
}

impl<T: Record> LocalCollection<T> {
    pub fn new(store: LocalStore, clock: Arc<dyn Clock>) -> Self {
        let items = store.load::<T>(T::COLLECTION);
        tracing::debug!(collection = T::COLLECTION, count = items.len(), "local collection loaded");
        Self {
            store,
            clock,
            items: Mutex::new(Arc::new(items)),
        }
    }

    fn current(&self) -> Arc<Vec<T>> {
        self.items.lock().clone()
    }

    /// Persist `next`, then make it current
    fn commit(&self, items: &mut Arc<Vec<T>>, next: Vec<T>) -> SyncResult<WriteOutcome<T>> {
        self.store.save(T::COLLECTION, &next)?;
        *items = Arc::new(next);
        Ok(WriteOutcome::Applied(items.clone()))
    }
}

#[async_trait]
impl<T: Record> StorageStrategy<T> for LocalCollection<T> {
    fn mode(&self) -> SyncMode {
        SyncMode::Local
    }

    async fn list(&self) -> SyncResult<Vec<T>> {
        Ok(self.current().as_ref().clone())
    }

    fn subscribe(&self) -> SyncResult<RecordStream<T>> {
        let snapshot = self.current().as_ref().clone();
        Ok(stream::once(async move { Ok(snapshot) }).boxed())
    }

    async fn add(&self, draft: T::Draft) -> SyncResult<WriteOutcome<T>> {
        let record = T::from_draft(Uuid::new_v4().to_string(), self.clock.now(), draft);
        let mut items = self.items.lock();
        let mut next = Vec::with_capacity(items.len() + 1);
        match T::INSERT_AT {
            InsertAt::Front => {
                next.push(record);
                next.extend(items.iter().cloned());
            }
            InsertAt::Back => {
                next.extend(items.iter().cloned());
                next.push(record);
            }
        }
        self.commit(&mut items, next)
    }

    async fn update(&self, id: &str, patch: T::Patch) -> SyncResult<WriteOutcome<T>> {
        let mut items = self.items.lock();
        let Some(index) = items.iter().position(|r| r.id() == id) else {
            return Ok(WriteOutcome::Unchanged);
        };
        let merged = merge_patch(&items[index], &patch)?;
        let mut next = items.as_ref().clone();
        next[index] = merged;
        self.commit(&mut items, next)
    }

    async fn delete(&self, id: &str) -> SyncResult<WriteOutcome<T>> {
        let mut items = self.items.lock();
        if !items.iter().any(|r| r.id() == id) {
            return Ok(WriteOutcome::Unchanged);
        }
        let next: Vec<T> = items.iter().filter(|r| r.id() != id).cloned().collect();
        self.commit(&mut items, next)
    }
}

/// Overlay the fields `patch` serializes onto `record`. The id is never
/// overwritten.
pub(crate) fn merge_patch<T: Record>(record: &T, patch: &T::Patch) -> SyncResult<T> {
    let mut value = serde_json::to_value(record)?;
    let Value::Object(fields) = serde_json::to_value(patch)? else {
        return Err(SyncError::InvalidFields(format!(
            "{} patch is not an object",
            T::COLLECTION
        )));
    };
    if let Value::Object(target) = &mut value {
        for (key, field) in fields {
            if key != "id" {
                target.insert(key, field);
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}
