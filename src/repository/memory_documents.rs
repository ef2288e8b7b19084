//! In-Memory Document Store
//!
//! A live document store held in process memory. Every write bumps a
//! revision on a watch channel; each subscription re-runs its query when the
//! revision moves and emits only when its result set changed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use super::documents::{Document, DocumentStore, DocumentWrite, Fields, Query, SnapshotStream, StoreError};
use crate::clock::{Clock, SystemClock};

#[derive(Default)]
struct Collections {
    docs: HashMap<String, Vec<Document>>,
    fail_next: Option<StoreError>,
}

struct Shared {
    state: Mutex<Collections>,
    revision: watch::Sender<u64>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn run(&self, query: &Query) -> Vec<Document> {
        let state = self.state.lock();
        let docs = state.docs.get(&query.collection).map(Vec::as_slice).unwrap_or(&[]);
        query.apply(docs)
    }

    /// Apply a write, or fail with the injected error
    fn write<R>(&self, f: impl FnOnce(&mut Collections) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let result = {
            let mut state = self.state.lock();
            if let Some(err) = state.fail_next.take() {
                return Err(err);
            }
            f(&mut state)?
        };
        self.revision.send_modify(|rev| *rev += 1);
        Ok(result)
    }
}

/// Cloneable handle; clones share the same data
#[derive(Clone)]
pub struct MemoryDocumentStore {
    shared: Arc<Shared>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryDocumentStore {
    /// `clock` provides server timestamps
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Collections::default()),
                revision,
                clock,
            }),
        }
    }

    /// Make the next insert, update or remove fail with `err`
    pub fn fail_next_write(&self, err: StoreError) {
        self.shared.state.lock().fail_next = Some(err);
    }

    /// Current contents of a collection, unfiltered
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.shared
            .state
            .lock()
            .docs
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.shared.state.lock().docs.get(collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn subscribe(&self, query: Query) -> SnapshotStream {
        let revisions = self.shared.revision.subscribe();
        let shared = Arc::downgrade(&self.shared);

        stream::unfold(
            (shared, revisions, query, None::<Vec<Document>>),
            |(shared, mut revisions, query, last)| async move {
                loop {
                    if last.is_some() && revisions.changed().await.is_err() {
                        return None;
                    }
                    revisions.borrow_and_update();
                    let snapshot = shared.upgrade()?.run(&query);
                    if last.as_ref() != Some(&snapshot) {
                        let next = Some(snapshot.clone());
                        return Some((Ok(snapshot), (shared, revisions, query, next)));
                    }
                }
            },
        )
        .boxed()
    }

    async fn insert(&self, collection: &str, write: DocumentWrite) -> Result<String, StoreError> {
        let stamp = Value::String(self.shared.clock.now().to_rfc3339_opts(SecondsFormat::Micros, true));
        let id = Uuid::new_v4().to_string();

        let mut fields = write.fields;
        fields.remove("id");
        for field in write.server_timestamps {
            fields.insert(field, stamp.clone());
        }

        let doc = Document { id: id.clone(), fields };
        self.shared.write(|state| {
            state.docs.entry(collection.to_string()).or_default().push(doc);
            Ok(())
        })?;
        tracing::debug!(collection, %id, "document inserted");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.shared.write(|state| {
            let doc = state
                .docs
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            for (key, value) in fields {
                if key != "id" {
                    doc.fields.insert(key, value);
                }
            }
            Ok(())
        })
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.shared.write(|state| {
            if let Some(docs) = state.docs.get_mut(collection) {
                docs.retain(|d| d.id != id);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_subscription_starts_with_current_results() {
        let store = MemoryDocumentStore::default();
        store
            .insert("tasks", DocumentWrite::new(fields(json!({ "userId": "u1", "title": "a" }))))
            .await
            .unwrap();
        store
            .insert("tasks", DocumentWrite::new(fields(json!({ "userId": "u2", "title": "b" }))))
            .await
            .unwrap();

        let mut stream = store.subscribe(Query::owned_by("tasks", "userId", "u1"));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].fields["title"], json!("a"));
    }

    #[tokio::test]
    async fn test_subscription_skips_unrelated_writes() {
        let store = MemoryDocumentStore::default();
        let mut stream = store.subscribe(Query::owned_by("tasks", "userId", "u1"));
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        store
            .insert("tasks", DocumentWrite::new(fields(json!({ "userId": "u2" }))))
            .await
            .unwrap();
        assert!(stream.next().now_or_never().is_none());

        store
            .insert("tasks", DocumentWrite::new(fields(json!({ "userId": "u1" }))))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_timestamp_and_lower_bound() {
        let store = MemoryDocumentStore::default();
        for day in ["2026-09-01", "2026-10-01"] {
            store
                .insert(
                    "habit_logs",
                    DocumentWrite::new(fields(json!({ "userId": "u1", "logDate": day })))
                        .server_timestamp("createdAt"),
                )
                .await
                .unwrap();
        }

        let query = Query::owned_by("habit_logs", "userId", "u1").at_least("logDate", json!("2026-09-19"));
        let mut stream = store.subscribe(query);
        let hits = stream.next().await.unwrap().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields["logDate"], json!("2026-10-01"));
        assert!(hits[0].fields["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryDocumentStore::default();
        let err = store.update("tasks", "nope", Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let store = MemoryDocumentStore::default();
        store.fail_next_write(StoreError::Unavailable("offline".to_string()));

        let write = DocumentWrite::new(fields(json!({ "userId": "u1" })));
        assert!(store.insert("tasks", write.clone()).await.is_err());
        assert!(store.insert("tasks", write).await.is_ok());
        assert_eq!(store.len("tasks"), 1);
    }
}
