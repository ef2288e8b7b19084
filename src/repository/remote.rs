//! Remote Storage Strategy
//!
//! Reads come only from the live subscription. Writes are sent to the store
//! and return once accepted; the change reaches the facade when the
//! subscription reports it.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use super::documents::{Document, DocumentStore, DocumentWrite, Fields, Query};
use super::traits::{RecordStream, StorageStrategy, SyncMode, WriteOutcome};
use crate::domain::{Record, OWNER_FIELD};
use crate::error::{SyncError, SyncResult};

/// One collection of the signed-in user's documents
pub struct RemoteCollection<T: Record> {
    store: Arc<dyn DocumentStore>,
    user_id: String,
    lower_bound: Option<(String, Value)>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RemoteCollection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            lower_bound: None,
            _record: PhantomData,
        }
    }

    /// Restrict the subscription to documents with `field >= value`
    pub fn with_lower_bound(mut self, field: impl Into<String>, value: Value) -> Self {
        self.lower_bound = Some((field.into(), value));
        self
    }

    fn query(&self) -> Query {
        let query = Query::owned_by(T::COLLECTION, OWNER_FIELD, self.user_id.clone()).order_by(T::remote_order());
        match &self.lower_bound {
            Some((field, value)) => query.at_least(field.clone(), value.clone()),
            None => query,
        }
    }
}

fn to_fields<S: Serialize>(value: &S, what: &str) -> SyncResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(SyncError::InvalidFields(format!("{} is not an object", what))),
    }
}

/// Decode a snapshot; documents that do not fit the record shape are skipped
fn decode<T: Record>(docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let mut fields = doc.fields;
            fields.insert("id".to_string(), Value::String(doc.id.clone()));
            match serde_json::from_value::<T>(Value::Object(fields)) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(collection = T::COLLECTION, id = %doc.id, error = %e, "skipping malformed document");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl<T: Record> StorageStrategy<T> for RemoteCollection<T> {
    fn mode(&self) -> SyncMode {
        SyncMode::Remote
    }

    async fn list(&self) -> SyncResult<Vec<T>> {
        let mut stream = self.subscribe()?;
        stream.next().await.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn subscribe(&self) -> SyncResult<RecordStream<T>> {
        tracing::debug!(collection = T::COLLECTION, user = %self.user_id, "opening live query");
        Ok(self
            .store
            .subscribe(self.query())
            .map(|snapshot| snapshot.map(decode::<T>).map_err(SyncError::from))
            .boxed())
    }

    async fn add(&self, draft: T::Draft) -> SyncResult<WriteOutcome<T>> {
        let mut fields = to_fields(&draft, "draft")?;
        fields.remove("id");
        fields.insert(OWNER_FIELD.to_string(), Value::String(self.user_id.clone()));

        let mut write = DocumentWrite::new(fields);
        if let Some(field) = T::created_at_field() {
            write = write.server_timestamp(field);
        }
        self.store.insert(T::COLLECTION, write).await?;
        Ok(WriteOutcome::Accepted)
    }

    async fn update(&self, id: &str, patch: T::Patch) -> SyncResult<WriteOutcome<T>> {
        let mut fields = to_fields(&patch, "patch")?;
        fields.remove("id");
        fields.remove(OWNER_FIELD);
        self.store.update(T::COLLECTION, id, fields).await?;
        Ok(WriteOutcome::Accepted)
    }

    async fn delete(&self, id: &str) -> SyncResult<WriteOutcome<T>> {
        self.store.remove(T::COLLECTION, id).await?;
        Ok(WriteOutcome::Accepted)
    }
}
