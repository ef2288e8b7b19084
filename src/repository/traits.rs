//! Repository Layer - Core Traits
//!
//! Defines the storage strategy a sync facade talks to.
//! Implementations: local key-value storage, live remote documents.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::Record;
use crate::error::SyncResult;

/// Stream of full collection snapshots
pub type RecordStream<T> = BoxStream<'static, SyncResult<Vec<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// On-device storage, no signed-in user
    Local,
    /// Live remote store, scoped to the signed-in user
    Remote,
}

/// What a mutation did to the materialized list
#[derive(Debug, Clone)]
pub enum WriteOutcome<T> {
    /// Applied synchronously; this is the new snapshot
    Applied(Arc<Vec<T>>),
    /// Request accepted; the subscription will report the result
    Accepted,
    /// Nothing matched, nothing changed
    Unchanged,
}

/// Storage backing one collection for one session.
///
/// Generic over any Record type. A facade holds exactly one strategy at a
/// time and swaps it when the session changes.
#[async_trait]
pub trait StorageStrategy<T: Record>: Send + Sync {
    fn mode(&self) -> SyncMode;

    /// One-shot read of the current contents
    async fn list(&self) -> SyncResult<Vec<T>>;

    /// Live snapshots. Every item replaces the previous one entirely.
    fn subscribe(&self) -> SyncResult<RecordStream<T>>;

    /// Create a record from its draft
    async fn add(&self, draft: T::Draft) -> SyncResult<WriteOutcome<T>>;

    /// Merge the set fields of `patch` into the record with `id`
    async fn update(&self, id: &str, patch: T::Patch) -> SyncResult<WriteOutcome<T>>;

    /// Delete record by ID
    async fn delete(&self, id: &str) -> SyncResult<WriteOutcome<T>>;
}
