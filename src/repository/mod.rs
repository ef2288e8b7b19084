//! Repository Layer
//!
//! Storage strategies and the boundaries they sit on:
//! - kv: on-device key-value storage (memory, SQLite)
//! - local: JSON collections in key-value storage
//! - documents: remote document store boundary and an in-memory live store
//! - remote: collections backed by a live remote subscription

mod documents;
mod kv;
mod local;
mod memory_documents;
mod remote;
mod traits;


pub use documents::{
    Document, DocumentStore, DocumentWrite, Fields, Query, SnapshotStream, StoreError,
};
pub use kv::{KeyValueStore, KvError, MemoryKeyValueStore, SqliteKeyValueStore};
pub use local::{LocalCollection, LocalStore};
pub use memory_documents::MemoryDocumentStore;
pub use remote::RemoteCollection;
pub use traits::{RecordStream, StorageStrategy, SyncMode, WriteOutcome};
