//! Sync layer errors
//!
//! Local storage corruption never shows up here: unreadable payloads load as
//! empty collections. Remote failures are handed back to the caller as-is.

use crate::repository::{KvError, StoreError};

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The session has not resolved, so no storage mode is active
    #[error("no storage mode is active yet")]
    NotReady,

    #[error("local storage failed: {0}")]
    Storage(#[from] KvError),

    #[error("remote request failed: {0}")]
    Remote(#[from] StoreError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A draft or patch did not serialize to a JSON object
    #[error("invalid record fields: {0}")]
    InvalidFields(String),
}
