//! Domain Layer - Core Entity Traits
//!
//! `Entity` is the basic contract: a record with a string id.
//! `Record` adds what a synced collection needs to know about its
//! element type: where it lives, how it is created and how it is patched.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Field holding the owning user's id on remote documents
pub const OWNER_FIELD: &str = "userId";

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone + 'static {
    /// Returns the entity's unique identifier
    fn id(&self) -> &str;
}

/// Where a locally created record is placed in the materialized list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering a remote query applies to its results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn asc(field: &'static str) -> Self {
        Self { field, direction: SortDirection::Ascending }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self { field, direction: SortDirection::Descending }
    }
}

/// An entity stored in a named collection, locally or remotely
pub trait Record: Entity + Serialize + DeserializeOwned {
    /// Remote collection name, also the suffix of the local storage key
    const COLLECTION: &'static str;

    /// Placement of locally added records
    const INSERT_AT: InsertAt = InsertAt::Back;

    /// Fields supplied by the caller on creation
    type Draft: Serialize + Send + Sync + 'static;

    /// Partial update; unset fields must serialize to nothing
    type Patch: Serialize + Send + Sync + 'static;

    /// Materialize a local record from its draft
    fn from_draft(id: String, created_at: DateTime<Utc>, draft: Self::Draft) -> Self;

    /// Field the remote store stamps with its own clock on insert
    fn created_at_field() -> Option<&'static str> {
        Some("createdAt")
    }

    /// Order of remote query results
    fn remote_order() -> Option<SortKey> {
        None
    }
}
