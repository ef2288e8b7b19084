//! Remote Document Store Boundary
//!
//! Collections of JSON documents, queried through live subscriptions that
//! push the full result set on every change.

use std::cmp::Ordering;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};

use crate::domain::{SortDirection, SortKey};

pub type Fields = Map<String, Value>;

/// Stream of full query results
pub type SnapshotStream = BoxStream<'static, Result<Vec<Document>, StoreError>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no document {id} in {collection}")]
    NotFound { collection: String, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// A new document. Fields listed in `server_timestamps` are filled in by
/// the store's clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamps.push(field.into());
        self
    }
}

/// Owner-scoped query over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub owner_field: String,
    pub owner: String,
    /// Only documents whose field compares `>=` the value
    pub lower_bound: Option<(String, Value)>,
    pub order_by: Option<SortKey>,
}

impl Query {
    pub fn owned_by(
        collection: impl Into<String>,
        owner_field: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            owner_field: owner_field.into(),
            owner: owner.into(),
            lower_bound: None,
            order_by: None,
        }
    }

    pub fn at_least(mut self, field: impl Into<String>, value: Value) -> Self {
        self.lower_bound = Some((field.into(), value));
        self
    }

    pub fn order_by(mut self, key: Option<SortKey>) -> Self {
        self.order_by = key;
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if doc.fields.get(&self.owner_field).and_then(Value::as_str) != Some(self.owner.as_str()) {
            return false;
        }
        match &self.lower_bound {
            Some((field, bound)) => doc
                .fields
                .get(field)
                .and_then(|v| compare_values(v, bound))
                .is_some_and(|o| o != Ordering::Less),
            None => true,
        }
    }

    /// Filter and order `docs` the way the store would answer this query
    pub fn apply<'a>(&self, docs: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut hits: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).cloned().collect();
        if let Some(key) = self.order_by {
            hits.sort_by(|a, b| {
                let ord = match (a.fields.get(key.field), b.fields.get(key.field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match key.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        hits
    }
}

/// Strings compare lexicographically, numbers numerically, booleans
/// false-first; mixed types are incomparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Remote document collections with live queries
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Live query. The first item is the current result set; every later
    /// item is the full result set after a change.
    fn subscribe(&self, query: Query) -> SnapshotStream;

    /// Returns the id the store assigned
    async fn insert(&self, collection: &str, write: DocumentWrite) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Removing a missing document succeeds
    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
