//! Document store abstraction
//!
//! The portal never holds authoritative data itself: every read and write goes
//! through a [`DocumentStore`]. Documents are JSON objects addressed by
//! `(collection, id)`. Multi-document writes are grouped in a [`WriteBatch`]
//! and applied all-or-nothing. Live views register a [`Listener`] for a
//! [`Query`] and receive the complete result set after every change.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - process-local, lost on restart
//! - [`FileStore`] - the same state backed by an append-only, CRC32-checked
//!   journal that is replayed on open

pub mod batch;
pub mod file;
pub mod memory;
pub mod state;
pub mod subscription;

pub use batch::{WriteBatch, WriteOp};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use subscription::{Listener, Subscription, SubscriptionHub};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Journal corrupted: {0}")]
    Corrupted(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// A stored document: its id plus the JSON fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self { id: id.into(), data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Deserialize into a record type; the document id is injected as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.data.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            StoreError::InvalidDocument(format!("{}: {}", self.id, e))
        })
    }
}

/// Serialize a record into document fields; any `id` field is dropped since
/// the id is the document key.
pub fn encode_fields<T: Serialize>(record: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::InvalidDocument(format!("expected an object, got {}", other))),
    }
}

/// Generate a fresh document id
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Sort direction for [`Query::order_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filter on a top-level field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        data.get(&self.field).map(|v| v == &self.value).unwrap_or(false)
    }
}

/// Collection query: equality filters, optional ordering and limit.
///
/// Results without an explicit order come back in insertion order; ordering
/// is stable, so equal keys keep insertion order as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self { collection: name.into(), filters: Vec::new(), order_by: None, limit: None }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.into(), value: value.into() });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(data))
    }

    /// Order (stable) and truncate documents already filtered by this query
    pub fn finish(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, direction)) = &self.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

/// Total order over optional JSON values used for sorting.
///
/// Missing/null sort first, then booleans, numbers, strings. Two strings that
/// both parse as RFC 3339 timestamps compare chronologically, since stored
/// timestamps do not share a fixed fractional-second width.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Storage backend for portal documents
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Run a query and return the matching documents
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Apply a batch atomically: either every operation lands or none does
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Names of collections currently holding at least one document
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Register a live listener.
    ///
    /// The listener receives the current result set right away and again after
    /// every committed batch touching `query.collection`. Dropping or
    /// cancelling the returned handle removes it.
    async fn subscribe(&self, query: Query, listener: Listener) -> StoreResult<Subscription>;

    /// Create a document with a generated id and return the id
    async fn add(&self, collection: &str, data: Map<String, Value>) -> StoreResult<String> {
        let id = new_document_id();
        let mut batch = WriteBatch::new();
        batch.set(collection, &id, data);
        self.commit(batch).await?;
        Ok(id)
    }

    /// Create or replace a document; with `merge` only the given fields change
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
        merge: bool,
    ) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        if merge {
            batch.merge(collection, id, data);
        } else {
            batch.set(collection, id, data);
        }
        self.commit(batch).await
    }

    /// Change fields of an existing document; fails with `NotFound` otherwise
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    /// Remove a document; removing a missing document is not an error
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }
}
