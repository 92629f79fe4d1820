//! In-memory document state shared by the memory and journaled stores
//!
//! Batches are applied in two steps: [`DocumentState::stage`] applies every op
//! to copies of the documents it touches, failing without side effects;
//! [`DocumentState::install`] writes those copies back. The journaled store
//! writes its journal line between the two.

use super::{Document, Query, StoreError, StoreResult, WriteBatch, WriteOp};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion sequence; a replaced document keeps its original slot
    seq: u64,
    data: Map<String, Value>,
}

#[derive(Debug, Default)]
struct CollectionState {
    docs: HashMap<String, StoredDocument>,
}

/// Staged batch: the final version of every touched document, ready to install
#[derive(Debug)]
pub struct StagedBatch {
    /// collection -> id -> new version (`None` once deleted)
    changes: HashMap<String, HashMap<String, Option<StoredDocument>>>,
    next_seq: u64,
}

impl StagedBatch {
    /// Number of distinct documents the batch touches
    pub fn staged_documents(&self) -> usize {
        self.changes.values().map(HashMap::len).sum()
    }
}

#[derive(Debug, Default)]
pub struct DocumentState {
    collections: HashMap<String, CollectionState>,
    next_seq: u64,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version of a document as seen by a batch being staged
    fn current(
        &self,
        overlay: &HashMap<String, Option<StoredDocument>>,
        collection: &str,
        id: &str,
    ) -> Option<StoredDocument> {
        match overlay.get(id) {
            Some(staged) => staged.clone(),
            None => self.collections.get(collection).and_then(|c| c.docs.get(id)).cloned(),
        }
    }

    pub fn stage(&self, batch: &WriteBatch) -> StoreResult<StagedBatch> {
        let mut changes: HashMap<String, HashMap<String, Option<StoredDocument>>> = HashMap::new();
        let mut next_seq = self.next_seq;

        for op in batch.ops() {
            let name = op.collection();
            let overlay = changes.entry(name.to_string()).or_default();
            match op {
                WriteOp::Set { id, data, merge, .. } => {
                    if id.is_empty() {
                        return Err(StoreError::InvalidDocument("empty document id".into()));
                    }
                    let next = match self.current(overlay, name, id) {
                        Some(mut existing) if *merge => {
                            for (k, v) in data {
                                existing.data.insert(k.clone(), v.clone());
                            }
                            existing
                        }
                        Some(existing) => StoredDocument { seq: existing.seq, data: data.clone() },
                        None => {
                            next_seq += 1;
                            StoredDocument { seq: next_seq - 1, data: data.clone() }
                        }
                    };
                    overlay.insert(id.clone(), Some(next));
                }
                WriteOp::Update { id, fields, .. } => {
                    let mut existing = self.current(overlay, name, id).ok_or_else(|| {
                        StoreError::NotFound { collection: name.to_string(), id: id.clone() }
                    })?;
                    for (k, v) in fields {
                        existing.data.insert(k.clone(), v.clone());
                    }
                    overlay.insert(id.clone(), Some(existing));
                }
                WriteOp::Delete { id, .. } => {
                    overlay.insert(id.clone(), None);
                }
            }
        }

        Ok(StagedBatch { changes, next_seq })
    }

    pub fn install(&mut self, staged: StagedBatch) {
        for (name, docs) in staged.changes {
            let collection = self.collections.entry(name).or_default();
            for (id, doc) in docs {
                match doc {
                    Some(doc) => {
                        collection.docs.insert(id, doc);
                    }
                    None => {
                        collection.docs.remove(&id);
                    }
                }
            }
        }
        self.next_seq = staged.next_seq;
    }

    pub fn apply(&mut self, batch: &WriteBatch) -> StoreResult<()> {
        let staged = self.stage(batch)?;
        self.install(staged);
        Ok(())
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)
            .and_then(|c| c.docs.get(id))
            .map(|stored| Document::new(id, stored.data.clone()))
    }

    pub fn query(&self, query: &Query) -> Vec<Document> {
        let Some(collection) = self.collections.get(&query.collection) else {
            return Vec::new();
        };
        let mut hits: Vec<(u64, Document)> = collection
            .docs
            .iter()
            .filter(|(_, stored)| query.matches(&stored.data))
            .map(|(id, stored)| (stored.seq, Document::new(id.clone(), stored.data.clone())))
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        query.finish(hits.into_iter().map(|(_, doc)| doc).collect())
    }

    /// Non-empty collection names, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .filter(|(_, c)| !c.docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(|c| c.docs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn failed_batch_leaves_state_untouched() {
        let mut state = DocumentState::new();
        let mut batch = WriteBatch::new();
        batch.set("notifications", "a", fields(json!({"read": false})));
        state.apply(&batch).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set("notifications", "b", fields(json!({"read": false})))
            .update("notifications", "missing", fields(json!({"read": true})));
        let err = state.apply(&batch).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        assert!(state.get("notifications", "b").is_none());
        assert_eq!(state.document_count(), 1);
    }

    #[test]
    fn query_returns_insertion_order() {
        let mut state = DocumentState::new();
        let mut batch = WriteBatch::new();
        for id in ["q3", "q1", "q2"] {
            batch.set("projectQuotes", id, fields(json!({"projectId": "p1"})));
        }
        state.apply(&batch).unwrap();

        let ids: Vec<_> = state
            .query(&Query::collection("projectQuotes").where_eq("projectId", "p1"))
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["q3", "q1", "q2"]);
    }

    #[test]
    fn merge_keeps_existing_fields() {
        let mut state = DocumentState::new();
        let mut batch = WriteBatch::new();
        batch.set("profiles", "u1", fields(json!({"email": "a@b.co", "role": "resident"})));
        batch.merge("profiles", "u1", fields(json!({"role": "admin"})));
        state.apply(&batch).unwrap();

        let doc = state.get("profiles", "u1").unwrap();
        assert_eq!(doc.get("email"), Some(&json!("a@b.co")));
        assert_eq!(doc.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn emptied_collections_are_not_listed() {
        let mut state = DocumentState::new();
        let mut batch = WriteBatch::new();
        batch.set("vehicles", "v1", Map::new()).delete("vehicles", "v1");
        batch.set("profiles", "u1", Map::new());
        state.apply(&batch).unwrap();
        assert_eq!(state.collection_names(), vec!["profiles"]);
    }

    #[test]
    fn staging_copies_only_touched_documents() {
        let mut state = DocumentState::new();
        let mut batch = WriteBatch::new();
        for n in 0..500 {
            batch.set("notifications", &format!("n{}", n), fields(json!({"read": false})));
        }
        state.apply(&batch).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .update("notifications", "n7", fields(json!({"read": true})))
            .update("notifications", "n7", fields(json!({"readAt": "2024-05-01T10:00:00Z"})));
        let staged = state.stage(&batch).unwrap();
        assert_eq!(staged.staged_documents(), 1);

        state.install(staged);
        let doc = state.get("notifications", "n7").unwrap();
        assert_eq!(doc.get("read"), Some(&json!(true)));
        assert!(doc.get("readAt").is_some());
        assert_eq!(state.document_count(), 500);
    }

    #[test]
    fn delete_then_set_in_one_batch_recreates() {
        let mut state = DocumentState::new();
        let mut batch = WriteBatch::new();
        batch.set("vehicles", "v1", fields(json!({"plate": "ABC123"})));
        batch.set("vehicles", "v2", fields(json!({"plate": "XYZ789"})));
        state.apply(&batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("vehicles", "v1").set("vehicles", "v1", fields(json!({"plate": "NEW001"})));
        state.apply(&batch).unwrap();

        let ids: Vec<_> =
            state.query(&Query::collection("vehicles")).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["v2", "v1"]);
        assert_eq!(state.get("vehicles", "v1").unwrap().get("plate"), Some(&json!("NEW001")));
    }
}
