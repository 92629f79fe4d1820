//! Write batches - the store's unit of atomicity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One mutation inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Create or replace; with `merge` the fields are merged into an existing document
    Set { collection: String, id: String, data: Map<String, Value>, merge: bool },
    /// Change fields of a document that must already exist
    Update { collection: String, id: String, fields: Map<String, Value> },
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Set { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// Ordered list of writes committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &str, id: &str, data: Map<String, Value>) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge: false,
        });
        self
    }

    pub fn merge(&mut self, collection: &str, id: &str, data: Map<String, Value>) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge: true,
        });
        self
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete { collection: collection.to_string(), id: id.to_string() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Collections touched by this batch, deduplicated
    pub fn collections(&self) -> BTreeSet<String> {
        self.ops.iter().map(|op| op.collection().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_are_deduplicated() {
        let mut batch = WriteBatch::new();
        batch
            .set("notifications", "a", Map::new())
            .set("notifications", "b", Map::new())
            .delete("projectVotes", "v");
        assert_eq!(batch.len(), 3);
        let names: Vec<_> = batch.collections().into_iter().collect();
        assert_eq!(names, vec!["notifications", "projectVotes"]);
    }

    #[test]
    fn ops_serialize_with_tag() {
        let mut batch = WriteBatch::new();
        batch.delete("notifications", "n1");
        let json = serde_json::to_string(&batch.ops()[0]).unwrap();
        assert!(json.contains(r#""op":"delete""#));
    }
}
