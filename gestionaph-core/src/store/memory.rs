//! In-memory document store
//!
//! Writes are serialised behind an async `RwLock`; reads share it. Data is
//! lost when the process exits. Suitable for development and tests; use
//! [`FileStore`](super::FileStore) to keep documents across restarts.

use super::state::DocumentState;
use super::{
    Document, DocumentStore, Listener, Query, StoreResult, Subscription, SubscriptionHub,
    WriteBatch,
};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<DocumentState>>,
    hub: Arc<SubscriptionHub>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self) -> usize {
        self.state.read().await.document_count()
    }

    pub fn subscription_count(&self) -> usize {
        self.hub.len()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.state.read().await.get(collection, id))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        Ok(self.state.read().await.query(query))
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let touched: Vec<String> = batch.collections().into_iter().collect();
        {
            let mut state = self.state.write().await;
            state.apply(&batch)?;
        }
        log::debug!("Committed batch of {} ops on {:?}", batch.len(), touched);

        let state = self.state.read().await;
        self.hub.notify(&touched, |q| state.query(q));
        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.state.read().await.collection_names())
    }

    async fn subscribe(&self, query: Query, listener: Listener) -> StoreResult<Subscription> {
        let state = self.state.read().await;
        listener(&state.query(&query));
        let id = self.hub.register(query, listener);
        Ok(Subscription::new(id, &self.hub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn add_get_update_delete() {
        let store = MemoryStore::new();
        let id = store.add("notifications", fields(json!({"read": false}))).await.unwrap();

        store.update("notifications", &id, fields(json!({"read": true}))).await.unwrap();
        let doc = store.get("notifications", &id).await.unwrap().unwrap();
        assert_eq!(doc.get("read"), Some(&json!(true)));

        store.delete("notifications", &id).await.unwrap();
        assert!(store.get("notifications", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store.update("notifications", "nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn subscription_gets_initial_and_updated_snapshots() {
        let store = MemoryStore::new();
        let deliveries = Arc::new(Mutex::new(Vec::new()));
        let sink = deliveries.clone();

        let sub = store
            .subscribe(
                Query::collection("notifications").where_eq("userId", "u1"),
                Arc::new(move |docs| sink.lock().unwrap().push(docs.len())),
            )
            .await
            .unwrap();

        store.add("notifications", fields(json!({"userId": "u1"}))).await.unwrap();
        store.add("notifications", fields(json!({"userId": "u2"}))).await.unwrap();
        store.add("profiles", fields(json!({"role": "resident"}))).await.unwrap();

        sub.cancel();
        store.add("notifications", fields(json!({"userId": "u1"}))).await.unwrap();

        // initial (0), then one per notifications commit while subscribed
        assert_eq!(*deliveries.lock().unwrap(), vec![0, 1, 1]);
        assert_eq!(store.subscription_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_writers_all_land() {
        let store = MemoryStore::new();
        let mut handles = vec![];
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add("projectVotes", fields(json!({"n": i}))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.document_count().await, 50);
    }
}
