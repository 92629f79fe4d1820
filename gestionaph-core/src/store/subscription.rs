//! Live query subscriptions
//!
//! A listener is a callback bound to a [`Query`]. After each committed batch
//! the store re-runs the query of every listener whose collection was touched
//! and hands it the full result set. There is no diff contract: consumers
//! replace their view wholesale on every delivery.

use super::{Document, Query};
use scc::HashMap as SccHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback receiving the complete, ordered result set of its query
pub type Listener = Arc<dyn Fn(&[Document]) + Send + Sync>;

#[derive(Clone)]
struct Registration {
    query: Query,
    listener: Listener,
}

/// Registry of live listeners (lock-free map keyed by subscription id)
#[derive(Default)]
pub struct SubscriptionHub {
    registrations: SccHashMap<u64, Registration>,
    next_id: AtomicU64,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its id
    pub fn register(&self, query: Query, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self.registrations.insert_sync(id, Registration { query, listener });
        id
    }

    pub fn unregister(&self, id: u64) -> bool {
        self.registrations.remove_sync(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Snapshot of the listeners interested in any of `collections`
    fn interested(&self, collections: &[String]) -> Vec<Registration> {
        let mut hits = Vec::new();
        self.registrations.retain_sync(|_, registration| {
            if collections.iter().any(|c| *c == registration.query.collection) {
                hits.push(registration.clone());
            }
            true
        });
        hits
    }

    /// Deliver fresh results to every listener watching `collections`.
    ///
    /// `run` evaluates a query against the committed state.
    pub fn notify<F>(&self, collections: &[String], run: F)
    where
        F: Fn(&Query) -> Vec<Document>,
    {
        for registration in self.interested(collections) {
            let docs = run(&registration.query);
            (registration.listener)(&docs);
        }
    }
}

/// Handle to a live subscription; dropping it cancels the subscription
pub struct Subscription {
    id: u64,
    hub: Weak<SubscriptionHub>,
}

impl Subscription {
    pub(crate) fn new(id: u64, hub: &Arc<SubscriptionHub>) -> Self {
        Self { id, hub: Arc::downgrade(hub) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving deliveries
    pub fn cancel(self) {
        // unregistration happens in Drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
