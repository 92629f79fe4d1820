//! Notifications: fan-out, read state and the resident/admin views
//!
//! A notification is sent once by an administrator and stored once per
//! recipient. Each copy carries its own read flag; the sender's view lists
//! every copy, enriched with the recipient's name.

pub mod fanout;
pub mod filter;

pub use fanout::{FanOutReceipt, NewNotification, Recipients, DEFAULT_SENDER};
pub use filter::{AudienceFilter, NotificationFilter, StatusFilter};

use crate::backend::Portal;
use crate::error::PortalResult;
use crate::model::{collections, Notification};
use crate::store::{
    encode_fields, new_document_id, Direction, Document, Listener, Query, Subscription,
    WriteBatch,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A notification as the admin list shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRow {
    #[serde(flatten)]
    pub notification: Notification,
    /// Recipient's full name, else email, else empty
    pub user_name: String,
}

/// Live admin view; both underlying subscriptions end when this is dropped
#[derive(Debug)]
pub struct NotificationFeed {
    _profiles: Subscription,
    _notifications: Subscription,
}

impl NotificationFeed {
    pub fn cancel(self) {}
}

#[derive(Default)]
struct FeedState {
    names: HashMap<String, String>,
    /// `None` until the first notifications delivery
    notifications: Option<Vec<Notification>>,
}

impl FeedState {
    fn rows(&self, filter: &NotificationFilter) -> Option<Vec<NotificationRow>> {
        let notifications = self.notifications.as_ref()?;
        Some(build_rows(notifications.clone(), &self.names, filter))
    }
}

fn build_rows(
    notifications: Vec<Notification>,
    names: &HashMap<String, String>,
    filter: &NotificationFilter,
) -> Vec<NotificationRow> {
    notifications
        .into_iter()
        .map(|notification| {
            let user_name = names.get(&notification.user_id).cloned().unwrap_or_default();
            NotificationRow { notification, user_name }
        })
        .filter(|row| filter.matches(&row.notification, Some(&row.user_name)))
        .collect()
}

fn names_of(profiles: &[Document]) -> HashMap<String, String> {
    profiles.iter().map(|doc| (doc.id.clone(), profile_name(doc))).collect()
}

#[derive(Clone)]
pub struct NotificationService {
    portal: Portal,
}

fn read_fields() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("read".into(), Value::Bool(true));
    fields.insert("readAt".into(), json!(Utc::now()));
    fields
}

/// Decode a result set; documents that fail to decode are skipped with a warning
fn decode_all(docs: &[Document]) -> Vec<Notification> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<Notification>() {
            Ok(n) => Some(n),
            Err(e) => {
                log::warn!("Skipping undecodable notification {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

fn user_query(user_id: &str) -> Query {
    Query::collection(collections::NOTIFICATIONS)
        .where_eq("userId", user_id)
        .order_by("createdAt", Direction::Descending)
}

/// Name shown for a profile document, tolerant of partial profiles
fn profile_name(doc: &Document) -> String {
    let field = |name: &str| {
        doc.get(name).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    };
    field("fullName").or_else(|| field("email")).unwrap_or_default().to_string()
}

impl NotificationService {
    pub fn new(portal: Portal) -> Self {
        Self { portal }
    }

    /// Resolve the audience and write one record per recipient in one batch
    pub async fn create(&self, request: NewNotification) -> PortalResult<FanOutReceipt> {
        request.validate()?;
        let store = self.portal.store()?;

        let recipients = request.resolve(store.as_ref()).await?;
        let records = request.records(&recipients, Utc::now());

        let mut batch = WriteBatch::new();
        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            let id = new_document_id();
            batch.set(collections::NOTIFICATIONS, &id, encode_fields(record)?);
            ids.push(id);
        }

        if !batch.is_empty() {
            store.commit(batch).await?;
        }

        log::info!(
            "Notification '{}' sent to {} recipient(s) (audience={}, target={})",
            request.title.trim(),
            ids.len(),
            request.audience,
            recipients.target_type
        );
        Ok(FanOutReceipt { recipients: ids.len(), ids })
    }

    /// Set `read` and refresh `readAt`; a missing id is `NotFound`
    pub async fn mark_read(&self, notification_id: &str) -> PortalResult<()> {
        let store = self.portal.store()?;
        store.update(collections::NOTIFICATIONS, notification_id, read_fields()).await?;
        log::debug!("Notification {} marked as read", notification_id);
        Ok(())
    }

    /// Mark every unread notification of a user; returns how many changed
    pub async fn mark_all_read(&self, user_id: &str) -> PortalResult<usize> {
        let store = self.portal.store()?;
        let unread = store
            .query(
                &Query::collection(collections::NOTIFICATIONS)
                    .where_eq("userId", user_id)
                    .where_eq("read", false),
            )
            .await?;

        if unread.is_empty() {
            return Ok(0);
        }

        let fields = read_fields();
        let mut batch = WriteBatch::new();
        for doc in &unread {
            batch.update(collections::NOTIFICATIONS, &doc.id, fields.clone());
        }
        store.commit(batch).await?;

        log::info!("Marked {} notification(s) as read for {}", unread.len(), user_id);
        Ok(unread.len())
    }

    pub async fn delete(&self, notification_id: &str) -> PortalResult<()> {
        let store = self.portal.store()?;
        store.delete(collections::NOTIFICATIONS, notification_id).await?;
        log::info!("Notification {} deleted", notification_id);
        Ok(())
    }

    /// A user's notifications, newest first
    pub async fn list_for_user(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> PortalResult<Vec<Notification>> {
        let store = self.portal.store()?;
        let docs = store.query(&user_query(user_id)).await?;
        Ok(decode_all(&docs).into_iter().filter(|n| filter.matches(n, None)).collect())
    }

    /// Every notification, newest first, with recipient names
    pub async fn list_all(&self, filter: &NotificationFilter) -> PortalResult<Vec<NotificationRow>> {
        let store = self.portal.store()?;
        let notifications_query = Query::collection(collections::NOTIFICATIONS)
            .order_by("createdAt", Direction::Descending);
        let profiles_query = Query::collection(collections::PROFILES);

        let (notifications, profiles) =
            futures::try_join!(store.query(&notifications_query), store.query(&profiles_query))?;

        Ok(build_rows(decode_all(&notifications), &names_of(&profiles), filter))
    }

    pub async fn unread_count(&self, user_id: &str) -> PortalResult<usize> {
        let store = self.portal.store()?;
        let unread = store
            .query(
                &Query::collection(collections::NOTIFICATIONS)
                    .where_eq("userId", user_id)
                    .where_eq("read", false),
            )
            .await?;
        Ok(unread.len())
    }

    /// Live view of a user's notifications, newest first.
    ///
    /// `on_change` receives the full list right away and after every change.
    pub async fn watch_user<F>(&self, user_id: &str, on_change: F) -> PortalResult<Subscription>
    where
        F: Fn(Vec<Notification>) + Send + Sync + 'static,
    {
        let store = self.portal.store()?;
        let listener: Listener = Arc::new(move |docs: &[Document]| on_change(decode_all(docs)));
        Ok(store.subscribe(user_query(user_id), listener).await?)
    }

    /// Live admin list: every notification, newest first, with recipient names.
    ///
    /// `on_change` receives the filtered rows once both notifications and
    /// profiles are loaded, then again whenever either collection changes.
    pub async fn watch_all<F>(&self, filter: NotificationFilter, on_change: F) -> PortalResult<NotificationFeed>
    where
        F: Fn(Vec<NotificationRow>) + Send + Sync + 'static,
    {
        let store = self.portal.store()?;
        let state = Arc::new(Mutex::new(FeedState::default()));
        let filter = Arc::new(filter);
        let on_change = Arc::new(on_change);

        let (feed, view, emit) = (Arc::clone(&state), Arc::clone(&filter), Arc::clone(&on_change));
        let profiles_listener: Listener = Arc::new(move |docs: &[Document]| {
            let rows = {
                let mut state = feed.lock().unwrap_or_else(|e| e.into_inner());
                state.names = names_of(docs);
                state.rows(&view)
            };
            if let Some(rows) = rows {
                (*emit)(rows);
            }
        });
        let profiles =
            store.subscribe(Query::collection(collections::PROFILES), profiles_listener).await?;

        let notifications_listener: Listener = Arc::new(move |docs: &[Document]| {
            let rows = {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                state.notifications = Some(decode_all(docs));
                state.rows(&filter)
            };
            if let Some(rows) = rows {
                (*on_change)(rows);
            }
        });
        let notifications = store
            .subscribe(
                Query::collection(collections::NOTIFICATIONS)
                    .order_by("createdAt", Direction::Descending),
                notifications_listener,
            )
            .await?;

        Ok(NotificationFeed { _profiles: profiles, _notifications: notifications })
    }
}
