//! Audience resolution and per-recipient record building

use crate::error::{PortalError, PortalResult};
use crate::model::{collections, Audience, Notification, Role};
use crate::store::{DocumentStore, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum length of title and message, after trimming
pub const MIN_TEXT_LEN: usize = 3;

/// Sender recorded when the request does not name one
pub const DEFAULT_SENDER: &str = "admin";

/// Admin request to send a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub audience: Audience,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sent_by: Option<String>,
}

/// What a fan-out wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutReceipt {
    pub recipients: usize,
    pub ids: Vec<String>,
}

/// Resolved audience: who receives a copy and how the copies are labelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    pub target_type: String,
    pub user_ids: Vec<String>,
    /// Audience size at send time, stored on every record
    pub total: usize,
}

impl NewNotification {
    pub fn specific(title: &str, message: &str, user_id: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            audience: Audience::Specific,
            user_id: Some(user_id.to_string()),
            sent_by: None,
        }
    }

    pub fn broadcast(title: &str, message: &str, audience: Audience) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            audience,
            user_id: None,
            sent_by: None,
        }
    }

    /// Reject the request before anything is read or written
    pub fn validate(&self) -> PortalResult<()> {
        if self.title.trim().chars().count() < MIN_TEXT_LEN {
            return Err(PortalError::validation("title must have at least 3 characters"));
        }
        if self.message.trim().chars().count() < MIN_TEXT_LEN {
            return Err(PortalError::validation("message must have at least 3 characters"));
        }
        if self.audience == Audience::Specific && self.recipient().is_none() {
            return Err(PortalError::validation("a specific notification needs a userId"));
        }
        Ok(())
    }

    fn recipient(&self) -> Option<&str> {
        self.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Turn the audience into concrete user ids.
    ///
    /// Roles are read at call time; a profile whose role changes between this
    /// read and the batch commit is not reconsidered.
    pub async fn resolve(&self, store: &dyn DocumentStore) -> PortalResult<Recipients> {
        let role = match self.audience {
            Audience::Specific => {
                let user_id = self
                    .recipient()
                    .ok_or_else(|| PortalError::validation("a specific notification needs a userId"))?;
                return Ok(Recipients {
                    target_type: Audience::Specific.as_str().to_string(),
                    user_ids: vec![user_id.to_string()],
                    total: 1,
                });
            }
            Audience::All | Audience::Resident => Role::Resident,
            Audience::Admin => Role::Admin,
        };

        let profiles = store
            .query(&Query::collection(collections::PROFILES).where_eq("role", role.as_str()))
            .await?;
        let user_ids: Vec<String> = profiles.into_iter().map(|doc| doc.id).collect();

        Ok(Recipients {
            target_type: self.audience.as_str().to_string(),
            total: user_ids.len(),
            user_ids,
        })
    }

    /// One record per recipient, sharing the same send time
    pub fn records(&self, recipients: &Recipients, sent_at: DateTime<Utc>) -> Vec<Notification> {
        let sent_by = self
            .sent_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SENDER);

        recipients
            .user_ids
            .iter()
            .map(|user_id| Notification {
                id: String::new(),
                title: self.title.trim().to_string(),
                message: self.message.trim().to_string(),
                read: false,
                created_at: sent_at,
                audience: self.audience,
                target_type: recipients.target_type.clone(),
                user_id: user_id.clone(),
                total_recipients: Some(recipients.total),
                sent_by: sent_by.to_string(),
                read_at: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_rejected() {
        let mut request = NewNotification::broadcast("Hi", "Water outage", Audience::All);
        assert!(matches!(request.validate(), Err(PortalError::Validation(_))));

        request.title = "  Water  ".into();
        request.message = " ok ".into();
        assert!(request.validate().is_err());

        request.message = "Outage from 9 to 11".into();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn specific_needs_a_user() {
        let mut request = NewNotification::specific("Parcel", "A parcel arrived", "  ");
        assert!(request.validate().is_err());
        request.user_id = None;
        assert!(request.validate().is_err());
        request.user_id = Some("u1".into());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn records_share_send_time_and_snapshot() {
        let request = NewNotification::broadcast("Assembly", "Sunday at 10", Audience::All);
        let recipients = Recipients {
            target_type: "all".into(),
            user_ids: vec!["a".into(), "b".into()],
            total: 2,
        };
        let now = Utc::now();
        let records = request.records(&recipients, now);

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|n| n.created_at == now && !n.read));
        assert!(records.iter().all(|n| n.total_recipients == Some(2)));
        assert!(records.iter().all(|n| n.sent_by == DEFAULT_SENDER));
        assert_eq!(records[1].user_id, "b");
    }

    #[tokio::test]
    async fn resolve_counts_the_audience() {
        use crate::store::MemoryStore;
        use serde_json::json;

        let store = MemoryStore::new();
        for (id, role) in [("r1", "resident"), ("r2", "resident"), ("a1", "admin")] {
            let mut data = serde_json::Map::new();
            data.insert("role".into(), json!(role));
            store.set(collections::PROFILES, id, data, false).await.unwrap();
        }

        let all = NewNotification::broadcast("Assembly", "Sunday at 10", Audience::All);
        let recipients = all.resolve(&store).await.unwrap();
        assert_eq!(recipients.user_ids, vec!["r1", "r2"]);
        assert_eq!(recipients.total, 2);

        let one = NewNotification::specific("Parcel", "At the gate", "a1");
        let recipients = one.resolve(&store).await.unwrap();
        assert_eq!((recipients.target_type.as_str(), recipients.total), ("specific", 1));
    }
}
