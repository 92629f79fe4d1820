//! Filters applied by the resident and admin notification views

use crate::model::Notification;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(StatusFilter::All),
            "read" => Ok(StatusFilter::Read),
            "unread" => Ok(StatusFilter::Unread),
            other => Err(format!("unknown status filter '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudienceFilter {
    #[default]
    All,
    Specific,
    /// `targetType == "all"` or `audience == resident`
    Broadcast,
}

impl FromStr for AudienceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(AudienceFilter::All),
            "specific" => Ok(AudienceFilter::Specific),
            "broadcast" => Ok(AudienceFilter::Broadcast),
            other => Err(format!("unknown audience filter '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub status: StatusFilter,
    pub audience: AudienceFilter,
    /// Case-insensitive substring of title, message or recipient name
    pub search: Option<String>,
}

impl NotificationFilter {
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_audience(mut self, audience: AudienceFilter) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() { None } else { Some(search) };
        self
    }

    /// `user_name` is only searched when the caller supplies it (admin view)
    pub fn matches(&self, notification: &Notification, user_name: Option<&str>) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Read => notification.read,
            StatusFilter::Unread => !notification.read,
        };
        if !status_ok {
            return false;
        }

        let audience_ok = match self.audience {
            AudienceFilter::All => true,
            AudienceFilter::Specific => notification.target_type == "specific",
            AudienceFilter::Broadcast => notification.is_broadcast(),
        };
        if !audience_ok {
            return false;
        }

        match &self.search {
            None => true,
            Some(term) => {
                let term = term.trim().to_lowercase();
                notification.title.to_lowercase().contains(&term)
                    || notification.message.to_lowercase().contains(&term)
                    || user_name.map(|name| name.to_lowercase().contains(&term)).unwrap_or(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Audience;
    use chrono::Utc;

    fn notification(read: bool, audience: Audience, target_type: &str) -> Notification {
        Notification {
            id: "n".into(),
            title: "Gas Inspection".into(),
            message: "Technicians visit on Tuesday".into(),
            read,
            created_at: Utc::now(),
            audience,
            target_type: target_type.into(),
            user_id: "u1".into(),
            total_recipients: None,
            sent_by: "admin".into(),
            read_at: None,
        }
    }

    #[test]
    fn status_filter() {
        let unread = NotificationFilter::default().with_status(StatusFilter::Unread);
        assert!(unread.matches(&notification(false, Audience::All, "all"), None));
        assert!(!unread.matches(&notification(true, Audience::All, "all"), None));
    }

    #[test]
    fn broadcast_covers_all_and_resident() {
        let broadcast = NotificationFilter::default().with_audience(AudienceFilter::Broadcast);
        assert!(broadcast.matches(&notification(false, Audience::All, "all"), None));
        assert!(broadcast.matches(&notification(false, Audience::Resident, "resident"), None));
        assert!(!broadcast.matches(&notification(false, Audience::Admin, "admin"), None));
        assert!(!broadcast.matches(&notification(false, Audience::Specific, "specific"), None));
    }

    #[test]
    fn search_is_case_insensitive_and_covers_names() {
        let n = notification(false, Audience::Specific, "specific");
        assert!(NotificationFilter::default().with_search("gas").matches(&n, None));
        assert!(NotificationFilter::default().with_search("TUESDAY").matches(&n, None));
        assert!(!NotificationFilter::default().with_search("lucia").matches(&n, None));
        assert!(NotificationFilter::default().with_search("lucia").matches(&n, Some("Lucia Ramos")));
        assert!(NotificationFilter::default().with_search("   ").matches(&n, None));
    }

    #[test]
    fn parsing_accepts_empty_as_all() {
        assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("broadcast".parse::<AudienceFilter>(), Ok(AudienceFilter::Broadcast));
        assert!("everyone".parse::<AudienceFilter>().is_err());
    }
}
