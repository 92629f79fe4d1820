use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Targeting rule for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Every resident
    All,
    /// Every profile with the resident role
    Resident,
    /// Every profile with the admin role
    Admin,
    /// One user, named by id
    Specific,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Resident => "resident",
            Audience::Admin => "admin",
            Audience::Specific => "specific",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Audience::All),
            "resident" => Ok(Audience::Resident),
            "admin" => Ok(Audience::Admin),
            "specific" => Ok(Audience::Specific),
            other => Err(format!("unknown audience '{}'", other)),
        }
    }
}

/// One notification record. A fan-out writes one per recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub audience: Audience,
    /// `"specific"`, `"all"` or the role name the audience resolved through
    pub target_type: String,
    /// Recipient
    pub user_id: String,
    /// Audience size when the fan-out ran; never recomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_recipients: Option<usize>,
    #[serde(default)]
    pub sent_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Broadcast rows as the admin view groups them
    pub fn is_broadcast(&self) -> bool {
        self.target_type == "all" || self.audience == Audience::Resident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audience_round_trips_through_strings() {
        for audience in [Audience::All, Audience::Resident, Audience::Admin, Audience::Specific] {
            assert_eq!(audience.as_str().parse::<Audience>().unwrap(), audience);
        }
        assert!("everyone".parse::<Audience>().is_err());
    }

    #[test]
    fn stored_shape_is_camel_case() {
        let n = Notification {
            id: "n1".into(),
            title: "Pool closed".into(),
            message: "Maintenance on Friday".into(),
            read: false,
            created_at: Utc::now(),
            audience: Audience::All,
            target_type: "all".into(),
            user_id: "u1".into(),
            total_recipients: Some(3),
            sent_by: "admin".into(),
            read_at: None,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["userId"], json!("u1"));
        assert_eq!(value["targetType"], json!("all"));
        assert_eq!(value["totalRecipients"], json!(3));
        assert!(value.get("readAt").is_none());
        assert!(n.is_broadcast());
    }
}
