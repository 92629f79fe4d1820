use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Proposal,
    Voting,
    Approved,
    Rejected,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Proposal => "proposal",
            ProjectStatus::Voting => "voting",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposal" => Ok(ProjectStatus::Proposal),
            "voting" => Ok(ProjectStatus::Voting),
            "approved" => Ok(ProjectStatus::Approved),
            "rejected" => Ok(ProjectStatus::Rejected),
            other => Err(format!("unknown project status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityProject {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub viability: String,
    pub budget: f64,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub voting_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl CommunityProject {
    /// Whether a vote cast at `now` is accepted
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ProjectStatus::Voting
            && self.voting_deadline.map(|deadline| now <= deadline).unwrap_or(true)
    }
}

/// A provider's priced proposal for a project; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuote {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub provider_name: String,
    pub amount: f64,
    #[serde(default)]
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVote {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    /// Id of the quote voted for
    pub vote_choice: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectVote {
    /// Document id of a user's vote on a project; one slot per pair
    pub fn key(project_id: &str, user_id: &str) -> String {
        format!("{}_{}", project_id, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn project(status: ProjectStatus, deadline: Option<DateTime<Utc>>) -> CommunityProject {
        CommunityProject {
            id: "p1".into(),
            title: "New gate".into(),
            description: "Replace the main gate".into(),
            justification: String::new(),
            priority: Priority::High,
            viability: String::new(),
            budget: 1_500_000.0,
            status,
            voting_deadline: deadline,
            created_by: "admin".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn votes_only_during_voting_before_deadline() {
        let now = Utc::now();
        assert!(project(ProjectStatus::Voting, None).accepts_votes_at(now));
        assert!(project(ProjectStatus::Voting, Some(now + Duration::days(1))).accepts_votes_at(now));
        assert!(!project(ProjectStatus::Voting, Some(now - Duration::days(1))).accepts_votes_at(now));
        assert!(!project(ProjectStatus::Proposal, None).accepts_votes_at(now));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let project: CommunityProject = serde_json::from_value(json!({
            "title": "Paint",
            "description": "Paint the facade",
            "budget": 1000.0,
            "createdAt": "2024-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(project.priority, Priority::Medium);
        assert_eq!(project.status, ProjectStatus::Proposal);
        assert!(project.justification.is_empty());
        assert!(project.voting_deadline.is_none());
    }

    #[test]
    fn vote_key_is_composite() {
        assert_eq!(ProjectVote::key("p1", "u9"), "p1_u9");
    }
}
