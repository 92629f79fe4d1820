//! Community projects, quotes and votes
//!
//! Administrators create projects, attach provider quotes and move projects
//! through `proposal -> voting -> approved | rejected`. While a project is in
//! `voting`, each resident holds exactly one vote slot per project, keyed by
//! `"{projectId}_{userId}"`; voting again overwrites the slot.

pub mod tally;

pub use tally::{tally, ProjectTally, QuoteTally};

use crate::backend::Portal;
use crate::error::{PortalError, PortalResult};
use crate::model::{
    collections, CommunityProject, Priority, ProjectQuote, ProjectStatus, ProjectVote,
};
use crate::store::{encode_fields, Direction, DocumentStore, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
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
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub voting_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewProject {
    pub fn new(title: &str, description: &str, budget: f64) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            justification: String::new(),
            priority: Priority::default(),
            viability: String::new(),
            budget,
            status: None,
            voting_deadline: None,
            created_by: None,
        }
    }

    pub fn validate(&self) -> PortalResult<()> {
        if self.title.trim().chars().count() < 3 {
            return Err(PortalError::validation("title must have at least 3 characters"));
        }
        if self.description.trim().chars().count() < 3 {
            return Err(PortalError::validation("description must have at least 3 characters"));
        }
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(PortalError::validation("budget must be a non-negative amount"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuote {
    pub provider_name: String,
    pub amount: f64,
    pub file_url: String,
}

impl NewQuote {
    pub fn validate(&self) -> PortalResult<()> {
        if self.provider_name.trim().chars().count() < 2 {
            return Err(PortalError::validation("providerName must have at least 2 characters"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(PortalError::validation("amount must be a non-negative amount"));
        }
        if self.file_url.trim().is_empty() {
            return Err(PortalError::validation("fileUrl is required"));
        }
        Ok(())
    }
}

/// A project with everything the voting page shows for it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub project: CommunityProject,
    pub quotes: Vec<ProjectQuote>,
    pub tally: ProjectTally,
    /// The viewer's vote, when a viewer was given and has voted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<ProjectVote>,
}

#[derive(Clone)]
pub struct VotingService {
    portal: Portal,
}

async fn load_project(store: &dyn DocumentStore, project_id: &str) -> PortalResult<Option<CommunityProject>> {
    match store.get(collections::COMMUNITY_PROJECTS, project_id).await? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

async fn require_project(store: &dyn DocumentStore, project_id: &str) -> PortalResult<CommunityProject> {
    load_project(store, project_id).await?.ok_or_else(|| PortalError::NotFound {
        collection: collections::COMMUNITY_PROJECTS.to_string(),
        id: project_id.to_string(),
    })
}

async fn load_quotes(store: &dyn DocumentStore, project_id: &str) -> PortalResult<Vec<ProjectQuote>> {
    let docs = store
        .query(
            &Query::collection(collections::PROJECT_QUOTES)
                .where_eq("projectId", project_id)
                .order_by("createdAt", Direction::Ascending),
        )
        .await?;
    docs.iter().map(|doc| doc.decode::<ProjectQuote>().map_err(Into::into)).collect()
}

async fn load_votes(store: &dyn DocumentStore, project_id: &str) -> PortalResult<Vec<ProjectVote>> {
    let docs = store
        .query(&Query::collection(collections::PROJECT_VOTES).where_eq("projectId", project_id))
        .await?;
    docs.iter().map(|doc| doc.decode::<ProjectVote>().map_err(Into::into)).collect()
}

impl VotingService {
    pub fn new(portal: Portal) -> Self {
        Self { portal }
    }

    pub async fn create_project(&self, request: NewProject) -> PortalResult<String> {
        request.validate()?;
        let store = self.portal.store()?;

        let project = CommunityProject {
            id: String::new(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            justification: request.justification,
            priority: request.priority,
            viability: request.viability,
            budget: request.budget,
            status: request.status.unwrap_or_default(),
            voting_deadline: request.voting_deadline,
            created_by: request.created_by.unwrap_or_else(|| "admin".to_string()),
            created_at: Utc::now(),
        };
        let id = store.add(collections::COMMUNITY_PROJECTS, encode_fields(&project)?).await?;
        log::info!("Project {} created: '{}' ({})", id, project.title, project.status);
        Ok(id)
    }

    pub async fn add_quote(&self, project_id: &str, request: NewQuote) -> PortalResult<String> {
        request.validate()?;
        let store = self.portal.store()?;

        require_project(store.as_ref(), project_id).await?;

        let quote = ProjectQuote {
            id: String::new(),
            project_id: project_id.to_string(),
            provider_name: request.provider_name.trim().to_string(),
            amount: request.amount,
            file_url: request.file_url.trim().to_string(),
            created_at: Utc::now(),
        };
        let id = store.add(collections::PROJECT_QUOTES, encode_fields(&quote)?).await?;
        log::info!("Quote {} from '{}' added to project {}", id, quote.provider_name, project_id);
        Ok(id)
    }

    pub async fn set_status(&self, project_id: &str, status: ProjectStatus) -> PortalResult<()> {
        let store = self.portal.store()?;
        let mut fields = Map::new();
        fields.insert("status".into(), Value::String(status.as_str().to_string()));
        store.update(collections::COMMUNITY_PROJECTS, project_id, fields).await?;
        log::info!("Project {} moved to {}", project_id, status);
        Ok(())
    }

    /// Record (or replace) a resident's vote; returns the vote document id
    pub async fn submit_vote(
        &self,
        project_id: &str,
        user_id: &str,
        quote_id: &str,
    ) -> PortalResult<String> {
        if user_id.trim().is_empty() {
            return Err(PortalError::validation("userId is required"));
        }
        if quote_id.trim().is_empty() {
            return Err(PortalError::validation("quoteId is required"));
        }
        let store = self.portal.store()?;

        let now = Utc::now();
        let project = load_project(store.as_ref(), project_id)
            .await?
            .ok_or_else(|| PortalError::validation("project does not exist"))?;
        if project.status != ProjectStatus::Voting {
            return Err(PortalError::validation("project is not open for voting"));
        }
        if !project.accepts_votes_at(now) {
            return Err(PortalError::validation("voting deadline has passed"));
        }

        let quote = store.get(collections::PROJECT_QUOTES, quote_id).await?;
        let belongs = quote
            .as_ref()
            .and_then(|doc| doc.get("projectId"))
            .and_then(Value::as_str)
            .map(|owner| owner == project_id)
            .unwrap_or(false);
        if !belongs {
            return Err(PortalError::validation("quote does not belong to this project"));
        }

        let key = ProjectVote::key(project_id, user_id);
        let vote = ProjectVote {
            id: key.clone(),
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            vote_choice: quote_id.to_string(),
            created_at: now,
        };
        store.set(collections::PROJECT_VOTES, &key, encode_fields(&vote)?, false).await?;
        log::info!("Vote {} recorded for quote {}", key, quote_id);
        Ok(key)
    }

    /// Ranking of one project; an unknown project is `NotFound`
    pub async fn project_tally(&self, project_id: &str) -> PortalResult<ProjectTally> {
        let store = self.portal.store()?;
        require_project(store.as_ref(), project_id).await?;
        let (quotes, votes) = futures::try_join!(
            load_quotes(store.as_ref(), project_id),
            load_votes(store.as_ref(), project_id)
        )?;
        Ok(tally(&quotes, &votes))
    }

    /// Projects newest first, each with quotes, ranking and the viewer's vote
    pub async fn list_projects(&self, viewer: Option<&str>) -> PortalResult<Vec<ProjectOverview>> {
        let store = self.portal.store()?;
        let docs = store
            .query(
                &Query::collection(collections::COMMUNITY_PROJECTS)
                    .order_by("createdAt", Direction::Descending),
            )
            .await?;
        let projects: Vec<CommunityProject> =
            docs.iter().map(|doc| doc.decode::<CommunityProject>()).collect::<Result<_, _>>()?;

        let store = store.as_ref();
        let overviews = projects.into_iter().map(|project| async move {
            let (quotes, votes) =
                futures::try_join!(load_quotes(store, &project.id), load_votes(store, &project.id))?;
            let user_vote = viewer.and_then(|viewer| votes.iter().find(|v| v.user_id == viewer).cloned());
            let tally = tally(&quotes, &votes);
            Ok::<_, PortalError>(ProjectOverview { project, quotes, tally, user_vote })
        });
        futures::future::try_join_all(overviews).await
    }
}
