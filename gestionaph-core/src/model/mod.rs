//! Portal records as stored in the document collections
//!
//! Field names on the wire are camelCase to match the stored documents.

pub mod notification;
pub mod profile;
pub mod project;

pub use notification::{Audience, Notification};
pub use profile::{avatar_color, Profile, Role, Vehicle, AVATAR_PALETTE};
pub use project::{CommunityProject, Priority, ProjectQuote, ProjectStatus, ProjectVote};

/// Collection names in the document store
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const COMMUNITY_PROJECTS: &str = "communityProjects";
    pub const PROJECT_QUOTES: &str = "projectQuotes";
    pub const PROJECT_VOTES: &str = "projectVotes";
    pub const VEHICLES: &str = "vehicles";

    pub const ALL: [&str; 6] =
        [PROFILES, NOTIFICATIONS, COMMUNITY_PROJECTS, PROJECT_QUOTES, PROJECT_VOTES, VEHICLES];
}
