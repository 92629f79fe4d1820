//! Common imports for applications embedding the portal
//!
//! ```rust,ignore
//! use gestionaph_core::prelude::*;
//! ```

pub use crate::backend::{Diagnostics, Portal};
pub use crate::config::{PortalConfig, StorageBackend};
pub use crate::error::{ActionResult, PortalError, PortalResult};
pub use crate::http::PortalServer;
pub use crate::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use crate::model::{
    avatar_color, Audience, CommunityProject, Notification, Profile, ProjectQuote, ProjectStatus,
    ProjectVote, Role, Vehicle,
};
pub use crate::notifications::{
    AudienceFilter, FanOutReceipt, NewNotification, NotificationFeed, NotificationFilter,
    NotificationRow, NotificationService, StatusFilter,
};
pub use crate::residents::{
    IdentityProvider, MemoryIdentityProvider, NewResident, NewVehicle, ResidentService,
};
pub use crate::store::{DocumentStore, FileStore, MemoryStore, Query, Subscription, WriteBatch};
pub use crate::voting::{tally, NewProject, NewQuote, ProjectTally, QuoteTally, VotingService};
