//! Gestionaph - Core
//!
//! Backend of a residential-community portal: residents receive notifications
//! and vote on the quotes attached to community projects, administrators send
//! notifications, manage projects and onboard residents.
//!
//! # Overview
//!
//! Every entity lives in a document store addressed by collection name
//! (`profiles`, `notifications`, `communityProjects`, `projectQuotes`,
//! `projectVotes`, `vehicles`). The services in this crate are thin layers of
//! validation and bookkeeping over that store:
//!
//! - [`notifications`] - audience resolution and per-recipient fan-out,
//!   read-state mutation and filtered views
//! - [`voting`] - project administration, one-vote-per-resident submission and
//!   the quote tally/ranking
//! - [`residents`] - resident onboarding against an identity provider
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gestionaph_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PortalConfig::load()?;
//!     PortalServer::new(config).serve().await
//! }
//! ```
//!
//! # Architecture
//!
//! - [`store`] - `DocumentStore` trait, in-memory and journaled stores, live
//!   subscriptions
//! - [`backend`] - credential-gated store initialisation
//! - [`http`] - hyper server and route table
//! - [`config`] - layered configuration (defaults, TOML file, environment)
//! - [`logging`] - `log` facade backend with JSON/human/logfmt output

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod notifications;
pub mod residents;
pub mod store;
pub mod voting;

pub mod prelude;

pub use backend::Portal;
pub use error::{ActionResult, PortalError, PortalResult};
pub use http::PortalServer;
pub use store::{DocumentStore, FileStore, MemoryStore};
