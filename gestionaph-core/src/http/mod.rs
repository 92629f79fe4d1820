//! HTTP surface of the portal
//!
//! Admin routes live under `/api/admin/*`, resident routes under `/api/*`.
//! Mutations answer `{ok, error?, id?, count?, uid?, info?}`.

pub mod response;
pub mod routes;
pub mod server;

pub use response::Resp;
pub use routes::{dispatch, parse_query};
pub use server::PortalServer;
