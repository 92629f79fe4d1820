//! Error taxonomy shared by every portal operation
//!
//! Three families matter to callers: validation failures (reported before any
//! write), an unavailable backend (credentials missing or unusable), and
//! persistence failures (the store rejected a read or a write). Causes are
//! logged where they happen; user-facing results carry a generic message.

use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Fixed message returned by every operation while the backend is down
pub const BACKEND_UNAVAILABLE: &str = "backend not initialized";

pub type PortalResult<T> = Result<T, PortalError>;

#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{}", BACKEND_UNAVAILABLE)]
    BackendUnavailable,
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Identity provider error: {0}")]
    Identity(#[from] crate::residents::IdentityError),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    /// Snake-case code used in JSON error bodies and log lines
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Validation(_) => "invalid_input",
            PortalError::BackendUnavailable => "backend_unavailable",
            PortalError::NotFound { .. } => "not_found",
            PortalError::Persistence(_) => "persistence_error",
            PortalError::Identity(_) => "identity_error",
        }
    }

    /// Message safe to show an end user.
    ///
    /// Validation and backend errors are shown as-is; persistence failures are
    /// replaced by `fallback` so the underlying cause stays in the logs.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            PortalError::Validation(msg) => msg.clone(),
            PortalError::BackendUnavailable => BACKEND_UNAVAILABLE.to_string(),
            PortalError::Identity(e) => e.user_message(),
            PortalError::NotFound { .. } | PortalError::Persistence(_) => fallback.to_string(),
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => PortalError::NotFound { collection, id },
            other => PortalError::Persistence(other.to_string()),
        }
    }
}

/// Result envelope returned by every mutation endpoint: `{ok, error?, ...}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self { ok: true, ..Default::default() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { ok: false, error: Some(message.into()), ..Default::default() }
    }

    /// Convert an operation outcome, logging the cause of any failure
    pub fn from_error(operation: &str, err: &PortalError, fallback: &str) -> Self {
        match err {
            PortalError::Validation(_) => log::warn!("{} rejected: {}", operation, err),
            _ => log::error!("{} failed: {}", operation, err),
        }
        Self::failed(err.user_message(fallback))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}
