//! Credential-gated access to the document store and identity provider
//!
//! [`Portal::connect`] never fails: when credentials are missing or the store
//! cannot be opened, the cause is logged and every later operation reports
//! [`PortalError::BackendUnavailable`]. The diagnostic endpoint explains why.

use crate::config::{CredentialsConfig, PortalConfig, StorageBackend};
use crate::error::{PortalError, PortalResult};
use crate::notifications::NotificationService;
use crate::residents::{IdentityProvider, MemoryIdentityProvider, ResidentService};
use crate::store::{DocumentStore, FileStore, MemoryStore};
use crate::voting::VotingService;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
struct Backend {
    project_id: String,
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

/// Shared handle to the backend; cheap to clone
#[derive(Clone)]
pub struct Portal {
    backend: Option<Backend>,
    credentials: CredentialsConfig,
}

/// Outcome of the backend self-check, serialized as the diagnostic body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Diagnostics {
    #[serde(rename_all = "camelCase")]
    Unavailable {
        ok: bool,
        why: &'static str,
        has_env: bool,
        env_starts_with: Option<String>,
    },
    Ready {
        ok: bool,
        project: String,
        collections: Vec<String>,
    },
    Failed {
        ok: bool,
        error: String,
    },
}

impl Diagnostics {
    pub fn is_ok(&self) -> bool {
        matches!(self, Diagnostics::Ready { .. })
    }
}

impl Portal {
    /// Load credentials and open the configured store
    pub fn connect(config: &PortalConfig) -> Self {
        let credentials = config.credentials.clone();

        let account = match credentials.load() {
            Ok(account) => account,
            Err(e) => {
                log::error!("Backend initialization failed: {:#}", e);
                return Self::unavailable(credentials);
            }
        };

        let store: Arc<dyn DocumentStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => {
                let dir = PathBuf::from(&config.storage.data_dir).join(&account.project_id);
                match FileStore::open_with(&dir, config.storage.fsync) {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        log::error!("Failed to open store at {}: {}", dir.display(), e);
                        return Self::unavailable(credentials);
                    }
                }
            }
        };

        log::info!(
            "Backend ready: project={} client={} storage={:?}",
            account.project_id,
            account.client_email,
            config.storage.backend
        );

        Self {
            backend: Some(Backend {
                project_id: account.project_id,
                store,
                identity: Arc::new(MemoryIdentityProvider::new()),
            }),
            credentials,
        }
    }

    /// A portal over an already-open store with an in-memory identity provider
    pub fn with_store(project_id: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            backend: Some(Backend {
                project_id: project_id.into(),
                store,
                identity: Arc::new(MemoryIdentityProvider::new()),
            }),
            credentials: CredentialsConfig::default(),
        }
    }

    /// In-memory store, mostly for tests and demos
    pub fn in_memory(project_id: impl Into<String>) -> Self {
        Self::with_store(project_id, Arc::new(MemoryStore::new()))
    }

    pub fn unavailable(credentials: CredentialsConfig) -> Self {
        Self { backend: None, credentials }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        if let Some(backend) = self.backend.as_mut() {
            backend.identity = identity;
        }
        self
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.project_id.as_str())
    }

    pub fn store(&self) -> PortalResult<Arc<dyn DocumentStore>> {
        self.backend.as_ref().map(|b| b.store.clone()).ok_or(PortalError::BackendUnavailable)
    }

    pub fn identity(&self) -> PortalResult<Arc<dyn IdentityProvider>> {
        self.backend.as_ref().map(|b| b.identity.clone()).ok_or(PortalError::BackendUnavailable)
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.clone())
    }

    pub fn voting(&self) -> VotingService {
        VotingService::new(self.clone())
    }

    pub fn residents(&self) -> ResidentService {
        ResidentService::new(self.clone())
    }

    /// Self-check used by the diagnostic endpoint
    pub async fn diagnostics(&self) -> Diagnostics {
        let Some(backend) = &self.backend else {
            return Diagnostics::Unavailable {
                ok: false,
                why: "db_null",
                has_env: self.credentials.has_inline(),
                env_starts_with: self.credentials.inline_prefix(),
            };
        };

        match backend.store.list_collections().await {
            Ok(collections) => {
                Diagnostics::Ready { ok: true, project: backend.project_id.clone(), collections }
            }
            Err(e) => {
                log::error!("Backend self-check failed: {}", e);
                Diagnostics::Failed { ok: false, error: e.to_string() }
            }
        }
    }
}
