//! Backend service-account credentials
//!
//! A credential file is preferred (`GESTIONAPH_SERVICE_ACCOUNT_PATH`); the
//! single-line inline form (`GESTIONAPH_SERVICE_ACCOUNT_KEY`) is the fallback.
//! Without either the portal starts, but every operation reports the backend
//! as unavailable.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const PATH_ENV: &str = "GESTIONAPH_SERVICE_ACCOUNT_PATH";
pub const KEY_ENV: &str = "GESTIONAPH_SERVICE_ACCOUNT_KEY";

/// Characters of the inline key echoed back by the diagnostic endpoint
const DIAGNOSTIC_PREFIX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self> {
        let account: Self = serde_json::from_str(raw).context("invalid service account JSON")?;
        if account.project_id.trim().is_empty() {
            bail!("service account has an empty project_id");
        }
        Ok(account)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account: {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Parse the inline form, where newlines in the key arrive escaped
    pub fn from_inline(raw: &str) -> Result<Self> {
        let mut account = Self::from_json(raw)?;
        account.private_key = account.private_key.replace("\\n", "\n");
        Ok(account)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Path to the service-account JSON file. Env: GESTIONAPH_SERVICE_ACCOUNT_PATH
    pub path: Option<String>,
    /// Inline service-account JSON. Env only: GESTIONAPH_SERVICE_ACCOUNT_KEY
    #[serde(skip)]
    pub inline: Option<String>,
}

impl CredentialsConfig {
    pub fn merge(&mut self, other: Self) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.inline.is_some() {
            self.inline = other.inline;
        }
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(path) = env::var(PATH_ENV) {
            if !path.is_empty() {
                self.path = Some(path);
            }
        }
        if let Ok(key) = env::var(KEY_ENV) {
            if !key.is_empty() {
                self.inline = Some(key);
            }
        }
    }

    /// Load the configured service account, file first.
    pub fn load(&self) -> Result<ServiceAccount> {
        if let Some(path) = &self.path {
            return ServiceAccount::from_file(path);
        }
        match &self.inline {
            Some(raw) => ServiceAccount::from_inline(raw),
            None => bail!("no credentials: neither {} nor {} is set", PATH_ENV, KEY_ENV),
        }
    }

    pub fn has_inline(&self) -> bool {
        self.inline.is_some()
    }

    /// Leading characters of the inline key, for diagnostics
    pub fn inline_prefix(&self) -> Option<String> {
        self.inline.as_ref().map(|raw| raw.chars().take(DIAGNOSTIC_PREFIX_CHARS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INLINE: &str = r#"{"project_id":"gestionaph","client_email":"svc@gestionaph.test","private_key":"-----BEGIN KEY-----\\nabc\\n-----END KEY-----\\n"}"#;

    #[test]
    fn test_inline_key_newlines_repaired() {
        let account = ServiceAccount::from_inline(INLINE).unwrap();
        assert_eq!(account.project_id, "gestionaph");
        assert_eq!(account.private_key, "-----BEGIN KEY-----\nabc\n-----END KEY-----\n");
    }

    #[test]
    fn test_file_preferred_over_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service-account.json");
        std::fs::write(
            &path,
            r#"{"project_id":"from-file","client_email":"a@b.c","private_key":"k"}"#,
        )
        .unwrap();

        let config = CredentialsConfig {
            path: Some(path.to_string_lossy().into_owned()),
            inline: Some(INLINE.to_string()),
        };
        assert_eq!(config.load().unwrap().project_id, "from-file");
    }

    #[test]
    fn test_missing_credentials() {
        let config = CredentialsConfig::default();
        assert!(config.load().is_err());
        assert!(!config.has_inline());
        assert_eq!(config.inline_prefix(), None);
    }

    #[test]
    fn test_inline_prefix_is_truncated() {
        let config = CredentialsConfig { path: None, inline: Some(INLINE.to_string()) };
        assert_eq!(config.inline_prefix().unwrap().chars().count(), 40);
    }

    #[test]
    fn test_empty_project_id_rejected() {
        assert!(ServiceAccount::from_json(r#"{"project_id":" ","client_email":"","private_key":""}"#)
            .is_err());
    }
}
