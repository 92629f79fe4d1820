//! Configuration system for Gestionaph
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code / CLI flags** (builder methods)
//! 2. **Environment Variables** (`GP_*`)
//! 3. **Config File** (`config.toml`)
//! 4. **Defaults**
//!
//! Backend credentials are not part of the TOML file; they come from
//! `GESTIONAPH_SERVICE_ACCOUNT_PATH` or `GESTIONAPH_SERVICE_ACCOUNT_KEY` (see
//! [`credentials`]).
//!
//! # Example
//!
//! ```no_run
//! use gestionaph_core::config::PortalConfig;
//!
//! let config = PortalConfig::load()?;
//! let config = PortalConfig::load_from("deploy/portal.toml")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod credentials;
pub mod logging;
pub mod server;
pub mod storage;

pub use credentials::{CredentialsConfig, ServiceAccount};
pub use logging::LoggingSection;
pub use server::ServerConfig;
pub use storage::{StorageBackend, StorageConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete portal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingSection,
    pub credentials: CredentialsConfig,
}

impl PortalConfig {
    /// Load `config.toml` from the working directory (if present) plus env
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.storage.merge(other.storage);
        self.logging.merge(other.logging);
        self.credentials.merge(other.credentials);
    }

    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.storage.apply_env_vars();
        self.logging.apply_env_vars();
        self.credentials.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PortalConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PortalConfig::from_toml(
            r#"
            [server]
            port = 9090

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.data_dir, "./data");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(PortalConfig::from_toml("[server\nport = ").is_err());
    }
}
