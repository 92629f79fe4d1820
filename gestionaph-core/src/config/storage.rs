//! Storage configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Env: GP_STORAGE_BACKEND ("memory" | "file")
    pub backend: StorageBackend,
    /// Root directory; each backend project gets its own subdirectory.
    /// Env: GP_DATA_DIR
    pub data_dir: String,
    /// Sync the journal to disk after every batch.
    /// Env: GP_FSYNC
    pub fsync: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::File, data_dir: "./data".to_string(), fsync: true }
    }
}

impl StorageConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(backend) = env::var("GP_STORAGE_BACKEND") {
            match backend.as_str() {
                "memory" => self.backend = StorageBackend::Memory,
                "file" => self.backend = StorageBackend::File,
                other => log::warn!("Ignoring unknown GP_STORAGE_BACKEND '{}'", other),
            }
        }
        if let Ok(dir) = env::var("GP_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Ok(fsync) = env::var("GP_FSYNC") {
            self.fsync = fsync.parse().unwrap_or(true);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::File && self.data_dir.trim().is_empty() {
            bail!("Invalid data_dir: required for the file backend");
        }
        Ok(())
    }
}
