//! Logging configuration section (file/env side of [`crate::logging::LoggingConfig`])

use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Env: GP_LOG_LEVEL
    pub level: String,
    /// "json" | "human" | "logfmt". Env: GP_LOG_FORMAT
    pub format: String,
    /// Optional log file, written in addition to stdout
    pub file_path: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "human".to_string(), file_path: None }
    }
}

impl LoggingSection {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("GP_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("GP_LOG_FORMAT") {
            self.format = format;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.level.parse::<LogLevel>().is_err() {
            bail!("Invalid log level '{}'", self.level);
        }
        if self.format.parse::<LogFormat>().is_err() {
            bail!("Invalid log format '{}'", self.format);
        }
        Ok(())
    }

    /// Build the logger configuration this section describes
    pub fn to_logging_config(&self) -> Result<LoggingConfig> {
        self.validate()?;
        let level: LogLevel = self.level.parse().map_err(anyhow::Error::msg)?;
        let format: LogFormat = self.format.parse().map_err(anyhow::Error::msg)?;
        let mut config = LoggingConfig::default().with_level(level).with_format(format);
        if let Some(path) = &self.file_path {
            config = config.with_file_output(path);
        }
        Ok(config.with_context_field("service", "gestionaph"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_to_logging_config() {
        let section = LoggingSection {
            level: "debug".into(),
            format: "json".into(),
            file_path: Some("./logs/portal.log".into()),
        };
        let config = section.to_logging_config().unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.outputs.len(), 2);
    }

    #[test]
    fn test_unknown_level_rejected() {
        let section = LoggingSection { level: "loud".into(), ..Default::default() };
        assert!(section.validate().is_err());
    }
}
