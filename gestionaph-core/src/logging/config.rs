//! Logger configuration

use crate::logging::{LogFormat, LogOutput};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub outputs: Vec<LogOutput>,
    /// Default format; an output may override it
    pub format: LogFormat,
    /// Fields stamped on every entry (service name, deployment, ...)
    pub context_fields: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            outputs: vec![LogOutput::Stdout { format: None }],
            format: LogFormat::Human,
            context_fields: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn to_filter(self) -> log::LevelFilter {
        log::Level::from(self).to_level_filter()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

impl LoggingConfig {
    /// JSON lines on stdout at info level
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            outputs: vec![LogOutput::Stdout { format: Some(LogFormat::Json) }],
            format: LogFormat::Json,
            context_fields: BTreeMap::new(),
        }
    }

    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            outputs: vec![LogOutput::Stdout { format: Some(LogFormat::Human) }],
            format: LogFormat::Human,
            context_fields: BTreeMap::new(),
        }
    }

    /// Append every entry to `path` as well
    pub fn with_file_output(mut self, path: &str) -> Self {
        self.outputs.push(LogOutput::File { path: path.to_string() });
        self
    }

    pub fn with_context_field(mut self, key: &str, value: &str) -> Self {
        self.context_fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_stderr(mut self, format: LogFormat) -> Self {
        self.outputs.push(LogOutput::Stderr { format: Some(format) });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_builder_pattern() {
        let config = LoggingConfig::development()
            .with_file_output("./portal.log")
            .with_context_field("service", "gestionaph")
            .with_level(LogLevel::Warn);

        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.context_fields.get("service").map(String::as_str), Some("gestionaph"));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("trace".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_filter(), log::LevelFilter::Debug);
    }
}
