//! Where log entries go, and the entry shape handed to formatters

use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub enum LogOutput {
    Stdout { format: Option<LogFormat> },
    Stderr { format: Option<LogFormat> },
    /// Append-only file, created along with its parent directory
    File { path: String },
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Usually the module path
    pub target: String,
    pub fields: BTreeMap<String, Value>,
    pub location: Option<LogLocation>,
}

#[derive(Debug, Clone)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            target: target.into(),
            fields: BTreeMap::new(),
            location: None,
        }
    }

    pub fn from_log_record(record: &log::Record, config: &LoggingConfig) -> Self {
        let mut entry =
            Self::new(record.level().into(), record.args().to_string(), record.target());

        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            entry.location = Some(LogLocation { file: file.to_string(), line });
        }

        for (key, value) in &config.context_fields {
            entry.fields.insert(key.clone(), Value::String(value.clone()));
        }

        entry
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}
