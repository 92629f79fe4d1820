//! Output styles for log entries

use crate::logging::destinations::LogEntry;
use serde_json::Value;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub enum LogFormat {
    /// `{"timestamp":"...","level":"INFO","message":"...","target":"..."}`
    Json,
    /// `2024-01-15 10:30:00.000 INFO  [gestionaph::http] message key=value`
    Human,
    /// `timestamp=... level=INFO target=... message="..."`
    Logfmt,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "text" => Ok(LogFormat::Human),
            "logfmt" => Ok(LogFormat::Logfmt),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
            LogFormat::Logfmt => format_logfmt(entry),
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_json(entry: &LogEntry) -> String {
    let mut json = serde_json::Map::new();
    json.insert("timestamp".into(), Value::String(entry.timestamp.to_rfc3339()));
    json.insert("level".into(), Value::String(entry.level.as_str().to_string()));
    json.insert("message".into(), Value::String(entry.message.clone()));
    json.insert("target".into(), Value::String(entry.target.clone()));

    if let Some(location) = &entry.location {
        json.insert("file".into(), Value::String(location.file.clone()));
        json.insert("line".into(), Value::from(location.line));
    }

    for (key, value) in &entry.fields {
        json.insert(key.clone(), value.clone());
    }

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {:5} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.level.as_str(),
        entry.target,
        entry.message
    );

    for (key, value) in &entry.fields {
        line.push_str(&format!(" {}={}", key, plain(value)));
    }

    line
}

fn format_logfmt(entry: &LogEntry) -> String {
    let quote = |s: &str| format!("\"{}\"", s.replace('"', "\\\""));

    let mut parts = vec![
        format!("timestamp={}", entry.timestamp.to_rfc3339()),
        format!("level={}", entry.level.as_str()),
        format!("target={}", entry.target),
        format!("message={}", quote(&entry.message)),
    ];

    if let Some(location) = &entry.location {
        parts.push(format!("file={}", quote(&location.file)));
        parts.push(format!("line={}", location.line));
    }

    for (key, value) in &entry.fields {
        let rendered = match value {
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            other => quote(&plain(other)),
        };
        parts.push(format!("{}={}", key, rendered));
    }

    parts.join(" ")
}
