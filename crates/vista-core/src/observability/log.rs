use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Error for parsing LogLevel from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLogLevelError(pub String);

impl std::fmt::Display for ParseLogLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid log level: {}", self.0)
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

/// A diagnostic emitted while loading plugins or resolving variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Module path of the emitting code.
    pub target: Option<String>,
    /// Structured fields (`plugin`, `module`, `url`, ...).
    pub fields: HashMap<String, serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl LogEntry {
    /// Create a new log entry.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            target: None,
            fields: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a warn log.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Create an error log.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// String value of a structured field, if present and a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Check if this log matches a minimum level filter.
    pub fn matches_level(&self, min_level: LogLevel) -> bool {
        self.level >= min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert_eq!("Warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(
            "verbose".parse::<LogLevel>(),
            Err(ParseLogLevelError("verbose".to_string()))
        );
    }

    #[test]
    fn test_log_level_display_round_trips_through_from_str() {
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Error] {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(LogLevel::from(tracing::Level::WARN), LogLevel::Warn);
        assert_eq!(LogLevel::from(tracing::Level::TRACE), LogLevel::Trace);
    }

    #[test]
    fn test_log_entry_fields() {
        let entry = LogEntry::error("RemotePluginLoader: Error loading plugin timeseries")
            .with_target("vista_runtime::plugin::loader")
            .with_field("plugin", "timeseries")
            .with_field("index", 2);

        assert_eq!(entry.field_str("plugin"), Some("timeseries"));
        assert_eq!(entry.field_str("index"), None);
        assert!(entry.matches_level(LogLevel::Warn));
        assert!(!LogEntry::warn("dropped").matches_level(LogLevel::Error));
    }
}
