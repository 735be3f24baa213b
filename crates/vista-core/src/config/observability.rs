use serde::{Deserialize, Serialize};

use crate::observability::LogLevel;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level. `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    /// Whether to output JSON format.
    #[serde(default)]
    pub json_format: bool,

    /// Whether plugin loading diagnostics are also kept in memory.
    #[serde(default = "default_true")]
    pub capture_diagnostics: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            json_format: false,
            capture_diagnostics: true,
        }
    }
}

impl LoggingConfig {
    /// Filter directive handed to the subscriber.
    pub fn filter_directive(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.level.to_string())
    }
}

fn default_true() -> bool {
    true
}
