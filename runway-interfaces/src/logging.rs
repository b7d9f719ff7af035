//! Activity log interface
//!
//! Activity log entries are the user-visible record of what happened while a
//! script ran. They are persisted by another system; the orchestration layer
//! only appends to them, and only when the caller asked for it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InterfaceResult;

/// Log level enumeration
///
/// Ordered from most verbose (Trace) to least verbose (Error).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert log level to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = LogLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(LogLevelParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when parsing log level from string
#[derive(Debug, thiserror::Error)]
#[error("Invalid log level: '{0}'")]
pub struct LogLevelParseError(String);

/// A single activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub level: LogLevel,
    pub environment_id: i64,
    pub activity_log_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// Create an error entry stamped with the current time
    pub fn error(environment_id: i64, activity_log_id: i64, content: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            environment_id,
            activity_log_id,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only activity log.
///
/// Writes are best-effort from the caller's point of view: a failed append
/// is reported but never changes the outcome of a script execution.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, entry: ActivityLogEntry) -> InterfaceResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Trace < LogLevel::Debug);
    }

    #[test]
    fn test_error_entry() {
        let entry = ActivityLogEntry::error(1, 42, "Unable to find integration file for sync-foo");
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.activity_log_id, 42);
        assert_eq!(entry.environment_id, 1);
    }
}
