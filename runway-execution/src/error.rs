//! Error types for script execution

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Stable, serialisable classification of a failed execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ScriptNotFound,
    ScriptLoadFailure,
    SpawnFailure,
    HealthTimeout,
    RemoteUnavailable,
    ExecutionFailure,
    ActionScriptFailure,
    SyncScriptFailure,
    MissingDefaultExport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ScriptNotFound => "script_not_found",
            ErrorKind::ScriptLoadFailure => "script_load_failure",
            ErrorKind::SpawnFailure => "spawn_failure",
            ErrorKind::HealthTimeout => "health_timeout",
            ErrorKind::RemoteUnavailable => "remote_unavailable",
            ErrorKind::ExecutionFailure => "execution_failure",
            ErrorKind::ActionScriptFailure => "action_script_failure",
            ErrorKind::SyncScriptFailure => "sync_script_failure",
            ErrorKind::MissingDefaultExport => "missing_default_export",
        }
    }

    /// Failure kind for an error raised by the script itself
    pub fn script_failure(is_action: bool) -> Self {
        if is_action {
            ErrorKind::ActionScriptFailure
        } else {
            ErrorKind::SyncScriptFailure
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Script execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Unable to find integration file for {script_name}")]
    ScriptNotFound { script_name: String },

    #[error("The script failed to load for {script_name} with the following error: {cause}")]
    ScriptLoadFailure { script_name: String, cause: String },

    #[error("Failed to start runner {runner_id}: {reason}")]
    SpawnFailure { runner_id: String, reason: String },

    #[error("Runner {runner_id} did not become healthy within {timeout:?}")]
    HealthTimeout { runner_id: String, timeout: Duration },

    #[error("Remote runner {runner_id} is unavailable: {reason}")]
    RemoteUnavailable { runner_id: String, reason: String },

    #[error("Runner {runner_id} failed: {reason}")]
    RunnerFailure { runner_id: String, reason: String },

    /// The runner answered but can never serve this caller
    #[error("Runner {runner_id} is incompatible: {reason}")]
    RunnerIncompatible { runner_id: String, reason: String },

    #[error("There was an error running integration '{script_name}': {cause}")]
    ExecutionFailure { script_name: String, cause: String },

    #[error("{script_name} failed with the following error: {message}")]
    ScriptFailure {
        kind: ErrorKind,
        script_name: String,
        message: String,
        details: Option<JsonValue>,
    },

    #[error("There is no default export that is a function for {script_name}")]
    MissingDefaultExport { script_name: String },
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::ScriptNotFound { .. } => ErrorKind::ScriptNotFound,
            ExecutionError::ScriptLoadFailure { .. } => ErrorKind::ScriptLoadFailure,
            ExecutionError::SpawnFailure { .. } => ErrorKind::SpawnFailure,
            ExecutionError::HealthTimeout { .. } => ErrorKind::HealthTimeout,
            ExecutionError::RemoteUnavailable { .. } => ErrorKind::RemoteUnavailable,
            ExecutionError::RunnerFailure { .. } => ErrorKind::ExecutionFailure,
            ExecutionError::RunnerIncompatible { .. } => ErrorKind::ExecutionFailure,
            ExecutionError::ExecutionFailure { .. } => ErrorKind::ExecutionFailure,
            ExecutionError::ScriptFailure { kind, .. } => *kind,
            ExecutionError::MissingDefaultExport { .. } => ErrorKind::MissingDefaultExport,
        }
    }

    /// Whether the failure was caused by the runner substrate rather than the script
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ExecutionError::SpawnFailure { .. }
                | ExecutionError::HealthTimeout { .. }
                | ExecutionError::RemoteUnavailable { .. }
                | ExecutionError::RunnerFailure { .. }
                | ExecutionError::RunnerIncompatible { .. }
                | ExecutionError::ExecutionFailure { .. }
        )
    }

    /// Waiting longer cannot make the runner healthy
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionError::RunnerIncompatible { .. })
    }
}

/// Structured error carried by a failed [`ExecutionResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl From<&ExecutionError> for ScriptError {
    fn from(err: &ExecutionError) -> Self {
        let details = match err {
            ExecutionError::ScriptFailure { details, .. } => details.clone(),
            _ => None,
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            details,
        }
    }
}

/// Outcome of one `run_script` call.
///
/// Exactly one of `response` and `error` is populated; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ScriptError>,
}

impl ExecutionResult {
    pub fn success(response: JsonValue) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(error: ScriptError) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn response(&self) -> Option<&JsonValue> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&ScriptError> {
        self.error.as_ref()
    }

    pub fn into_response(self) -> Result<JsonValue, ScriptError> {
        match (self.response, self.error) {
            (Some(response), None) => Ok(response),
            (_, Some(error)) => Err(error),
            (None, None) => Ok(JsonValue::Null),
        }
    }
}

impl From<ExecutionError> for ExecutionResult {
    fn from(err: ExecutionError) -> Self {
        ExecutionResult::failure(ScriptError::from(&err))
    }
}
