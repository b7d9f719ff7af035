use std::time::Duration;
use thiserror::Error;

/// Failures of the interpreter itself, as opposed to failures of the script
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Interpreter error: {0}")]
    Engine(String),

    #[error("Script exceeded a runtime limit: {0}")]
    LimitExceeded(String),

    #[error("Script returned a promise that never settled")]
    Unsettled,

    #[error("Script did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Sandbox task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid sandbox state: {0}")]
    InvalidState(#[from] serde_json::Error),
}
