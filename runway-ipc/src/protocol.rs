//! IPC protocol definitions and message types

use chrono::{DateTime, Utc};
use runway_interfaces::TenantContext;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// IPC protocol version for compatibility checking
pub const IPC_PROTOCOL_VERSION: u32 = 1;

/// A single script invocation as seen by a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub tenant: TenantContext,
    pub script_name: String,
    pub code: String,
    pub input: Option<JsonValue>,
    pub is_action: bool,
}

/// Messages sent from the orchestrator to a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Lightweight liveness probe
    Health { correlation_id: Uuid },

    /// Run a script and return its outcome
    Run {
        correlation_id: Uuid,
        request: RunRequest,
    },
}

impl WorkerMessage {
    pub fn correlation_id(&self) -> Uuid {
        match self {
            WorkerMessage::Health { correlation_id } => *correlation_id,
            WorkerMessage::Run { correlation_id, .. } => *correlation_id,
        }
    }
}

/// Messages sent from a worker back to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorMessage {
    /// Health probe answer
    Healthy {
        correlation_id: Uuid,
        status: WorkerStatus,
    },

    /// Outcome of a `Run` request
    RunResult {
        correlation_id: Uuid,
        outcome: ScriptOutcome,
    },

    /// The worker could not process the request at all
    Error {
        correlation_id: Option<Uuid>,
        error: WorkerError,
    },
}

/// What happened when the script ran.
///
/// Only `Completed` carries output. A script that fails to load, throws, or
/// never exported a callable is reported here rather than as a transport
/// error, so the orchestrator can tell script bugs from infrastructure
/// failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScriptOutcome {
    Completed {
        output: JsonValue,
    },
    Threw {
        message: String,
        details: Option<JsonValue>,
    },
    LoadFailed {
        message: String,
    },
    MissingDefaultExport,
}

impl ScriptOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScriptOutcome::Completed { .. })
    }
}

/// Worker status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub runner_id: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub scripts_run: u64,
    pub scripts_failed: u64,
}

impl WorkerStatus {
    /// Create a new worker status
    pub fn new(runner_id: String, pid: u32) -> Self {
        let now = Utc::now();
        Self {
            runner_id,
            pid,
            started_at: now,
            last_activity: now,
            scripts_run: 0,
            scripts_failed: 0,
        }
    }

    /// Record a finished script run
    pub fn record_run(&mut self, success: bool) {
        self.scripts_run += 1;
        if !success {
            self.scripts_failed += 1;
        }
        self.last_activity = Utc::now();
    }
}

/// Worker error types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum WorkerError {
    /// The interpreter could not be set up or crashed
    ExecutionFailed { error: String },

    /// Message parse error
    MessageParseError { error: String },

    /// Protocol version the worker does not speak
    UnsupportedProtocol { version: u32 },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::ExecutionFailed { error } => {
                write!(f, "Worker execution failed: {}", error)
            }
            WorkerError::MessageParseError { error } => {
                write!(f, "Message parse error: {}", error)
            }
            WorkerError::UnsupportedProtocol { version } => {
                write!(f, "Unsupported protocol version: {}", version)
            }
        }
    }
}

impl std::error::Error for WorkerError {}

/// Message envelope for all IPC communications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new message envelope
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: IPC_PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == IPC_PROTOCOL_VERSION
    }
}
