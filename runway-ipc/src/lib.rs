//! Worker invocation protocol for Runway
//!
//! This crate defines the request/response protocol spoken between the
//! orchestrator and a script worker, the newline-delimited JSON transport it
//! runs over, and a one-shot client for loopback or remote workers.

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use client::WorkerClient;
pub use error::IpcError;
pub use protocol::{
    CoordinatorMessage, MessageEnvelope, RunRequest, ScriptOutcome, WorkerError, WorkerMessage,
    WorkerStatus, IPC_PROTOCOL_VERSION,
};
pub use transport::{IpcTransport, StreamTransport, TcpTransport};
