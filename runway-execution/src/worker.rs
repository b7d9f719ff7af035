//! Script worker server
//!
//! The process launched by a process runner. It listens on loopback, answers
//! health probes and runs scripts in the restricted interpreter, one request
//! per connection.

use parking_lot::Mutex;
use runway_ipc::{
    CoordinatorMessage, IpcError, IpcTransport, MessageEnvelope, TcpTransport, WorkerError,
    WorkerMessage, WorkerStatus,
};
use runway_sandbox::Sandbox;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

pub struct WorkerServer {
    runner_id: String,
    sandbox: Sandbox,
    status: Mutex<WorkerStatus>,
}

impl WorkerServer {
    pub fn new(runner_id: impl Into<String>, sandbox: Sandbox) -> Self {
        let runner_id = runner_id.into();
        let status = WorkerStatus::new(runner_id.clone(), std::process::id());
        Self {
            runner_id,
            sandbox,
            status: Mutex::new(status),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.lock().clone()
    }

    /// Accept connections until the listener fails
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), IpcError> {
        info!(
            "Worker {} listening on {}",
            self.runner_id,
            listener.local_addr()?
        );

        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("Worker {} accepted connection from {}", self.runner_id, peer);
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    warn!("Worker {} connection failed: {}", server.runner_id, e);
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<(), IpcError> {
        let mut transport = TcpTransport::from_stream(stream);

        let response = match transport.receive::<WorkerMessage>().await {
            Ok(envelope) => self.handle(envelope.message).await,
            Err(IpcError::ProtocolVersionMismatch { actual, .. }) => CoordinatorMessage::Error {
                correlation_id: None,
                error: WorkerError::UnsupportedProtocol { version: actual },
            },
            Err(IpcError::DeserializationError(e)) => {
                error!("Worker {} failed to parse message: {}", self.runner_id, e);
                CoordinatorMessage::Error {
                    correlation_id: None,
                    error: WorkerError::MessageParseError { error: e },
                }
            }
            Err(e) => return Err(e),
        };

        transport.send(&MessageEnvelope::new(response)).await?;
        transport.close().await
    }

    /// Process a single message
    pub async fn handle(&self, message: WorkerMessage) -> CoordinatorMessage {
        match message {
            WorkerMessage::Health { correlation_id } => CoordinatorMessage::Healthy {
                correlation_id,
                status: self.status(),
            },
            WorkerMessage::Run {
                correlation_id,
                request,
            } => {
                info!(
                    "Worker {} running {} (action: {})",
                    self.runner_id, request.script_name, request.is_action
                );

                match self.sandbox.run(request).await {
                    Ok(outcome) => {
                        self.status.lock().record_run(outcome.is_completed());
                        CoordinatorMessage::RunResult {
                            correlation_id,
                            outcome,
                        }
                    }
                    Err(e) => {
                        self.status.lock().record_run(false);
                        CoordinatorMessage::Error {
                            correlation_id: Some(correlation_id),
                            error: WorkerError::ExecutionFailed {
                                error: e.to_string(),
                            },
                        }
                    }
                }
            }
        }
    }
}
