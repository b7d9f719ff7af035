//! One-shot client for a script worker
//!
//! Every request opens its own connection, sends one envelope and waits for
//! exactly one reply. A worker that is still starting simply refuses the
//! connection, which is what health polling relies on.

use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::IpcError;
use crate::protocol::{
    CoordinatorMessage, MessageEnvelope, RunRequest, ScriptOutcome, WorkerMessage, WorkerStatus,
};
use crate::transport::{IpcTransport, TcpTransport};

/// Client for a worker listening at `address` (`host:port`)
#[derive(Debug, Clone)]
pub struct WorkerClient {
    address: String,
    connect_timeout: Duration,
}

impl WorkerClient {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    /// Client for a worker on the loopback interface
    pub fn loopback(port: u16, connect_timeout: Duration) -> Self {
        Self::new(format!("127.0.0.1:{}", port), connect_timeout)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Probe the worker
    pub async fn health(&self) -> Result<WorkerStatus, IpcError> {
        let correlation_id = Uuid::new_v4();
        match self
            .request(WorkerMessage::Health { correlation_id })
            .await?
        {
            CoordinatorMessage::Healthy { status, .. } => Ok(status),
            CoordinatorMessage::Error { error, .. } => Err(IpcError::WorkerError(error)),
            other => Err(IpcError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Run a script and wait for its outcome
    pub async fn run(&self, request: RunRequest) -> Result<ScriptOutcome, IpcError> {
        let correlation_id = Uuid::new_v4();
        match self
            .request(WorkerMessage::Run {
                correlation_id,
                request,
            })
            .await?
        {
            CoordinatorMessage::RunResult { outcome, .. } => Ok(outcome),
            CoordinatorMessage::Error { error, .. } => Err(IpcError::WorkerError(error)),
            other => Err(IpcError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    async fn request(&self, message: WorkerMessage) -> Result<CoordinatorMessage, IpcError> {
        let expected = message.correlation_id();

        let mut transport =
            match tokio::time::timeout(self.connect_timeout, TcpTransport::connect(&self.address))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(IpcError::Timeout),
            };

        debug!("Sending {:?} request to {}", expected, self.address);
        transport.send(&MessageEnvelope::new(message)).await?;
        let envelope: MessageEnvelope<CoordinatorMessage> = transport.receive().await?;
        let _ = transport.close().await;

        let actual = match &envelope.message {
            CoordinatorMessage::Healthy { correlation_id, .. }
            | CoordinatorMessage::RunResult { correlation_id, .. } => Some(*correlation_id),
            CoordinatorMessage::Error { correlation_id, .. } => *correlation_id,
        };

        if let Some(actual) = actual {
            if actual != expected {
                return Err(IpcError::CorrelationMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        Ok(envelope.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runway_interfaces::TenantContext;
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Answers a single request with whatever `reply` builds from it
    async fn serve_once<F>(reply: F) -> u16
    where
        F: FnOnce(WorkerMessage) -> CoordinatorMessage + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut transport = TcpTransport::from_stream(stream);
            let envelope: MessageEnvelope<WorkerMessage> = transport.receive().await.unwrap();
            let response = reply(envelope.message);
            transport.send(&MessageEnvelope::new(response)).await.unwrap();
        });
        port
    }

    fn request() -> RunRequest {
        RunRequest {
            tenant: TenantContext::new("conn", "github", 1, 1),
            script_name: "sync-foo".to_string(),
            code: String::new(),
            input: Some(json!({"page": 1})),
            is_action: true,
        }
    }

    #[tokio::test]
    async fn test_health_round_trip() {
        let port = serve_once(|message| CoordinatorMessage::Healthy {
            correlation_id: message.correlation_id(),
            status: WorkerStatus::new("runner-1".to_string(), 1),
        })
        .await;

        let client = WorkerClient::loopback(port, Duration::from_secs(1));
        let status = client.health().await.unwrap();
        assert_eq!(status.runner_id, "runner-1");
    }

    #[tokio::test]
    async fn test_run_returns_outcome() {
        let port = serve_once(|message| match message {
            WorkerMessage::Run {
                correlation_id,
                request,
            } => CoordinatorMessage::RunResult {
                correlation_id,
                outcome: ScriptOutcome::Completed {
                    output: request.input.unwrap_or_default(),
                },
            },
            other => panic!("unexpected {:?}", other),
        })
        .await;

        let client = WorkerClient::loopback(port, Duration::from_secs(1));
        let outcome = client.run(request()).await.unwrap();
        assert_eq!(outcome, ScriptOutcome::Completed { output: json!({"page": 1}) });
    }

    #[tokio::test]
    async fn test_mismatched_correlation_rejected() {
        let port = serve_once(|_| CoordinatorMessage::Healthy {
            correlation_id: Uuid::new_v4(),
            status: WorkerStatus::new("runner-1".to_string(), 1),
        })
        .await;

        let client = WorkerClient::loopback(port, Duration::from_secs(1));
        let result = client.health().await;
        assert!(matches!(result, Err(IpcError::CorrelationMismatch { .. })));
    }

    #[tokio::test]
    async fn test_nothing_listening_is_retryable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = WorkerClient::loopback(port, Duration::from_secs(1));
        let err = client.health().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
