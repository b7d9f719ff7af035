//! Runner contract shared by every execution substrate

use async_trait::async_trait;
use runway_ipc::{IpcError, RunRequest, ScriptOutcome};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ExecutionError;

/// Which substrate a runner is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerKind {
    Process,
    InProcess,
    Remote,
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerKind::Process => write!(f, "process"),
            RunnerKind::InProcess => write!(f, "in-process"),
            RunnerKind::Remote => write!(f, "remote"),
        }
    }
}

/// An execution substrate able to run one script invocation.
///
/// A runner is owned by exactly one `run_script` call and is stopped before
/// that call returns.
#[async_trait]
pub trait Runner: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> RunnerKind;

    /// Lightweight liveness probe
    async fn health(&self) -> Result<(), ExecutionError>;

    /// Run a script and wait for its outcome
    async fn invoke(&self, request: &RunRequest) -> Result<ScriptOutcome, ExecutionError>;

    /// Release the substrate
    async fn stop(&self) -> Result<(), ExecutionError>;
}

pub type RunnerHandle = Box<dyn Runner>;

/// Produces a ready-to-use runner of one kind
#[async_trait]
pub trait RunnerProvider: Send + Sync {
    fn kind(&self) -> RunnerKind;

    async fn provide(&self, runner_id: &str) -> Result<RunnerHandle, ExecutionError>;
}

/// Probe `runner` every `interval` until it answers or `timeout` elapses.
///
/// A fatal health error ends the wait immediately.
pub async fn wait_healthy(
    runner: &dyn Runner,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ExecutionError> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, runner.health()).await {
            Ok(Ok(())) => {
                debug!("Runner {} is healthy", runner.id());
                return Ok(());
            }
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => debug!("Runner {} not healthy yet: {}", runner.id(), e),
            Err(_) => break,
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }

    Err(ExecutionError::HealthTimeout {
        runner_id: runner.id().to_string(),
        timeout,
    })
}

/// Map a failed health call. Fatal errors become [`ExecutionError::RunnerIncompatible`],
/// everything else is reported through `transient` and polled again.
pub(crate) fn health_failure(
    runner_id: &str,
    error: IpcError,
    transient: fn(String, String) -> ExecutionError,
) -> ExecutionError {
    if error.is_fatal() {
        return ExecutionError::RunnerIncompatible {
            runner_id: runner_id.to_string(),
            reason: error.to_string(),
        };
    }
    if !error.is_retryable() {
        warn!("Runner {} answered health check with {}", runner_id, error);
    }
    transient(runner_id.to_string(), error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures_left: AtomicUsize,
        probes: AtomicUsize,
        incompatible: bool,
    }

    #[async_trait]
    impl Runner for Flaky {
        fn id(&self) -> &str {
            "flaky"
        }

        fn kind(&self) -> RunnerKind {
            RunnerKind::Process
        }

        async fn health(&self) -> Result<(), ExecutionError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left == 0 {
                return Ok(());
            }
            self.failures_left.store(left - 1, Ordering::SeqCst);
            if self.incompatible {
                return Err(ExecutionError::RunnerIncompatible {
                    runner_id: "flaky".to_string(),
                    reason: "protocol version mismatch".to_string(),
                });
            }
            Err(ExecutionError::RunnerFailure {
                runner_id: "flaky".to_string(),
                reason: "connection refused".to_string(),
            })
        }

        async fn invoke(&self, _request: &RunRequest) -> Result<ScriptOutcome, ExecutionError> {
            unreachable!()
        }

        async fn stop(&self) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_healthy() {
        let runner = Flaky {
            failures_left: AtomicUsize::new(3),
            probes: AtomicUsize::new(0),
            incompatible: false,
        };
        let result = wait_healthy(&runner, Duration::from_secs(10), Duration::from_secs(1)).await;

        assert!(result.is_ok());
        assert_eq!(runner.probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let runner = Flaky {
            failures_left: AtomicUsize::new(usize::MAX),
            probes: AtomicUsize::new(0),
            incompatible: false,
        };
        let started = Instant::now();
        let result = wait_healthy(&runner, Duration::from_secs(5), Duration::from_secs(1)).await;

        assert!(matches!(result, Err(ExecutionError::HealthTimeout { .. })));
        assert!(started.elapsed() >= Duration::from_secs(5));
        // One probe per second, bounded by the timeout
        assert!(runner.probes.load(Ordering::SeqCst) <= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incompatible_runner_stops_polling() {
        let runner = Flaky {
            failures_left: AtomicUsize::new(usize::MAX),
            probes: AtomicUsize::new(0),
            incompatible: true,
        };
        let started = Instant::now();
        let result = wait_healthy(&runner, Duration::from_secs(5), Duration::from_secs(1)).await;

        assert!(matches!(
            result,
            Err(ExecutionError::RunnerIncompatible { .. })
        ));
        assert_eq!(runner.probes.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_health_failure_mapping() {
        let transient: fn(String, String) -> ExecutionError =
            |runner_id, reason| ExecutionError::RunnerFailure { runner_id, reason };

        let refused = health_failure("r", IpcError::ConnectionClosed, transient);
        assert!(matches!(refused, ExecutionError::RunnerFailure { .. }));
        assert!(!refused.is_fatal());

        let mismatch = health_failure(
            "r",
            IpcError::ProtocolVersionMismatch {
                expected: 1,
                actual: 2,
            },
            transient,
        );
        assert!(matches!(
            mismatch,
            ExecutionError::RunnerIncompatible { ref runner_id, .. } if runner_id == "r"
        ));
    }
}
