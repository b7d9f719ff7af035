//! Script execution service
//!
//! Entry point of the orchestration layer. `run_script` resolves the script,
//! keeps the caller's activity alive while it runs, obtains a runner, invokes
//! it and turns every outcome into an [`ExecutionResult`]. The runner is
//! stopped and the heartbeat entry removed on every path.

use parking_lot::Mutex;
use runway_config::RunnerConfig;
use runway_interfaces::{ActivityContext, ActivityLog, ActivityLogEntry, ScriptStore};
use runway_ipc::{RunRequest, ScriptOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, ExecutionError, ExecutionResult, ScriptError};
use crate::heartbeat::{HeartbeatRegistry, HeartbeatTicker};
use crate::request::{ExecutionRequest, ScriptSource};
use crate::runner::Runner;
use crate::selector::RunnerSelector;

pub struct ScriptExecutionService {
    store: Arc<dyn ScriptStore>,
    activity_log: Arc<dyn ActivityLog>,
    selector: RunnerSelector,
    heartbeats: Arc<HeartbeatRegistry>,
    ticker: Mutex<Option<HeartbeatTicker>>,
    invocation_timeout: Duration,
}

impl ScriptExecutionService {
    /// Create the service and start its heartbeat ticker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn ScriptStore>,
        activity_log: Arc<dyn ActivityLog>,
        selector: RunnerSelector,
        config: &RunnerConfig,
    ) -> Self {
        let heartbeats = Arc::new(HeartbeatRegistry::new());
        let ticker = heartbeats.start_ticker(config.heartbeat_interval);

        Self {
            store,
            activity_log,
            selector,
            heartbeats,
            ticker: Mutex::new(Some(ticker)),
            invocation_timeout: config.invocation_timeout,
        }
    }

    pub fn heartbeats(&self) -> &Arc<HeartbeatRegistry> {
        &self.heartbeats
    }

    /// Stop the heartbeat ticker; returns the number of scripts still in flight
    pub fn shutdown(&self) -> usize {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop();
        }
        let in_flight = self.heartbeats.len();
        if in_flight > 0 {
            warn!("Shutting down with {} scripts still running", in_flight);
        }
        in_flight
    }

    /// Run one script to completion
    pub async fn run_script(
        &self,
        request: &ExecutionRequest,
        activity: Option<Arc<dyn ActivityContext>>,
    ) -> ExecutionResult {
        let code = match self.resolve_source(request).await {
            Ok(code) => code,
            Err(e) => return self.fail(request, ScriptError::from(&e)).await,
        };

        let heartbeat = activity.map(|context| {
            self.heartbeats
                .register(request.script_id.clone(), context)
        });

        let result = self.run_with_runner(request, code).await;

        drop(heartbeat);

        match result {
            Ok(output) => {
                info!("Script {} completed", request.script_name);
                ExecutionResult::success(output)
            }
            Err(error) => self.fail(request, error).await,
        }
    }

    async fn resolve_source(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
        let location = match &request.source {
            ScriptSource::Inline(code) => return Ok(code.clone()),
            ScriptSource::Location(location) => location.as_deref(),
        };

        match self
            .store
            .get_script(&request.script_name, location, &request.tenant)
            .await
        {
            Ok(Some(code)) => Ok(code),
            Ok(None) => Err(ExecutionError::ScriptNotFound {
                script_name: request.script_name.clone(),
            }),
            Err(e) => Err(ExecutionError::ScriptLoadFailure {
                script_name: request.script_name.clone(),
                cause: e.to_string(),
            }),
        }
    }

    async fn run_with_runner(
        &self,
        request: &ExecutionRequest,
        code: String,
    ) -> Result<serde_json::Value, ScriptError> {
        let runner_id = request.runner_id();

        let runner: Arc<dyn Runner> = match self.selector.obtain(&runner_id, &request.tenant).await
        {
            Ok(runner) => Arc::from(runner),
            Err(e) => {
                error!("Failed to obtain runner {}: {}", runner_id, e);
                return Err(runner_failure(request, &e));
            }
        };

        debug!("Invoking {} runner {}", runner.kind(), runner_id);
        let run_request = RunRequest {
            tenant: request.tenant.clone(),
            script_name: request.script_name.clone(),
            code,
            input: request.input.clone(),
            is_action: request.is_action,
        };

        // A separate task keeps a panicking runner from skipping the stop below
        let task = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.invoke(&run_request).await }
        });
        let abort = task.abort_handle();

        let invoked = match tokio::time::timeout(self.invocation_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ExecutionError::ExecutionFailure {
                script_name: request.script_name.clone(),
                cause: join_error.to_string(),
            }),
            Err(_) => {
                abort.abort();
                Err(ExecutionError::ExecutionFailure {
                    script_name: request.script_name.clone(),
                    cause: format!("invocation timed out after {:?}", self.invocation_timeout),
                })
            }
        };

        if let Err(e) = runner.stop().await {
            warn!("Failed to stop runner {}: {}", runner_id, e);
        }

        let outcome = invoked.map_err(|e| runner_failure(request, &e))?;
        classify(request, outcome)
    }

    async fn fail(&self, request: &ExecutionRequest, error: ScriptError) -> ExecutionResult {
        warn!(
            "Script {} failed ({}): {}",
            request.script_name, error.kind, error.message
        );

        if request.write_logs {
            if let Some(activity_log_id) = request.activity_log_id {
                let entry = ActivityLogEntry::error(
                    request.tenant.environment_id,
                    activity_log_id,
                    error.message.clone(),
                );
                if let Err(e) = self.activity_log.append(entry).await {
                    warn!("Failed to write activity log {}: {}", activity_log_id, e);
                }
            }
        }

        ExecutionResult::failure(error)
    }
}

/// Substrate failures keep their kind but read the way execution failures do.
/// Errors a runner attributes to the script pass through unchanged.
fn runner_failure(request: &ExecutionRequest, err: &ExecutionError) -> ScriptError {
    match err {
        ExecutionError::ExecutionFailure { .. } => ScriptError::from(err),
        other if !other.is_infrastructure() => ScriptError::from(other),
        other => ScriptError {
            kind: other.kind(),
            message: ExecutionError::ExecutionFailure {
                script_name: request.script_name.clone(),
                cause: other.to_string(),
            }
            .to_string(),
            details: None,
        },
    }
}

fn classify(
    request: &ExecutionRequest,
    outcome: ScriptOutcome,
) -> Result<serde_json::Value, ScriptError> {
    let script_name = request.script_name.clone();
    let error = match outcome {
        ScriptOutcome::Completed { output } => return Ok(output),
        ScriptOutcome::Threw { message, details } => ExecutionError::ScriptFailure {
            kind: ErrorKind::script_failure(request.is_action),
            script_name,
            message,
            details,
        },
        ScriptOutcome::LoadFailed { message } => ExecutionError::ScriptLoadFailure {
            script_name,
            cause: message,
        },
        ScriptOutcome::MissingDefaultExport => ExecutionError::MissingDefaultExport { script_name },
    };
    Err(ScriptError::from(&error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use runway_interfaces::TenantContext;
    use serde_json::json;

    fn request(is_action: bool) -> ExecutionRequest {
        let mut request =
            ExecutionRequest::new("sync-foo", "sync-1", TenantContext::new("c1", "github", 1, 1));
        request.is_action = is_action;
        request
    }

    #[test]
    fn test_classify_thrown_by_call_kind() {
        let threw = || ScriptOutcome::Threw {
            message: "boom".to_string(),
            details: None,
        };

        let err = classify(&request(true), threw()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ActionScriptFailure);

        let err = classify(&request(false), threw()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyncScriptFailure);
        assert_eq!(err.message, "sync-foo failed with the following error: boom");
    }

    #[test]
    fn test_classify_completed_and_missing_export() {
        let output = classify(
            &request(false),
            ScriptOutcome::Completed {
                output: json!([1, 2]),
            },
        )
        .unwrap();
        assert_eq!(output, json!([1, 2]));

        let err = classify(&request(false), ScriptOutcome::MissingDefaultExport).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingDefaultExport);
    }

    #[test]
    fn test_substrate_failure_keeps_kind() {
        let err = runner_failure(
            &request(false),
            &ExecutionError::HealthTimeout {
                runner_id: "sync-foo-1-github-c1".to_string(),
                timeout: Duration::from_secs(10),
            },
        );
        assert_eq!(err.kind, ErrorKind::HealthTimeout);
        assert!(err
            .message
            .starts_with("There was an error running integration 'sync-foo': "));
    }

    #[test]
    fn test_script_attributed_failure_passes_through() {
        let err = runner_failure(
            &request(true),
            &ExecutionError::ScriptLoadFailure {
                script_name: "sync-foo".to_string(),
                cause: "Unexpected token".to_string(),
            },
        );
        assert_eq!(err.kind, ErrorKind::ScriptLoadFailure);
        assert_eq!(
            err.message,
            "The script failed to load for sync-foo with the following error: Unexpected token"
        );
    }
}
