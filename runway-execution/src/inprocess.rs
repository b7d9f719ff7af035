//! In-process sandbox runner
//!
//! Runs scripts in the restricted interpreter inside this process. No worker
//! is spawned, so there is nothing to probe and nothing to stop.

use async_trait::async_trait;
use runway_config::SandboxConfig;
use runway_ipc::{RunRequest, ScriptOutcome};
use runway_sandbox::{Sandbox, SandboxLimits};

use crate::error::ExecutionError;
use crate::runner::{Runner, RunnerHandle, RunnerKind, RunnerProvider};

pub struct SandboxRunner {
    id: String,
    sandbox: Sandbox,
}

impl SandboxRunner {
    pub fn new(runner_id: impl Into<String>, sandbox: Sandbox) -> Self {
        Self {
            id: runner_id.into(),
            sandbox,
        }
    }
}

#[async_trait]
impl Runner for SandboxRunner {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> RunnerKind {
        RunnerKind::InProcess
    }

    async fn health(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn invoke(&self, request: &RunRequest) -> Result<ScriptOutcome, ExecutionError> {
        self.sandbox
            .run(request.clone())
            .await
            .map_err(|e| ExecutionError::ExecutionFailure {
                script_name: request.script_name.clone(),
                cause: e.to_string(),
            })
    }

    async fn stop(&self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

pub struct SandboxRunnerProvider {
    sandbox: Sandbox,
}

impl SandboxRunnerProvider {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            sandbox: Sandbox::new(SandboxLimits {
                loop_iteration_limit: config.loop_iteration_limit,
                recursion_limit: config.recursion_limit,
                timeout: config.timeout,
            }),
        }
    }
}

#[async_trait]
impl RunnerProvider for SandboxRunnerProvider {
    fn kind(&self) -> RunnerKind {
        RunnerKind::InProcess
    }

    async fn provide(&self, runner_id: &str) -> Result<RunnerHandle, ExecutionError> {
        Ok(Box::new(SandboxRunner::new(runner_id, self.sandbox.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runway_interfaces::TenantContext;
    use serde_json::json;

    #[tokio::test]
    async fn test_runs_script_in_process() {
        let provider = SandboxRunnerProvider::new(&SandboxConfig::default());
        let runner = provider.provide("sync-foo-1-github-c1").await.unwrap();
        assert_eq!(runner.kind(), RunnerKind::InProcess);
        assert!(runner.health().await.is_ok());

        let request = RunRequest {
            tenant: TenantContext::new("c1", "github", 1, 1),
            script_name: "sync-foo".to_string(),
            code: "exports.default = function (ctx) { return ctx.providerConfigKey; };".to_string(),
            input: None,
            is_action: false,
        };
        let outcome = runner.invoke(&request).await.unwrap();
        assert_eq!(outcome, ScriptOutcome::Completed { output: json!("github") });
        assert!(runner.stop().await.is_ok());
    }
}
