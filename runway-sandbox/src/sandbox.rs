//! Sandbox execution

use boa_engine::{Context as BoaContext, JsError, JsNativeError, Source};
use runway_ipc::{RunRequest, ScriptOutcome};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SandboxError;
use crate::harness::{self, HarnessState};

/// Resource limits applied to every interpreter context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub timeout: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Runs scripts in a fresh interpreter context per invocation
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Run a script on the blocking pool, bounded by the configured timeout.
    ///
    /// A timed-out script keeps its blocking thread until the loop iteration
    /// limit stops it; the caller gets its answer immediately.
    pub async fn run(&self, request: RunRequest) -> Result<ScriptOutcome, SandboxError> {
        let sandbox = self.clone();
        let timeout = self.limits.timeout;
        let task = tokio::task::spawn_blocking(move || sandbox.run_blocking(&request));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(SandboxError::TaskFailed(join_error.to_string())),
            Err(_) => Err(SandboxError::Timeout(timeout)),
        }
    }

    /// Run a script on the current thread
    pub fn run_blocking(&self, request: &RunRequest) -> Result<ScriptOutcome, SandboxError> {
        debug!(
            script_name = %request.script_name,
            is_action = request.is_action,
            "Running script in sandbox"
        );

        let mut context = BoaContext::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(self.limits.loop_iteration_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(self.limits.recursion_limit);

        let program = harness::program(request)?;
        context
            .eval(Source::from_bytes(&program))
            .map_err(engine_error)?;

        // Settle promises returned by async scripts
        context.run_jobs();

        let state = context
            .eval(Source::from_bytes(harness::STATE_EXPRESSION))
            .map_err(|e| SandboxError::Engine(e.to_string()))?;
        let state = state
            .to_string(&mut context)
            .map_err(|e| SandboxError::Engine(e.to_string()))?
            .to_std_string_escaped();
        let state: HarnessState = serde_json::from_str(&state)?;

        for line in &state.logs {
            info!(target: "runway::script", script_name = %request.script_name, "{}", line);
        }

        match state.outcome {
            Some(outcome) => Ok(outcome.into_outcome()?),
            None => Err(SandboxError::Unsettled),
        }
    }
}

/// Runtime limit errors cannot be caught by the script, so they surface here
fn engine_error(error: JsError) -> SandboxError {
    if error.as_native().is_some_and(JsNativeError::is_runtime_limit) {
        SandboxError::LimitExceeded(error.to_string())
    } else {
        SandboxError::Engine(error.to_string())
    }
}
