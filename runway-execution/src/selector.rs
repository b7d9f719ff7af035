//! Runner selection and fallback
//!
//! Remote runners are preferred when configured. A remote runner that cannot
//! be acquired or does not answer its health probe is reported once to
//! telemetry and replaced by a local worker process. Without remote runners
//! the `process_isolation_flag` feature flag chooses between worker processes
//! and the in-process sandbox.

use runway_config::RunnerConfig;
use runway_interfaces::{FeatureFlags, Telemetry, TelemetryEvent, TenantContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ExecutionError;
use crate::inprocess::SandboxRunnerProvider;
use crate::jail::{IsolationProbe, JailCommandBuilder};
use crate::process::ProcessRunnerProvider;
use crate::remote::RemoteRunnerProvider;
use crate::runner::{wait_healthy, RunnerHandle, RunnerProvider};

pub const REMOTE_FALLBACK_EVENT: &str = "remote_runner_failure_resolved_back_to_local";
pub const REMOTE_FALLBACK_DESCRIPTION: &str = "Remote runner cannot be accessed";
pub const INFRASTRUCTURE_CATEGORY: &str = "infrastructure";

/// Feature flag gating worker processes and its default
#[derive(Debug, Clone)]
pub struct IsolationFlag {
    pub name: String,
    pub default: bool,
}

pub struct RunnerSelector {
    remote: Option<Arc<dyn RunnerProvider>>,
    process: Arc<dyn RunnerProvider>,
    in_process: Arc<dyn RunnerProvider>,
    flags: Arc<dyn FeatureFlags>,
    telemetry: Arc<dyn Telemetry>,
    isolation_flag: IsolationFlag,
    acquisition_health_timeout: Duration,
    health_poll_interval: Duration,
}

impl RunnerSelector {
    pub fn new(
        process: Arc<dyn RunnerProvider>,
        in_process: Arc<dyn RunnerProvider>,
        flags: Arc<dyn FeatureFlags>,
        telemetry: Arc<dyn Telemetry>,
        isolation_flag: IsolationFlag,
    ) -> Self {
        Self {
            remote: None,
            process,
            in_process,
            flags,
            telemetry,
            isolation_flag,
            acquisition_health_timeout: Duration::from_secs(5),
            health_poll_interval: Duration::from_secs(1),
        }
    }

    /// Prefer `remote` runners, falling back to local processes
    pub fn with_remote(mut self, remote: Arc<dyn RunnerProvider>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_health_check(mut self, timeout: Duration, interval: Duration) -> Self {
        self.acquisition_health_timeout = timeout;
        self.health_poll_interval = interval;
        self
    }

    /// Obtain a healthy runner for `runner_id`
    pub async fn obtain(
        &self,
        runner_id: &str,
        tenant: &TenantContext,
    ) -> Result<RunnerHandle, ExecutionError> {
        if let Some(remote) = &self.remote {
            match self.obtain_remote(remote.as_ref(), runner_id).await {
                Ok(runner) => return Ok(runner),
                Err(e) => {
                    warn!(
                        "Remote runner {} unavailable, falling back to a local worker: {}",
                        runner_id, e
                    );
                    self.telemetry
                        .capture(
                            TelemetryEvent::new(
                                REMOTE_FALLBACK_EVENT,
                                REMOTE_FALLBACK_DESCRIPTION,
                                INFRASTRUCTURE_CATEGORY,
                            )
                            .with_attribute("runner_id", runner_id)
                            .with_attribute("error", e.to_string()),
                        )
                        .await;
                    return self.process.provide(runner_id).await;
                }
            }
        }

        let use_process = self
            .flags
            .is_enabled(
                &self.isolation_flag.name,
                &tenant.flag_scope(),
                self.isolation_flag.default,
            )
            .await;

        let provider = if use_process {
            &self.process
        } else {
            &self.in_process
        };
        debug!("Obtaining {} runner for {}", provider.kind(), runner_id);
        provider.provide(runner_id).await
    }

    async fn obtain_remote(
        &self,
        remote: &dyn RunnerProvider,
        runner_id: &str,
    ) -> Result<RunnerHandle, ExecutionError> {
        let runner = remote.provide(runner_id).await?;
        if let Err(e) = wait_healthy(
            runner.as_ref(),
            self.acquisition_health_timeout,
            self.health_poll_interval,
        )
        .await
        {
            if let Err(stop_err) = runner.stop().await {
                debug!("Failed to release remote runner {}: {}", runner_id, stop_err);
            }
            return Err(e);
        }
        Ok(runner)
    }
}

impl RunnerSelector {
    /// Wire the standard providers from configuration
    pub fn from_config(
        config: &RunnerConfig,
        probe: Arc<dyn IsolationProbe>,
        flags: Arc<dyn FeatureFlags>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let builder = JailCommandBuilder::new(config.jail.clone(), probe);
        let process = Arc::new(ProcessRunnerProvider::new(config.clone(), builder));
        let in_process = Arc::new(SandboxRunnerProvider::new(&config.sandbox));

        let selector = RunnerSelector::new(
            process,
            in_process,
            flags,
            telemetry,
            IsolationFlag {
                name: config.process_isolation_flag.clone(),
                default: config.process_isolation_default,
            },
        )
        .with_health_check(config.acquisition_health_timeout, config.health_poll_interval);

        if config.remote.enabled {
            selector.with_remote(Arc::new(RemoteRunnerProvider::new(config.remote.clone())))
        } else {
            selector
        }
    }
}
