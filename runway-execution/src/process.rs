//! Process runner
//!
//! Spawns one worker process per runner, drains its diagnostic output into
//! tracing and talks to it over a loopback connection. Stopping a process
//! runner kills the worker outright.

use async_trait::async_trait;
use rand::Rng;
use runway_config::{PortRange, RunnerConfig};
use runway_ipc::{RunRequest, ScriptOutcome, WorkerClient};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ExecutionError;
use crate::jail::{Isolation, JailCommandBuilder, JailPlan, WorkerLaunch};
use crate::runner::{
    health_failure, wait_healthy, Runner, RunnerHandle, RunnerKind, RunnerProvider,
};

const PORT_ATTEMPTS: usize = 32;

/// Pick a random port in `range`, preferring one that is free on loopback
pub fn pick_port(range: PortRange) -> u16 {
    let mut rng = rand::thread_rng();
    for _ in 0..PORT_ATTEMPTS {
        let port = rng.gen_range(range.start..range.end);
        if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return port;
        }
    }
    rng.gen_range(range.start..range.end)
}

/// A worker process owned by one script execution
pub struct ProcessRunner {
    id: String,
    port: u16,
    isolation: Isolation,
    pid: Option<u32>,
    client: WorkerClient,
    child: Mutex<Option<Child>>,
}

impl ProcessRunner {
    /// Launch the worker described by `plan`
    pub fn start(
        runner_id: &str,
        plan: &JailPlan,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ExecutionError> {
        if plan.isolation() == Isolation::Unconfined {
            warn!(
                "Runner {} is starting without process isolation; the isolation utility is unavailable or disabled",
                runner_id
            );
        }

        debug!(
            "Spawning runner {}: {} {}",
            runner_id,
            plan.command().display(),
            plan.args().join(" ")
        );

        let mut cmd = plan.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ExecutionError::SpawnFailure {
            runner_id: runner_id.to_string(),
            reason: format!("Failed to spawn {}: {}", plan.command().display(), e),
        })?;

        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_output(runner_id.to_string(), stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_output(runner_id.to_string(), stderr, true));
        }

        info!(
            "Started runner {} (pid {:?}) on port {}",
            runner_id, pid, port
        );

        Ok(Self {
            id: runner_id.to_string(),
            port,
            isolation: plan.isolation(),
            pid,
            client: WorkerClient::loopback(port, connect_timeout),
            child: Mutex::new(Some(child)),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }
}

/// Forward every line the worker writes to tracing
async fn drain_output<R>(runner_id: String, stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if is_stderr {
                    warn!(runner_id = %runner_id, "{}", line);
                } else {
                    info!(runner_id = %runner_id, "{}", line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Output of runner {} closed: {}", runner_id, e);
                break;
            }
        }
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> RunnerKind {
        RunnerKind::Process
    }

    async fn health(&self) -> Result<(), ExecutionError> {
        self.client
            .health()
            .await
            .map(|_| ())
            .map_err(|e| {
                health_failure(&self.id, e, |runner_id, reason| {
                    ExecutionError::RunnerFailure { runner_id, reason }
                })
            })
    }

    async fn invoke(&self, request: &RunRequest) -> Result<ScriptOutcome, ExecutionError> {
        self.client
            .run(request.clone())
            .await
            .map_err(|e| ExecutionError::ExecutionFailure {
                script_name: request.script_name.clone(),
                cause: e.to_string(),
            })
    }

    async fn stop(&self) -> Result<(), ExecutionError> {
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            debug!("Killing runner {}", self.id);
            child.kill().await.map_err(|e| ExecutionError::RunnerFailure {
                runner_id: self.id.clone(),
                reason: format!("Failed to kill worker process: {}", e),
            })?;
        }
        Ok(())
    }
}

/// Starts a jailed (or unconfined) worker process and waits for it to answer
pub struct ProcessRunnerProvider {
    config: RunnerConfig,
    builder: JailCommandBuilder,
}

impl ProcessRunnerProvider {
    pub fn new(config: RunnerConfig, builder: JailCommandBuilder) -> Self {
        Self { config, builder }
    }

    fn launch(&self) -> WorkerLaunch {
        let forwarded_env = self
            .config
            .forwarded_env
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name.clone(), value)))
            .collect();

        WorkerLaunch {
            worker_path: self.config.worker_path.clone(),
            interpreter: self.config.worker_interpreter.clone(),
            providers_path: self.config.providers_path.clone(),
            db_host: self.config.db_host.clone(),
            forwarded_env,
        }
    }
}

#[async_trait]
impl RunnerProvider for ProcessRunnerProvider {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Process
    }

    async fn provide(&self, runner_id: &str) -> Result<RunnerHandle, ExecutionError> {
        let port = pick_port(self.config.port_range);
        let plan = self.builder.build(&self.launch(), port, runner_id);
        let runner = ProcessRunner::start(
            runner_id,
            &plan,
            port,
            self.config.health_poll_interval,
        )?;

        if let Err(e) = wait_healthy(
            &runner,
            self.config.startup_health_timeout,
            self.config.health_poll_interval,
        )
        .await
        {
            if let Err(stop_err) = runner.stop().await {
                warn!("Failed to stop unhealthy runner {}: {}", runner_id, stop_err);
            }
            return Err(e);
        }

        Ok(Box::new(runner))
    }
}
