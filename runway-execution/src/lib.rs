//! Script runner orchestration for Runway
//!
//! Decides which substrate runs an integration script (a jailed worker
//! process, the in-process sandbox or a managed remote runner), owns that
//! substrate for the duration of one invocation, and reports every outcome as
//! a structured [`ExecutionResult`] while keeping the caller's workflow
//! activity alive with heartbeats.

pub mod error;
pub mod heartbeat;
pub mod inprocess;
pub mod jail;
pub mod local;
pub mod process;
pub mod remote;
pub mod request;
pub mod runner;
pub mod selector;
pub mod service;
pub mod worker;

// Re-export main types
pub use error::{ErrorKind, ExecutionError, ExecutionResult, ScriptError};
pub use heartbeat::{HeartbeatGuard, HeartbeatRegistry, HeartbeatTicker};
pub use inprocess::{SandboxRunner, SandboxRunnerProvider};
pub use jail::{
    Isolation, IsolationProbe, JailCommandBuilder, JailPlan, StaticProbe, SystemProbe,
    WorkerLaunch,
};
pub use local::{LocalScriptStore, StaticFeatureFlags, TracingActivityLog, TracingTelemetry};
pub use process::{pick_port, ProcessRunner, ProcessRunnerProvider};
pub use remote::{dns_slug, RemoteRunner, RemoteRunnerProvider};
pub use request::{runner_id, ExecutionRequest, ScriptSource};
pub use runner::{wait_healthy, Runner, RunnerHandle, RunnerKind, RunnerProvider};
pub use selector::{IsolationFlag, RunnerSelector, REMOTE_FALLBACK_EVENT};
pub use service::ScriptExecutionService;
pub use worker::WorkerServer;
