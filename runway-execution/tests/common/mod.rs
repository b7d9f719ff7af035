//! Hand-written fakes for the collaborator and runner traits
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use runway_config::RunnerConfig;
use runway_execution::{
    ExecutionError, ExecutionRequest, IsolationFlag, Runner, RunnerHandle, RunnerKind,
    RunnerProvider, RunnerSelector, ScriptExecutionService, StaticFeatureFlags,
};
use runway_interfaces::{
    ActivityContext, ActivityLog, ActivityLogEntry, InterfaceError, InterfaceResult, ScriptStore,
    Telemetry, TelemetryEvent, TenantContext,
};
use runway_ipc::{RunRequest, ScriptOutcome};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub const SYNC_SOURCE: &str = "exports.default = function (ctx) { return 1; };";

pub fn tenant() -> TenantContext {
    TenantContext::new("conn-1", "github", 7, 3)
}

pub fn request(script_name: &str, script_id: &str) -> ExecutionRequest {
    ExecutionRequest::new(script_name, script_id, tenant())
}

/// What a fake runner does when invoked
#[derive(Clone)]
pub enum Behavior {
    Outcome(ScriptOutcome),
    TransportError,
    Fails(ExecutionError),
    Panic,
    /// Wait for the gate to open, then complete with the script name
    Hold(Gate),
}

impl Behavior {
    pub fn completes(output: JsonValue) -> Self {
        Behavior::Outcome(ScriptOutcome::Completed { output })
    }

    pub fn throws(message: &str) -> Self {
        Behavior::Outcome(ScriptOutcome::Threw {
            message: message.to_string(),
            details: Some(json!({"name": "Error"})),
        })
    }
}

#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<AtomicUsize>,
    open: watch::Sender<bool>,
}

impl Gate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self {
            entered: Arc::new(AtomicUsize::new(0)),
            open,
        }
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.open.subscribe();
        self.entered.fetch_add(1, Ordering::SeqCst);
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Default)]
pub struct Counters {
    pub provided: AtomicUsize,
    pub health_checks: AtomicUsize,
    pub invoked: AtomicUsize,
    pub stopped: AtomicUsize,
}

impl Counters {
    pub fn provided(&self) -> usize {
        self.provided.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn invoked(&self) -> usize {
        self.invoked.load(Ordering::SeqCst)
    }

    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }
}

pub struct FakeRunner {
    id: String,
    kind: RunnerKind,
    behavior: Behavior,
    healthy: bool,
    stop_fails: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl Runner for FakeRunner {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> RunnerKind {
        self.kind
    }

    async fn health(&self) -> Result<(), ExecutionError> {
        self.counters.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(())
        } else {
            Err(ExecutionError::RunnerFailure {
                runner_id: self.id.clone(),
                reason: "connection refused".to_string(),
            })
        }
    }

    async fn invoke(&self, request: &RunRequest) -> Result<ScriptOutcome, ExecutionError> {
        self.counters.invoked.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Outcome(outcome) => Ok(outcome.clone()),
            Behavior::TransportError => Err(ExecutionError::ExecutionFailure {
                script_name: request.script_name.clone(),
                cause: "Connection closed".to_string(),
            }),
            Behavior::Fails(error) => Err(error.clone()),
            Behavior::Panic => panic!("runner crashed"),
            Behavior::Hold(gate) => {
                gate.pass().await;
                Ok(ScriptOutcome::Completed {
                    output: json!(request.script_name),
                })
            }
        }
    }

    async fn stop(&self) -> Result<(), ExecutionError> {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        if self.stop_fails {
            Err(ExecutionError::RunnerFailure {
                runner_id: self.id.clone(),
                reason: "kill failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

pub struct FakeProvider {
    pub kind: RunnerKind,
    pub behavior: Behavior,
    pub provide_error: Option<ExecutionError>,
    pub healthy: bool,
    pub stop_fails: bool,
    pub counters: Arc<Counters>,
}

impl FakeProvider {
    pub fn new(kind: RunnerKind, behavior: Behavior) -> Self {
        Self {
            kind,
            behavior,
            provide_error: None,
            healthy: true,
            stop_fails: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn failing(kind: RunnerKind, error: ExecutionError) -> Self {
        let mut provider = Self::new(kind, Behavior::completes(JsonValue::Null));
        provider.provide_error = Some(error);
        provider
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn with_failing_stop(mut self) -> Self {
        self.stop_fails = true;
        self
    }
}

#[async_trait]
impl RunnerProvider for FakeProvider {
    fn kind(&self) -> RunnerKind {
        self.kind
    }

    async fn provide(&self, runner_id: &str) -> Result<RunnerHandle, ExecutionError> {
        if let Some(error) = &self.provide_error {
            return Err(error.clone());
        }
        self.counters.provided.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRunner {
            id: runner_id.to_string(),
            kind: self.kind,
            behavior: self.behavior.clone(),
            healthy: self.healthy,
            stop_fails: self.stop_fails,
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub events: Mutex<Vec<TelemetryEvent>>,
}

#[async_trait]
impl Telemetry for RecordingTelemetry {
    async fn capture(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

#[derive(Default)]
pub struct RecordingActivityLog {
    pub entries: Mutex<Vec<ActivityLogEntry>>,
}

impl RecordingActivityLog {
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl ActivityLog for RecordingActivityLog {
    async fn append(&self, entry: ActivityLogEntry) -> InterfaceResult<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    scripts: HashMap<String, String>,
    pub lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn with_script(mut self, name: &str, code: &str) -> Self {
        self.scripts.insert(name.to_string(), code.to_string());
        self
    }
}

#[async_trait]
impl ScriptStore for MemoryStore {
    async fn get_script(
        &self,
        script_name: &str,
        location: Option<&str>,
        _tenant: &TenantContext,
    ) -> InterfaceResult<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.scripts.get(location.unwrap_or(script_name)).cloned())
    }
}

/// Store whose backend is down
pub struct BrokenStore;

#[async_trait]
impl ScriptStore for BrokenStore {
    async fn get_script(
        &self,
        _script_name: &str,
        _location: Option<&str>,
        _tenant: &TenantContext,
    ) -> InterfaceResult<Option<String>> {
        Err(InterfaceError::Connection("blob storage unreachable".to_string()))
    }
}

#[derive(Default)]
pub struct CountingContext {
    pub beats: AtomicUsize,
}

#[async_trait]
impl ActivityContext for CountingContext {
    async fn heartbeat(&self) {
        self.beats.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn isolation_flag() -> IsolationFlag {
    IsolationFlag {
        name: "runner-v1".to_string(),
        default: false,
    }
}

/// Service whose runners all come from `provider`
pub struct Harness {
    pub service: ScriptExecutionService,
    pub log: Arc<RecordingActivityLog>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub counters: Arc<Counters>,
}

impl Harness {
    pub fn new(store: Arc<dyn ScriptStore>, provider: FakeProvider) -> Self {
        Self::with_config(store, provider, RunnerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn ScriptStore>,
        provider: FakeProvider,
        config: RunnerConfig,
    ) -> Self {
        let counters = Arc::clone(&provider.counters);
        let provider: Arc<dyn RunnerProvider> = Arc::new(provider);
        let log = Arc::new(RecordingActivityLog::default());
        let telemetry = Arc::new(RecordingTelemetry::default());

        let selector = RunnerSelector::new(
            Arc::clone(&provider),
            provider,
            Arc::new(StaticFeatureFlags::new()),
            telemetry.clone(),
            isolation_flag(),
        );
        let service = ScriptExecutionService::new(store, log.clone(), selector, &config);

        Self {
            service,
            log,
            telemetry,
            counters,
        }
    }
}
