//! Runner lifecycle configuration
//!
//! Covers everything the orchestration layer needs to launch, probe and
//! retire script runners: the worker executable, the jail wrapped around it,
//! the remote runner fleet, the in-process sandbox and the timeouts between
//! them.

use crate::domains::serde_duration;
use crate::error::ConfigResult;
use crate::validation::{
    validate_port, validate_positive, validate_required_path, validate_required_string,
    Validatable,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Script worker executable (or script, when `worker_interpreter` is set)
    pub worker_path: PathBuf,

    /// Interpreter used to launch `worker_path`
    pub worker_interpreter: Option<PathBuf>,

    /// Providers data file made available to workers
    pub providers_path: PathBuf,

    /// Database host forwarded into workers
    pub db_host: Option<String>,

    /// Additional host environment variables copied into jailed workers
    pub forwarded_env: Vec<String>,

    /// Ports that locally spawned workers may listen on
    pub port_range: PortRange,

    /// How long a freshly spawned worker has to answer a health probe
    #[serde(with = "serde_duration")]
    pub startup_health_timeout: Duration,

    /// How long an acquired remote runner has to answer a health probe
    #[serde(with = "serde_duration")]
    pub acquisition_health_timeout: Duration,

    /// Delay between health probes
    #[serde(with = "serde_duration")]
    pub health_poll_interval: Duration,

    /// Upper bound on a single script invocation
    #[serde(with = "serde_duration")]
    pub invocation_timeout: Duration,

    /// Interval between activity heartbeats
    #[serde(with = "serde_duration")]
    pub heartbeat_interval: Duration,

    /// Feature flag selecting worker processes over the in-process sandbox
    pub process_isolation_flag: String,

    /// Value used when the flag has not been set for an environment
    pub process_isolation_default: bool,

    pub jail: JailConfig,

    pub remote: RemoteConfig,

    pub sandbox: SandboxConfig,
}

/// Inclusive-exclusive port range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port < self.end
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 11000,
            end: 12000,
        }
    }
}

/// Process jail (nsjail) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JailConfig {
    /// Attempt to jail workers when the isolation utility is installed
    pub enabled: bool,

    /// Isolation utility looked up on `PATH`
    pub binary: String,

    /// Unprivileged user the worker runs as
    pub user: u32,

    /// Unprivileged group the worker runs as
    pub group: u32,

    /// Maximum number of open file descriptors
    pub rlimit_nofile: u64,

    /// Host paths mounted read-only when they exist
    pub read_only_mounts: Vec<PathBuf>,
}

impl Default for JailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "nsjail".to_string(),
            user: 1,
            group: 1,
            rlimit_nofile: 1000,
            read_only_mounts: vec![
                PathBuf::from("/lib"),
                PathBuf::from("/lib64"),
                PathBuf::from("/usr/lib"),
                PathBuf::from("/etc/resolv.conf"),
            ],
        }
    }
}

/// Managed remote runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Prefer pre-provisioned remote runners over local workers
    pub enabled: bool,

    /// Runner address, `{runner_id}` is replaced with a DNS-safe runner id
    pub address_template: String,

    /// Connection timeout for each request to a remote runner
    #[serde(with = "serde_duration")]
    pub connect_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address_template: "{runner_id}:3000".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// In-process sandbox limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub loop_iteration_limit: u64,

    pub recursion_limit: usize,

    /// Wall-clock limit for one in-process script run
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            timeout: Duration::from_secs(3600),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            worker_path: PathBuf::from("runway-worker"),
            worker_interpreter: None,
            providers_path: PathBuf::from("providers.yaml"),
            db_host: None,
            forwarded_env: Vec::new(),
            port_range: PortRange::default(),
            startup_health_timeout: Duration::from_secs(10),
            acquisition_health_timeout: Duration::from_secs(5),
            health_poll_interval: Duration::from_secs(1),
            invocation_timeout: Duration::from_secs(24 * 60 * 60),
            heartbeat_interval: Duration::from_secs(300),
            process_isolation_flag: "runner-v1".to_string(),
            process_isolation_default: false,
            jail: JailConfig::default(),
            remote: RemoteConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Validatable for RunnerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_path(&self.worker_path, "worker_path", self.domain_name())?;
        validate_required_path(&self.providers_path, "providers_path", self.domain_name())?;
        validate_required_string(
            &self.process_isolation_flag,
            "process_isolation_flag",
            self.domain_name(),
        )?;

        validate_port(self.port_range.start, "port_range.start", self.domain_name())?;
        if self.port_range.start >= self.port_range.end {
            return Err(self.validation_error(format!(
                "port_range.start ({}) must be lower than port_range.end ({})",
                self.port_range.start, self.port_range.end
            )));
        }

        validate_positive(
            self.startup_health_timeout.as_secs(),
            "startup_health_timeout",
            self.domain_name(),
        )?;
        validate_positive(
            self.acquisition_health_timeout.as_secs(),
            "acquisition_health_timeout",
            self.domain_name(),
        )?;
        validate_positive(
            self.health_poll_interval.as_secs(),
            "health_poll_interval",
            self.domain_name(),
        )?;
        validate_positive(
            self.invocation_timeout.as_secs(),
            "invocation_timeout",
            self.domain_name(),
        )?;
        validate_positive(
            self.heartbeat_interval.as_secs(),
            "heartbeat_interval",
            self.domain_name(),
        )?;

        self.jail.validate()?;
        self.remote.validate()?;
        self.sandbox.validate()?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runner"
    }
}

impl Validatable for JailConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.binary, "binary", self.domain_name())?;
        validate_positive(self.rlimit_nofile, "rlimit_nofile", self.domain_name())?;

        if self.user == 0 || self.group == 0 {
            return Err(self.validation_error("jailed workers must not run as root"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runner.jail"
    }
}

impl Validatable for RemoteConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.address_template, "address_template", self.domain_name())?;
        if !self.address_template.contains("{runner_id}") {
            return Err(self.validation_error("address_template must contain {runner_id}"));
        }
        validate_positive(
            self.connect_timeout.as_secs(),
            "connect_timeout",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runner.remote"
    }
}

impl Validatable for SandboxConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.loop_iteration_limit,
            "loop_iteration_limit",
            self.domain_name(),
        )?;
        validate_positive(self.recursion_limit, "recursion_limit", self.domain_name())?;
        validate_positive(self.timeout.as_secs(), "timeout", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runner.sandbox"
    }
}
