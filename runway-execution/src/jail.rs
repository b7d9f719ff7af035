//! Jail command builder
//!
//! Produces the launch plan for a worker process. When the isolation utility
//! is installed the worker runs inside nsjail with a read-only filesystem
//! allow-list, an unprivileged user and a file descriptor cap. Otherwise the
//! worker is launched directly and the plan says so.

use runway_config::JailConfig;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Where the providers file appears inside the jail
pub const JAILED_PROVIDERS_PATH: &str = "/providers.yaml";

/// Where the worker directory appears inside the jail
pub const JAILED_WORKER_DIR: &str = "/jailed";

pub const PROVIDERS_PATH_ENV: &str = "RUNWAY_PROVIDERS_PATH";
pub const DB_HOST_ENV: &str = "RUNWAY_DB_HOST";

/// Whether a plan confines the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Jailed,
    Unconfined,
}

/// Checks whether the isolation utility can be used on this host
pub trait IsolationProbe: Send + Sync {
    fn is_available(&self, binary: &str) -> bool;
}

/// Looks the utility up on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl IsolationProbe for SystemProbe {
    fn is_available(&self, binary: &str) -> bool {
        std::process::Command::new("which")
            .arg(binary)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Fixed answer, for hosts where the outcome is known up front
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl IsolationProbe for StaticProbe {
    fn is_available(&self, _binary: &str) -> bool {
        self.0
    }
}

/// What a worker needs to be launched
#[derive(Debug, Clone)]
pub struct WorkerLaunch {
    pub worker_path: PathBuf,
    pub interpreter: Option<PathBuf>,
    pub providers_path: PathBuf,
    pub db_host: Option<String>,
    /// Host variables copied into a jailed worker, already resolved
    pub forwarded_env: Vec<(String, String)>,
}

/// Launch plan for one worker process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailPlan {
    command: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    isolation: Isolation,
}

impl JailPlan {
    pub fn command(&self) -> &Path {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    pub fn is_jailed(&self) -> bool {
        self.isolation == Isolation::Jailed
    }

    /// Command ready to spawn, stdio not yet configured
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (OsStr::new(k), OsStr::new(v))));
        cmd
    }
}

/// Builds [`JailPlan`]s from the jail configuration.
///
/// The host is probed once, when the builder is created; every plan it
/// builds afterwards takes the same path.
#[derive(Clone)]
pub struct JailCommandBuilder {
    config: JailConfig,
    isolation: Isolation,
    cwd: PathBuf,
}

impl JailCommandBuilder {
    pub fn new(config: JailConfig, probe: Arc<dyn IsolationProbe>) -> Self {
        let isolation = if config.enabled && probe.is_available(&config.binary) {
            Isolation::Jailed
        } else {
            warn!(
                "{} unavailable or disabled, workers will run unconfined",
                config.binary
            );
            Isolation::Unconfined
        };
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self {
            config,
            isolation,
            cwd,
        }
    }

    /// Path every plan from this builder takes
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Resolve relative paths against `cwd` instead of the process directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn build(&self, launch: &WorkerLaunch, port: u16, runner_id: &str) -> JailPlan {
        match self.isolation {
            Isolation::Jailed => self.jailed(launch, port, runner_id),
            Isolation::Unconfined => {
                debug!("Launching {} unconfined", runner_id);
                self.unconfined(launch, port, runner_id)
            }
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    fn jailed(&self, launch: &WorkerLaunch, port: u16, runner_id: &str) -> JailPlan {
        let worker_path = self.absolute(&launch.worker_path);
        let worker_dir = worker_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let worker_file = worker_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let providers_path = self.absolute(&launch.providers_path);

        let mut args: Vec<String> = vec![
            "-Mo".to_string(),
            "--quiet".to_string(),
            "--disable_proc".to_string(),
            "--disable_clone_newnet".to_string(),
            "--user".to_string(),
            self.config.user.to_string(),
            "--group".to_string(),
            self.config.group.to_string(),
        ];

        for mount in &self.config.read_only_mounts {
            if mount.exists() {
                args.push("-R".to_string());
                args.push(mount.display().to_string());
            }
        }

        args.push("-R".to_string());
        args.push(format!("{}:{}", providers_path.display(), JAILED_PROVIDERS_PATH));
        args.push("-R".to_string());
        args.push(format!("{}:{}", worker_dir.display(), JAILED_WORKER_DIR));

        if let Some(interpreter) = launch.interpreter.as_ref().filter(|p| p.is_absolute()) {
            args.push("-R".to_string());
            args.push(interpreter.display().to_string());
        }

        args.push("--rlimit_nofile".to_string());
        args.push(self.config.rlimit_nofile.to_string());

        args.push("--env".to_string());
        args.push("HOME=/".to_string());
        if let Some(db_host) = &launch.db_host {
            args.push("--env".to_string());
            args.push(format!("{}={}", DB_HOST_ENV, db_host));
        }
        for (name, value) in &launch.forwarded_env {
            args.push("--env".to_string());
            args.push(format!("{}={}", name, value));
        }

        args.push("--".to_string());
        if let Some(interpreter) = &launch.interpreter {
            args.push(interpreter.display().to_string());
        }
        args.push(format!("{}/{}", JAILED_WORKER_DIR, worker_file));
        args.push(port.to_string());
        args.push(runner_id.to_string());

        JailPlan {
            command: PathBuf::from(&self.config.binary),
            args,
            env: vec![(
                PROVIDERS_PATH_ENV.to_string(),
                JAILED_PROVIDERS_PATH.to_string(),
            )],
            isolation: Isolation::Jailed,
        }
    }

    fn unconfined(&self, launch: &WorkerLaunch, port: u16, runner_id: &str) -> JailPlan {
        let (command, mut args) = match &launch.interpreter {
            Some(interpreter) => (
                interpreter.clone(),
                vec![launch.worker_path.display().to_string()],
            ),
            None => (launch.worker_path.clone(), Vec::new()),
        };
        args.push(port.to_string());
        args.push(runner_id.to_string());

        let mut env = vec![(
            PROVIDERS_PATH_ENV.to_string(),
            self.absolute(&launch.providers_path).display().to_string(),
        )];
        if let Some(db_host) = &launch.db_host {
            env.push((DB_HOST_ENV.to_string(), db_host.clone()));
        }

        JailPlan {
            command,
            args,
            env,
            isolation: Isolation::Unconfined,
        }
    }
}
