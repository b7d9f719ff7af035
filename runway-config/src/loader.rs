//! Configuration loading and environment variable handling

use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::runner::RunnerConfig;
use crate::domains::RunwayConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "RUNWAY".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<RunwayConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: RunwayConfig = serde_yaml::from_str(&content)?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<RunwayConfig> {
        let mut config = RunwayConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<RunwayConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut RunwayConfig) -> ConfigResult<()> {
        self.apply_runner_overrides(&mut config.runner)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply runner config overrides
    fn apply_runner_overrides(&self, config: &mut RunnerConfig) -> ConfigResult<()> {
        if let Ok(path) = self.get_env_var("WORKER_PATH") {
            config.worker_path = PathBuf::from(path);
        }

        if let Ok(interpreter) = self.get_env_var("WORKER_INTERPRETER") {
            config.worker_interpreter = if interpreter.is_empty() {
                None
            } else {
                Some(PathBuf::from(interpreter))
            };
        }

        if let Ok(path) = self.get_env_var("PROVIDERS_PATH") {
            config.providers_path = PathBuf::from(path);
        }

        if let Ok(host) = self.get_env_var("DB_HOST") {
            config.db_host = Some(host);
        }

        if let Ok(remote) = self.get_env_var("REMOTE_RUNNERS") {
            config.remote.enabled = self.parse_bool("REMOTE_RUNNERS", &remote)?;
        }

        if let Ok(enabled) = self.get_env_var("JAIL_ENABLED") {
            config.jail.enabled = self.parse_bool("JAIL_ENABLED", &enabled)?;
        }

        if let Some(timeout) = self.get_duration("STARTUP_HEALTH_TIMEOUT")? {
            config.startup_health_timeout = timeout;
        }

        if let Some(timeout) = self.get_duration("ACQUISITION_HEALTH_TIMEOUT")? {
            config.acquisition_health_timeout = timeout;
        }

        if let Some(timeout) = self.get_duration("INVOCATION_TIMEOUT")? {
            config.invocation_timeout = timeout;
        }

        if let Some(interval) = self.get_duration("HEARTBEAT_INTERVAL")? {
            config.heartbeat_interval = interval;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Read a duration given in whole seconds
    fn get_duration(&self, name: &str) -> ConfigResult<Option<Duration>> {
        match self.get_env_var(name) {
            Ok(value) => {
                let seconds: u64 = value
                    .parse()
                    .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
                Ok(Some(Duration::from_secs(seconds)))
            }
            Err(_) => Ok(None),
        }
    }

    fn parse_bool(&self, name: &str, value: &str) -> ConfigResult<bool> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::EnvError(format!("Invalid {}: {}", name, value))),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
