//! Domain-specific configuration modules

pub mod logging;
pub mod runner;
pub mod serde_duration;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Runway configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunwayConfig {
    /// Runner lifecycle configuration
    pub runner: runner::RunnerConfig,

    /// Logging configuration
    pub logging: logging::LoggingConfig,
}

impl RunwayConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.runner.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = RunwayConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
