//! Domain-driven configuration management for Runway
//!
//! Configuration is split by functional domain (runner lifecycle, jail,
//! remote runners, in-process sandbox, logging). Every field has a default,
//! durations are expressed in seconds, and `RUNWAY_*` environment variables
//! override file values.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    runner::{JailConfig, PortRange, RemoteConfig, RunnerConfig, SandboxConfig},
    RunwayConfig,
};

// Re-export utilities
pub use domains::serde_duration;
