//! Tracing initialisation for Runway
//!
//! Everything in the workspace logs through the `tracing` facade. This crate
//! only decides where those events go: the orchestrator formats them per its
//! [`LoggingConfig`](runway_config::LoggingConfig), workers always write to
//! stderr so the parent can drain and re-emit them.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing, init_worker_tracing};
