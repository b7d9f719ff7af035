//! # Runway Interfaces
//!
//! Interfaces for the collaborators the script runner orchestration layer
//! talks to but does not own.
//!
//! The orchestration layer resolves script source, records activity log
//! entries, emits telemetry, evaluates feature flags and keeps workflow
//! activities alive. Each of those concerns is owned by another system, so
//! this crate only describes the boundary:
//!
//! - [`ScriptStore`] - file retrieval for script source (local disk or blob storage)
//! - [`ActivityLog`] - persisted, user-visible activity log entries
//! - [`Telemetry`] - infrastructure events such as remote runner fallbacks
//! - [`FeatureFlags`] - per-scope flag evaluation
//! - [`ActivityContext`] - liveness signal for an external workflow activity
//!
//! [`TenantContext`] is the tenant identity shared by all of them and passed
//! through to the script itself.

pub mod activity;
pub mod error;
pub mod flags;
pub mod logging;
pub mod store;
pub mod telemetry;
pub mod tenant;

pub use activity::ActivityContext;
pub use error::{InterfaceError, InterfaceResult};
pub use flags::FeatureFlags;
pub use logging::{ActivityLog, ActivityLogEntry, LogLevel, LogLevelParseError};
pub use store::ScriptStore;
pub use telemetry::{Telemetry, TelemetryEvent};
pub use tenant::TenantContext;
