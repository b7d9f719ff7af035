//! Local collaborators
//!
//! Implementations of the collaborator traits that need no external system:
//! scripts from a directory, activity logs and telemetry into tracing, and a
//! fixed set of feature flags. Used by the CLI and by tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use runway_interfaces::{
    ActivityLog, ActivityLogEntry, FeatureFlags, InterfaceResult, LogLevel, ScriptStore, Telemetry,
    TelemetryEvent, TenantContext,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Reads `<root>/<location or script_name>.js`
#[derive(Debug, Clone)]
pub struct LocalScriptStore {
    root: PathBuf,
}

impl LocalScriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, script_name: &str, location: Option<&str>) -> PathBuf {
        let relative = location.unwrap_or(script_name);
        let mut path = self.root.join(relative);
        if path.extension().is_none() {
            path.set_extension("js");
        }
        path
    }
}

#[async_trait]
impl ScriptStore for LocalScriptStore {
    async fn get_script(
        &self,
        script_name: &str,
        location: Option<&str>,
        _tenant: &TenantContext,
    ) -> InterfaceResult<Option<String>> {
        let path = self.path_for(script_name, location);
        match tokio::fs::read_to_string(&path).await {
            Ok(code) => Ok(Some(code)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No script at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes activity log entries as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn append(&self, entry: ActivityLogEntry) -> InterfaceResult<()> {
        match entry.level {
            LogLevel::Error => error!(
                activity_log_id = entry.activity_log_id,
                environment_id = entry.environment_id,
                "{}",
                entry.content
            ),
            LogLevel::Warn => warn!(
                activity_log_id = entry.activity_log_id,
                environment_id = entry.environment_id,
                "{}",
                entry.content
            ),
            _ => info!(
                activity_log_id = entry.activity_log_id,
                environment_id = entry.environment_id,
                "{}",
                entry.content
            ),
        }
        Ok(())
    }
}

/// Writes telemetry events as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

#[async_trait]
impl Telemetry for TracingTelemetry {
    async fn capture(&self, event: TelemetryEvent) {
        let mut attributes: Vec<_> = event.attributes.iter().collect();
        attributes.sort();
        info!(
            event_type = %event.event_type,
            category = %event.category,
            "{} {:?}",
            event.description,
            attributes
        );
    }
}

/// Flags set up front; anything unset falls back to the caller's default
#[derive(Debug, Default)]
pub struct StaticFeatureFlags {
    flags: RwLock<HashMap<String, bool>>,
}

impl StaticFeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(self, flag: impl Into<String>, enabled: bool) -> Self {
        self.set(flag, enabled);
        self
    }

    pub fn set(&self, flag: impl Into<String>, enabled: bool) {
        self.flags.write().insert(flag.into(), enabled);
    }
}

#[async_trait]
impl FeatureFlags for StaticFeatureFlags {
    async fn is_enabled(&self, flag: &str, _scope: &str, default: bool) -> bool {
        self.flags.read().get(flag).copied().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantContext {
        TenantContext::new("c1", "github", 1, 1)
    }

    #[tokio::test]
    async fn test_store_reads_by_name_and_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sync-foo.js"), "exports.default = 1;").unwrap();
        std::fs::create_dir(dir.path().join("dist")).unwrap();
        std::fs::write(dir.path().join("dist/other.js"), "exports.default = 2;").unwrap();

        let store = LocalScriptStore::new(dir.path());
        let code = store.get_script("sync-foo", None, &tenant()).await.unwrap();
        assert_eq!(code.as_deref(), Some("exports.default = 1;"));

        let code = store
            .get_script("sync-foo", Some("dist/other"), &tenant())
            .await
            .unwrap();
        assert_eq!(code.as_deref(), Some("exports.default = 2;"));
    }

    #[tokio::test]
    async fn test_store_missing_script_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalScriptStore::new(dir.path());
        assert_eq!(store.get_script("nope", None, &tenant()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_static_flags_fall_back_to_default() {
        let flags = StaticFeatureFlags::new().with_flag("runner-v1", true);
        assert!(flags.is_enabled("runner-v1", "1", false).await);
        assert!(!flags.is_enabled("other", "1", false).await);
        assert!(flags.is_enabled("other", "1", true).await);
    }
}
