//! Execution requests

use runway_interfaces::TenantContext;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Where the script source comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptSource {
    /// Resolved through the script store, optionally at an explicit location
    Location(Option<String>),
    /// Source text supplied by the caller
    Inline(String),
}

/// A single request to run a script for a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub script_name: String,
    pub script_id: String,
    pub source: ScriptSource,
    pub tenant: TenantContext,
    pub is_action: bool,
    pub input: Option<JsonValue>,
    pub activity_log_id: Option<i64>,
    pub write_logs: bool,
}

impl ExecutionRequest {
    /// Request for a script resolved from the store at its default location
    pub fn new(
        script_name: impl Into<String>,
        script_id: impl Into<String>,
        tenant: TenantContext,
    ) -> Self {
        Self {
            script_name: script_name.into(),
            script_id: script_id.into(),
            source: ScriptSource::Location(None),
            tenant,
            is_action: false,
            input: None,
            activity_log_id: None,
            write_logs: false,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.source = ScriptSource::Location(Some(location.into()));
        self
    }

    pub fn with_inline_source(mut self, code: impl Into<String>) -> Self {
        self.source = ScriptSource::Inline(code.into());
        self
    }

    /// Mark as an action invoked with `input`
    pub fn action(mut self, input: JsonValue) -> Self {
        self.is_action = true;
        self.input = Some(input);
        self
    }

    /// Write failures to the given activity log
    pub fn with_activity_log(mut self, activity_log_id: i64) -> Self {
        self.activity_log_id = Some(activity_log_id);
        self.write_logs = true;
        self
    }

    /// Deterministic runner identity for this script and tenant
    pub fn runner_id(&self) -> String {
        runner_id(&self.script_name, &self.tenant)
    }
}

/// `{script_name}-{environment_id}-{provider_config_key}-{connection_id}`
pub fn runner_id(script_name: &str, tenant: &TenantContext) -> String {
    format!(
        "{}-{}-{}-{}",
        script_name, tenant.environment_id, tenant.provider_config_key, tenant.connection_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_runner_id_is_deterministic() {
        let tenant = TenantContext::new("conn-1", "github", 3, 9);
        let a = ExecutionRequest::new("sync-foo", "sync-1", tenant.clone());
        let b = ExecutionRequest::new("sync-foo", "sync-2", tenant);

        assert_eq!(a.runner_id(), "sync-foo-3-github-conn-1");
        assert_eq!(a.runner_id(), b.runner_id());
    }

    #[test]
    fn test_builders() {
        let tenant = TenantContext::new("conn-1", "github", 3, 9);
        let request = ExecutionRequest::new("create-issue", "action-1", tenant)
            .with_location("dist/create-issue")
            .action(json!({"title": "bug"}))
            .with_activity_log(42);

        assert!(request.is_action);
        assert!(request.write_logs);
        assert_eq!(request.activity_log_id, Some(42));
        assert_eq!(
            request.source,
            ScriptSource::Location(Some("dist/create-issue".to_string()))
        );
    }
}
