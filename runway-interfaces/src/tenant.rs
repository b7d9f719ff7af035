//! Tenant identity carried by every script execution

use serde::{Deserialize, Serialize};

/// Identifies the tenant a script runs for.
///
/// The same value is handed to the script as part of its runtime context,
/// so it is serialised with camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub connection_id: String,
    pub provider_config_key: String,
    pub environment_id: i64,
    pub account_id: i64,
}

impl TenantContext {
    pub fn new(
        connection_id: impl Into<String>,
        provider_config_key: impl Into<String>,
        environment_id: i64,
        account_id: i64,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            provider_config_key: provider_config_key.into(),
            environment_id,
            account_id,
        }
    }

    /// Scope used when evaluating per-environment feature flags
    pub fn flag_scope(&self) -> String {
        self.environment_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_serializes_camel_case() {
        let tenant = TenantContext::new("conn-1", "github", 7, 3);
        let json = serde_json::to_value(&tenant).unwrap();

        assert_eq!(json["connectionId"], "conn-1");
        assert_eq!(json["providerConfigKey"], "github");
        assert_eq!(json["environmentId"], 7);
        assert_eq!(json["accountId"], 3);
    }

    #[test]
    fn test_flag_scope_is_environment() {
        let tenant = TenantContext::new("c", "p", 42, 1);
        assert_eq!(tenant.flag_scope(), "42");
    }
}
