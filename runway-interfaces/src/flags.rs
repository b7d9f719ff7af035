//! Feature flag evaluation

use async_trait::async_trait;

/// Evaluates feature flags for a scope (usually an environment id)
#[async_trait]
pub trait FeatureFlags: Send + Sync {
    /// Returns `default` when the flag cannot be evaluated
    async fn is_enabled(&self, flag: &str, scope: &str, default: bool) -> bool;
}
