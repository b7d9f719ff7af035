//! Script source retrieval

use async_trait::async_trait;

use crate::error::InterfaceResult;
use crate::tenant::TenantContext;

/// Resolves the source text of a script.
///
/// Implementations decide whether the source comes from local disk or from
/// remote blob storage; the orchestration layer never sees the difference.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Fetch the source for `script_name`.
    ///
    /// `location` is an explicit load location when the caller has one
    /// (a blob key or a directory override). `Ok(None)` means the script does
    /// not exist; `Err` means the store itself failed.
    async fn get_script(
        &self,
        script_name: &str,
        location: Option<&str>,
        tenant: &TenantContext,
    ) -> InterfaceResult<Option<String>>;
}
