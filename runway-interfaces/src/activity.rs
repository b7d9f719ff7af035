//! External workflow activity handle

use async_trait::async_trait;

/// An in-flight unit of work owned by the external workflow engine.
///
/// The orchestration layer never creates or retires these; it only signals
/// liveness while a script is running so the engine does not consider the
/// activity stalled.
#[async_trait]
pub trait ActivityContext: Send + Sync {
    /// Signal that the activity is still making progress
    async fn heartbeat(&self);
}
