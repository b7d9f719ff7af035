//! Remote runner adapter
//!
//! Remote runners are provisioned and retired by the platform; this adapter
//! only resolves the address derived from the runner id and talks to the
//! worker there. Stopping a remote runner releases nothing locally.

use async_trait::async_trait;
use runway_config::RemoteConfig;
use runway_ipc::{RunRequest, ScriptOutcome, WorkerClient};
use tracing::debug;

use crate::error::ExecutionError;
use crate::runner::{health_failure, Runner, RunnerHandle, RunnerKind, RunnerProvider};

/// Lowercase ASCII alphanumerics, every other run of characters becomes `-`
pub fn dns_slug(runner_id: &str) -> String {
    let mut slug = String::with_capacity(runner_id.len());
    for c in runner_id.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

pub struct RemoteRunner {
    id: String,
    client: WorkerClient,
}

impl RemoteRunner {
    pub fn address(&self) -> &str {
        self.client.address()
    }
}

#[async_trait]
impl Runner for RemoteRunner {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> RunnerKind {
        RunnerKind::Remote
    }

    async fn health(&self) -> Result<(), ExecutionError> {
        self.client
            .health()
            .await
            .map(|_| ())
            .map_err(|e| {
                health_failure(&self.id, e, |runner_id, reason| {
                    ExecutionError::RemoteUnavailable { runner_id, reason }
                })
            })
    }

    async fn invoke(&self, request: &RunRequest) -> Result<ScriptOutcome, ExecutionError> {
        self.client
            .run(request.clone())
            .await
            .map_err(|e| ExecutionError::ExecutionFailure {
                script_name: request.script_name.clone(),
                cause: e.to_string(),
            })
    }

    async fn stop(&self) -> Result<(), ExecutionError> {
        debug!("Releasing remote runner {}", self.id);
        Ok(())
    }
}

pub struct RemoteRunnerProvider {
    config: RemoteConfig,
}

impl RemoteRunnerProvider {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    pub fn address_for(&self, runner_id: &str) -> String {
        self.config
            .address_template
            .replace("{runner_id}", &dns_slug(runner_id))
    }

    /// Resolve the runner's address; fails when the runner is not provisioned
    pub async fn acquire(&self, runner_id: &str) -> Result<RemoteRunner, ExecutionError> {
        let address = self.address_for(runner_id);
        let unavailable = |reason: String| ExecutionError::RemoteUnavailable {
            runner_id: runner_id.to_string(),
            reason,
        };

        let resolved =
            tokio::time::timeout(self.config.connect_timeout, tokio::net::lookup_host(&address))
                .await
                .map_err(|_| unavailable(format!("resolving {} timed out", address)))?
                .map_err(|e| unavailable(format!("cannot resolve {}: {}", address, e)))?;

        if resolved.count() == 0 {
            return Err(unavailable(format!("{} resolved to no addresses", address)));
        }

        debug!("Acquired remote runner {} at {}", runner_id, address);
        Ok(RemoteRunner {
            id: runner_id.to_string(),
            client: WorkerClient::new(address, self.config.connect_timeout),
        })
    }
}

#[async_trait]
impl RunnerProvider for RemoteRunnerProvider {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Remote
    }

    async fn provide(&self, runner_id: &str) -> Result<RunnerHandle, ExecutionError> {
        Ok(Box::new(self.acquire(runner_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_dns_slug() {
        assert_eq!(dns_slug("sync-foo-1-github-conn_A"), "sync-foo-1-github-conn-a");
        assert_eq!(dns_slug("Sync Foo//2"), "sync-foo-2");
        assert_eq!(dns_slug("--x--"), "x");
    }

    #[test]
    fn test_address_from_template() {
        let provider = RemoteRunnerProvider::new(RemoteConfig::default());
        assert_eq!(
            provider.address_for("sync-foo-1-github-C1"),
            "sync-foo-1-github-c1:3000"
        );
    }

    #[tokio::test]
    async fn test_acquire_and_release_loopback_runner() {
        let provider = RemoteRunnerProvider::new(RemoteConfig {
            enabled: true,
            address_template: "localhost:1{runner_id}".to_string(),
            connect_timeout: Duration::from_secs(1),
        });

        let runner = provider.acquire("2345").await.unwrap();
        assert_eq!(runner.address(), "localhost:12345");
        assert_eq!(runner.kind(), RunnerKind::Remote);
        assert!(runner.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_unresolvable_address_is_unavailable() {
        let provider = RemoteRunnerProvider::new(RemoteConfig {
            enabled: true,
            address_template: "{runner_id}:notaport".to_string(),
            connect_timeout: Duration::from_secs(1),
        });

        let result = provider.acquire("sync-foo").await;
        assert!(matches!(result, Err(ExecutionError::RemoteUnavailable { .. })));
    }
}
