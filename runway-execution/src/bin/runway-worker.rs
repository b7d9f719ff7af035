//! Script worker launched by the process runner: `runway-worker <port> <runner_id>`

use anyhow::{Context, Result};
use clap::Parser;
use runway_config::ConfigLoader;
use runway_execution::WorkerServer;
use runway_logging::init_worker_tracing;
use runway_sandbox::{Sandbox, SandboxLimits};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "runway-worker")]
#[command(about = "Runs integration scripts for a single runner")]
#[command(version)]
struct Cli {
    /// Loopback port to listen on
    port: u16,

    /// Identity of the runner this worker serves
    runner_id: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUNWAY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_worker_tracing(cli.log_level.as_deref())?;

    let config = ConfigLoader::new()
        .from_env()
        .context("Failed to load worker configuration")?;
    let sandbox = Sandbox::new(SandboxLimits {
        loop_iteration_limit: config.runner.sandbox.loop_iteration_limit,
        recursion_limit: config.runner.sandbox.recursion_limit,
        timeout: config.runner.sandbox.timeout,
    });

    let listener = TcpListener::bind(("127.0.0.1", cli.port))
        .await
        .with_context(|| format!("Failed to bind 127.0.0.1:{}", cli.port))?;

    info!("Starting worker {}", cli.runner_id);
    let server = Arc::new(WorkerServer::new(cli.runner_id, sandbox));
    server.serve(listener).await.context("Worker server failed")?;

    Ok(())
}
