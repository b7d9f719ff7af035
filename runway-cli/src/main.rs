use anyhow::{Context, Result};
use clap::Parser;
use runway_config::{ConfigLoader, LogLevel, RunwayConfig};
use runway_execution::{
    ExecutionRequest, LocalScriptStore, RunnerSelector, ScriptExecutionService,
    StaticFeatureFlags, SystemProbe, TracingActivityLog, TracingTelemetry,
};
use runway_interfaces::TenantContext;
use runway_logging::init_logging_from_config;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

mod cli;

use cli::{Cli, Commands, ConfigCommands, TenantArgs};

/// Load configuration from file or environment
fn load_config(config_path: Option<&PathBuf>) -> Result<RunwayConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                eprintln!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Use the worker binary installed next to this one when the configured path is bare
fn resolve_worker_path(configured: &Path) -> PathBuf {
    if configured.components().count() > 1 || configured.is_absolute() {
        return configured.to_path_buf();
    }

    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(configured)));
    match sibling {
        Some(path) if path.exists() => path,
        _ => configured.to_path_buf(),
    }
}

fn parse_input(input: Option<&str>) -> Result<Option<JsonValue>> {
    input
        .map(|json| serde_json::from_str(json).context("Failed to parse input JSON"))
        .transpose()
}

struct RunArgs<'a> {
    script: &'a str,
    dir: &'a Path,
    location: Option<&'a str>,
    input: Option<&'a str>,
    action: bool,
    process: bool,
    tenant: &'a TenantArgs,
}

async fn run_command(mut config: RunwayConfig, args: RunArgs<'_>) -> Result<()> {
    config.runner.worker_path = resolve_worker_path(&config.runner.worker_path);

    let tenant = TenantContext::new(
        args.tenant.connection_id.clone(),
        args.tenant.provider_config_key.clone(),
        args.tenant.environment_id,
        args.tenant.account_id,
    );

    let mut request = ExecutionRequest::new(args.script, Uuid::new_v4().to_string(), tenant);
    if let Some(location) = args.location {
        request = request.with_location(location);
    }
    match parse_input(args.input)? {
        Some(input) => request = request.action(input),
        None if args.action => request = request.action(JsonValue::Null),
        None => {}
    }

    let flags = StaticFeatureFlags::new()
        .with_flag(config.runner.process_isolation_flag.clone(), args.process);
    let selector = RunnerSelector::from_config(
        &config.runner,
        Arc::new(SystemProbe),
        Arc::new(flags),
        Arc::new(TracingTelemetry),
    );
    let service = ScriptExecutionService::new(
        Arc::new(LocalScriptStore::new(args.dir)),
        Arc::new(TracingActivityLog),
        selector,
        &config.runner,
    );

    info!(
        "Running {} as runner {}",
        request.script_name,
        request.runner_id()
    );
    let result = service.run_script(&request, None).await;
    service.shutdown();

    let formatted =
        serde_json::to_string_pretty(&result).context("Failed to format result as JSON")?;
    println!("{}", formatted);

    match result.into_response() {
        Ok(_) => Ok(()),
        Err(error) => Err(anyhow::anyhow!("{} ({})", error.message, error.kind)),
    }
}

/// Handle configuration validation
fn handle_config_validate(config_file: &PathBuf) -> Result<()> {
    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    ConfigLoader::new()
        .from_file(config_file)
        .with_context(|| format!("Configuration validation failed for {:?}", config_file))?;
    println!("Configuration file is valid");
    Ok(())
}

/// Handle configuration display
fn handle_config_show(config: &RunwayConfig, format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml_output =
                serde_yaml::to_string(config).context("Failed to serialize to YAML")?;
            println!("{}", yaml_output);
        }
        "json" => {
            let json_output =
                serde_json::to_string_pretty(config).context("Failed to serialize to JSON")?;
            println!("{}", json_output);
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown output format: {}. Valid formats: yaml, json",
                format
            ));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config {
        config_cmd: ConfigCommands::Sample,
    } = &cli.command
    {
        print!("{}", RunwayConfig::generate_sample());
        return Ok(());
    }

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(level) = &cli.log_level {
        match level.parse::<LogLevel>() {
            Ok(level) => config.logging.level = level,
            Err(e) => eprintln!("{}, keeping {}", e, config.logging.level.as_filter_str()),
        }
    }
    init_logging_from_config(&config.logging)?;
    debug!("Runway CLI starting");

    match &cli.command {
        Commands::Run {
            script,
            dir,
            location,
            input,
            action,
            process,
            tenant,
        } => {
            run_command(
                config,
                RunArgs {
                    script,
                    dir,
                    location: location.as_deref(),
                    input: input.as_deref(),
                    action: *action,
                    process: *process,
                    tenant,
                },
            )
            .await
        }
        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Sample => Ok(()),
            ConfigCommands::Validate { config_file } => handle_config_validate(config_file),
            ConfigCommands::Show { format } => handle_config_show(&config, format),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input(None).unwrap(), None);
        assert_eq!(
            parse_input(Some(r#"{"id": 3}"#)).unwrap(),
            Some(serde_json::json!({"id": 3}))
        );
        assert!(parse_input(Some("{not json")).is_err());
    }

    #[test]
    fn test_explicit_worker_path_kept() {
        let path = PathBuf::from("/opt/runway/bin/runway-worker");
        assert_eq!(resolve_worker_path(&path), path);

        let relative = PathBuf::from("bin/runway-worker");
        assert_eq!(resolve_worker_path(&relative), relative);
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let config = load_config(Some(&missing)).unwrap();
        assert_eq!(config.runner.process_isolation_flag, "runner-v1");
    }

    #[test]
    fn test_validate_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runway.yaml");
        std::fs::write(&path, "runner:\n  port_range:\n    start: 12000\n    end: 11000\n").unwrap();
        assert!(handle_config_validate(&path).is_err());

        std::fs::write(&path, RunwayConfig::generate_sample()).unwrap();
        assert!(handle_config_validate(&path).is_ok());
    }
}
