//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "runway", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single script from a local directory
    Run {
        /// Name of the script (resolved as <dir>/<script>.js)
        script: String,

        /// Directory holding the scripts
        #[arg(long, value_name = "PATH", default_value = ".")]
        dir: PathBuf,

        /// Load the script from this path under --dir instead of its name
        #[arg(long, value_name = "PATH")]
        location: Option<String>,

        /// JSON input, passed to the script as an action
        #[arg(long, value_name = "JSON")]
        input: Option<String>,

        /// Run as an action even without input
        #[arg(long)]
        action: bool,

        /// Run in a worker process instead of the in-process sandbox
        #[arg(long)]
        process: bool,

        #[command(flatten)]
        tenant: TenantArgs,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Tenant the script runs for
#[derive(clap::Args)]
pub struct TenantArgs {
    #[arg(long, value_name = "ID", default_value = "local")]
    pub connection_id: String,

    #[arg(long, value_name = "KEY", default_value = "local")]
    pub provider_config_key: String,

    #[arg(long, value_name = "ID", default_value_t = 1)]
    pub environment_id: i64,

    #[arg(long, value_name = "ID", default_value_t = 1)]
    pub account_id: i64,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print a sample configuration file with every default
    Sample,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Show current configuration in use
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "runway",
            "run",
            "create-issue",
            "--dir",
            "scripts",
            "--input",
            r#"{"title":"bug"}"#,
            "--environment-id",
            "7",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                script,
                dir,
                input,
                action,
                tenant,
                ..
            } => {
                assert_eq!(script, "create-issue");
                assert_eq!(dir, PathBuf::from("scripts"));
                assert_eq!(input.as_deref(), Some(r#"{"title":"bug"}"#));
                assert!(!action);
                assert_eq!(tenant.environment_id, 7);
                assert_eq!(tenant.connection_id, "local");
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["runway", "config", "sample", "--config", "runway.yaml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("runway.yaml")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                config_cmd: ConfigCommands::Sample
            }
        ));
    }
}
