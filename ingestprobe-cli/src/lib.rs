//! ingestprobe CLI library -- argument model, command handlers and wiring
//! shared by the `ingestprobe` binary and its integration tests.

pub mod cli;
pub mod commands;
pub mod deployment;
pub mod error;
pub mod logging;
pub mod output;

use std::path::{Path, PathBuf};

use tracing::info;

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::metrics::describe_metrics;
use ingestprobe_docker::DockerClient;

use crate::cli::{Cli, Commands};
use crate::commands::service::ServiceAction;
use crate::deployment::Deployment;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "ingestprobe.toml";

/// Loads the configuration: file (explicit, or the default one when it
/// exists), then env overrides, then validation.
pub async fn load_config(path: Option<&Path>) -> Result<ProbeConfig, CliError> {
    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let config = match path {
        Some(p) => ProbeConfig::load(&p).await?,
        None => {
            let mut config = ProbeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

/// Applies command-line overrides, the highest-precedence layer.
pub fn apply_cli_overrides(config: &mut ProbeConfig, cli: &Cli) -> Result<(), CliError> {
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    match &cli.command {
        Commands::Ingest(args) => {
            if let Some(ms) = args.max_timeout_ms {
                config.poll.max_timeout_ms = ms;
            }
        }
        Commands::Verify(args) => {
            if let Some(prefix) = &args.prefix {
                config.artifact.expected_prefix = prefix.clone();
            }
        }
        _ => {}
    }
    config.validate()?;
    Ok(())
}

/// Full binary flow: configure, log, connect, dispatch.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref()).await?;
    apply_cli_overrides(&mut config, &cli)?;

    logging::init_tracing(&config.general).map_err(|e| CliError::Config(e.to_string()))?;
    describe_metrics();
    info!(command = ?cli.command, "ingestprobe starting");

    let deployment = Deployment::connect(config).await?;
    dispatch(cli, &deployment).await
}

/// Routes a parsed command to its handler.
pub async fn dispatch<D: DockerClient>(cli: Cli, deployment: &Deployment<D>) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, deployment, &writer).await,
        Commands::Status(args) => commands::status::execute(args, deployment, &writer).await,
        Commands::Record(args) => commands::record::execute(args, deployment, &writer).await,
        Commands::Verify(args) => commands::verify::execute(args, deployment, &writer).await,
        Commands::Suspend(args) => {
            commands::service::execute(ServiceAction::Suspend, args, deployment, &writer).await
        }
        Commands::Resume(args) => {
            commands::service::execute(ServiceAction::Resume, args, deployment, &writer).await
        }
    }
}
