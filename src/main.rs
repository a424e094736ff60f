//! CLI entry point for reelfetch.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app;
mod app_config;
mod cli;
mod commands;

use app::settings::AppConfig;
use app_config::{LoadedConfig, load_default_file_config, resolve_default_data_dir};
use cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // A broken config file still gets logging at the CLI-requested level
    // before the error is reported.
    let loaded = load_default_file_config();
    let file_config = loaded
        .as_ref()
        .map(|loaded| loaded.config.clone())
        .unwrap_or_default();
    let config = AppConfig::resolve(&file_config, &cli, resolve_default_data_dir());

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let loaded: LoadedConfig = loaded?;
    debug!(?cli, ?config, "configuration resolved");

    let success = match &cli.command {
        Command::Get(args) => commands::run_get_command(args, &config, cli.quiet).await?,
        Command::Probe { url } => {
            commands::run_probe_command(url, &config).await?;
            true
        }
        Command::History(command) => {
            commands::run_history_command(command, &config)?;
            true
        }
        Command::Playlist(command) => {
            commands::run_playlist_command(command, &config)?;
            true
        }
        Command::Config(ConfigCommand::Show) => {
            commands::run_config_show_command(&loaded, &config);
            true
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
