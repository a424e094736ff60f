//! Effective settings: config file values under CLI overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reelfetch::download::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_INTERVAL, DownloadEngine,
    EngineOptions, HttpClient, TRANSFER_TIMEOUT_SECS,
};
use reelfetch::library::{HISTORY_FILE, PLAYLISTS_FILE};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::{Cli, Command};

/// Used when neither `$XDG_DATA_HOME` nor `$HOME` is set.
const FALLBACK_DATA_DIR: &str = ".reelfetch";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppConfig {
    pub(crate) output_dir: PathBuf,
    pub(crate) data_dir: PathBuf,
    pub(crate) connect_timeout: Duration,
    pub(crate) transfer_timeout: Duration,
    pub(crate) chunk_size: usize,
    pub(crate) verbosity: VerbositySetting,
}

impl AppConfig {
    /// Merges `file` under the overrides carried by `cli`.
    pub(crate) fn resolve(file: &FileConfig, cli: &Cli, data_dir: Option<PathBuf>) -> Self {
        let cli_output = match &cli.command {
            Command::Get(args) => args.output.clone(),
            _ => None,
        };
        let output_dir = cli_output
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let verbosity = if cli.quiet {
            VerbositySetting::Quiet
        } else {
            match cli.verbose {
                0 => file.verbosity.unwrap_or(VerbositySetting::Default),
                1 => VerbositySetting::Verbose,
                _ => VerbositySetting::Debug,
            }
        };

        Self {
            output_dir,
            data_dir: data_dir.unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR)),
            connect_timeout: Duration::from_secs(
                file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            ),
            transfer_timeout: Duration::from_secs(
                file.transfer_timeout_secs.unwrap_or(TRANSFER_TIMEOUT_SECS),
            ),
            chunk_size: file.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            verbosity,
        }
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub(crate) fn log_level(&self) -> &'static str {
        match self.verbosity {
            VerbositySetting::Quiet => "error",
            VerbositySetting::Default => "info",
            VerbositySetting::Verbose => "debug",
            VerbositySetting::Debug => "trace",
        }
    }

    pub(crate) fn engine(&self) -> Result<DownloadEngine> {
        let client = HttpClient::try_with_timeouts(self.connect_timeout, self.transfer_timeout)
            .context("Failed to build HTTP client")?;
        let options = EngineOptions {
            chunk_size: self.chunk_size,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        };
        DownloadEngine::with_options(client, options).context("Invalid download settings")
    }

    pub(crate) fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    pub(crate) fn playlists_path(&self) -> PathBuf {
        self.data_dir.join(PLAYLISTS_FILE)
    }

    pub(crate) fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
