//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use url::Url;

/// Stream remote videos to disk and keep a local play history and playlists.
#[derive(Parser, Debug)]
#[command(name = "reelfetch")]
#[command(author, version, about, arg_required_else_help = true)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a video (and optionally its subtitle)
    Get(GetArgs),

    /// Print the size a server declares for a URL
    Probe {
        /// Absolute http(s) URL
        #[arg(value_parser = parse_http_url)]
        url: String,
    },

    /// Show or edit the play history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Manage playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),

    /// Show effective configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Absolute http(s) URL of the video
    #[arg(value_parser = parse_http_url)]
    pub url: String,

    /// Subtitle URL fetched after the video succeeds
    #[arg(long, value_parser = parse_http_url)]
    pub subtitle: Option<String>,

    /// Directory to save into (default: config `output_dir`, else current dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File name to save the video as
    #[arg(long)]
    pub name: Option<String>,

    /// Title recorded in the history (also the file name when --name is absent)
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List recently played videos, newest first
    List,
    /// Remove one entry by id (or unique id prefix)
    Remove { id: String },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum PlaylistCommand {
    /// List playlists
    List,
    /// Create an empty playlist
    Create { name: String },
    /// Show the videos in a playlist
    Show { id: String },
    /// Add a video to a playlist
    Add {
        id: String,
        #[arg(value_parser = parse_http_url)]
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_http_url)]
        subtitle: Option<String>,
    },
    /// Remove a video from a playlist
    Remove { id: String, video_id: String },
    /// Rename a playlist
    Rename { id: String, name: String },
    /// Delete a playlist
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
}

/// Accepts only absolute http(s) URLs.
fn parse_http_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| format!("invalid URL '{trimmed}': {e}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(trimmed.to_string()),
        scheme => Err(format!("unsupported URL '{trimmed}': expected http or https, got {scheme}")),
    }
}
