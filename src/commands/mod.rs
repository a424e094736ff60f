//! CLI command handlers.

mod config;
mod get;
mod history;
mod playlist;
mod probe;

pub use config::run_config_show_command;
pub use get::run_get_command;
pub use history::run_history_command;
pub use playlist::run_playlist_command;
pub use probe::run_probe_command;
