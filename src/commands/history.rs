//! History command handlers.

use anyhow::Result;
use reelfetch::library::{HistoryStore, VideoItem};

use crate::app::settings::AppConfig;
use crate::cli::HistoryCommand;

pub fn run_history_command(command: &HistoryCommand, config: &AppConfig) -> Result<()> {
    let mut history = HistoryStore::open(config.history_path());
    match command {
        HistoryCommand::List => {
            if history.items().is_empty() {
                println!("No history yet.");
                return Ok(());
            }
            for item in history.items() {
                println!("{}", render_history_row(item));
            }
        }
        HistoryCommand::Remove { id } => {
            let removed = history.remove(id)?;
            println!("Removed '{}' from history", removed.title);
        }
        HistoryCommand::Clear => {
            let count = history.items().len();
            history.clear()?;
            println!("Cleared {count} history entries");
        }
    }
    Ok(())
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn render_history_row(item: &VideoItem) -> String {
    let played = item
        .last_played_at
        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
    let saved = if item.is_downloaded { "saved" } else { "-" };
    format!(
        "{}  {}  {:<5}  {:>9}  {}  {}",
        short_id(&item.id),
        played,
        saved,
        item.display_file_size(),
        item.title,
        item.video_url
    )
}
