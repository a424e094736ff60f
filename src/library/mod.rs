//! Local library: play history and playlists stored as JSON files.

mod error;
mod history;
mod models;
mod playlists;
mod store;

pub use error::LibraryError;
pub use history::{HistoryStore, MAX_HISTORY_ITEMS};
pub use models::{Playlist, VideoItem};
pub use playlists::PlaylistStore;
pub use store::JsonFile;

/// File name of the history inside the data directory.
pub const HISTORY_FILE: &str = "history.json";

/// File name of the playlists inside the data directory.
pub const PLAYLISTS_FILE: &str = "playlists.json";
