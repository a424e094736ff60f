//! Recently played videos, newest first.

use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, instrument};

use super::error::{LibraryError, resolve_id};
use super::models::VideoItem;
use super::store::JsonFile;

/// Maximum number of entries kept in the history.
pub const MAX_HISTORY_ITEMS: usize = 100;

/// Play history backed by a JSON file. Every mutation is saved immediately.
#[derive(Debug)]
pub struct HistoryStore {
    file: JsonFile<Vec<VideoItem>>,
    items: Vec<VideoItem>,
}

impl HistoryStore {
    /// Opens the history at `path`; a missing or corrupt file reads as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file: JsonFile<Vec<VideoItem>> = JsonFile::new(path);
        let items = file.load();
        debug!(path = %file.path().display(), count = items.len(), "history loaded");
        Self { file, items }
    }

    #[must_use]
    pub fn items(&self) -> &[VideoItem] {
        &self.items
    }

    /// Looks up an entry by full id or unique id prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] or [`LibraryError::AmbiguousId`].
    pub fn find(&self, id: &str) -> Result<&VideoItem, LibraryError> {
        let id = resolve_id("history entry", self.items.iter().map(|i| i.id.as_str()), id)?;
        self.items
            .iter()
            .find(|item| item.id == id)
            .ok_or_else(|| LibraryError::not_found("history entry", id))
    }

    /// Records a play of `item`.
    ///
    /// An older entry with the same URL is replaced. The new entry goes to the
    /// front with `last_played_at` set to now, and only the newest
    /// [`MAX_HISTORY_ITEMS`] are kept.
    ///
    /// # Errors
    ///
    /// Returns the store error if saving fails.
    #[instrument(skip(self, item), fields(url = %item.video_url))]
    pub fn record(&mut self, mut item: VideoItem) -> Result<(), LibraryError> {
        self.items.retain(|existing| existing.video_url != item.video_url);
        item.last_played_at = Some(Local::now());
        self.items.insert(0, item);
        self.items.truncate(MAX_HISTORY_ITEMS);
        self.file.save(&self.items)
    }

    /// Removes the entry with `id` (full or unique prefix).
    ///
    /// # Errors
    ///
    /// Returns a lookup error if nothing matches, or the store error if
    /// saving fails.
    pub fn remove(&mut self, id: &str) -> Result<VideoItem, LibraryError> {
        let id = resolve_id("history entry", self.items.iter().map(|i| i.id.as_str()), id)?;
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| LibraryError::not_found("history entry", &id))?;
        let removed = self.items.remove(index);
        self.file.save(&self.items)?;
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns the store error if saving fails.
    pub fn clear(&mut self) -> Result<(), LibraryError> {
        self.items.clear();
        self.file.save(&self.items)
    }
}
