//! User playlists.

use std::path::PathBuf;

use tracing::{debug, info, instrument};

use super::error::{LibraryError, resolve_id};
use super::models::{Playlist, VideoItem};
use super::store::JsonFile;

/// Playlists backed by a JSON file. Every mutation is saved immediately.
#[derive(Debug)]
pub struct PlaylistStore {
    file: JsonFile<Vec<Playlist>>,
    playlists: Vec<Playlist>,
}

impl PlaylistStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file: JsonFile<Vec<Playlist>> = JsonFile::new(path);
        let playlists = file.load();
        debug!(path = %file.path().display(), count = playlists.len(), "playlists loaded");
        Self { file, playlists }
    }

    #[must_use]
    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    /// Looks up a playlist by full id or unique id prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] or [`LibraryError::AmbiguousId`].
    pub fn get(&self, id: &str) -> Result<&Playlist, LibraryError> {
        let index = self.index_of(id)?;
        Ok(&self.playlists[index])
    }

    /// Creates an empty playlist named `name` (trimmed).
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::EmptyName`] for a blank name, or the store
    /// error if saving fails.
    #[instrument(skip(self))]
    pub fn create(&mut self, name: &str) -> Result<&Playlist, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        self.playlists.push(Playlist::new(name));
        self.file.save(&self.playlists)?;
        info!(name, "playlist created");
        let last = self.playlists.len() - 1;
        Ok(&self.playlists[last])
    }

    /// Appends `item` unless the playlist already holds its URL.
    ///
    /// Returns whether the item was added.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for an unknown playlist, or the store error if
    /// saving fails.
    #[instrument(skip(self, item), fields(url = %item.video_url))]
    pub fn add_video(&mut self, playlist_id: &str, item: VideoItem) -> Result<bool, LibraryError> {
        let index = self.index_of(playlist_id)?;
        let playlist = &mut self.playlists[index];
        if playlist.videos.iter().any(|v| v.video_url == item.video_url) {
            debug!("video already in playlist");
            return Ok(false);
        }
        playlist.videos.push(item);
        playlist.touch();
        self.file.save(&self.playlists)?;
        Ok(true)
    }

    /// Removes the video `video_id` (full or unique prefix) from a playlist.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the playlist or video is unknown, or the
    /// store error if saving fails.
    pub fn remove_video(&mut self, playlist_id: &str, video_id: &str) -> Result<VideoItem, LibraryError> {
        let index = self.index_of(playlist_id)?;
        let playlist = &mut self.playlists[index];
        let video_id = resolve_id("video", playlist.videos.iter().map(|v| v.id.as_str()), video_id)?;
        let position = playlist
            .videos
            .iter()
            .position(|v| v.id == video_id)
            .ok_or_else(|| LibraryError::not_found("video", &video_id))?;
        let removed = playlist.videos.remove(position);
        playlist.touch();
        self.file.save(&self.playlists)?;
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns [`LibraryError::EmptyName`] for a blank name, a lookup error
    /// for an unknown playlist, or the store error if saving fails.
    pub fn rename(&mut self, playlist_id: &str, name: &str) -> Result<(), LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        let index = self.index_of(playlist_id)?;
        let playlist = &mut self.playlists[index];
        playlist.name = name.to_string();
        playlist.touch();
        self.file.save(&self.playlists)
    }

    /// # Errors
    ///
    /// Returns a lookup error for an unknown playlist, or the store error if
    /// saving fails.
    pub fn delete(&mut self, playlist_id: &str) -> Result<Playlist, LibraryError> {
        let index = self.index_of(playlist_id)?;
        let removed = self.playlists.remove(index);
        self.file.save(&self.playlists)?;
        info!(name = %removed.name, "playlist deleted");
        Ok(removed)
    }

    fn index_of(&self, id: &str) -> Result<usize, LibraryError> {
        let id = resolve_id("playlist", self.playlists.iter().map(|p| p.id.as_str()), id)?;
        self.playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| LibraryError::not_found("playlist", id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, PlaylistStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = PlaylistStore::open(dir.path().join("playlists.json"));
        (dir, store)
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let (_dir, mut playlists) = store();
        assert!(matches!(playlists.create("   "), Err(LibraryError::EmptyName)));
        assert!(playlists.playlists().is_empty());
    }

    #[test]
    fn test_add_video_skips_duplicate_url() {
        let (_dir, mut playlists) = store();
        let id = playlists.create("Talks").unwrap().id.clone();

        assert!(playlists.add_video(&id, VideoItem::new("https://e.com/a.mp4", None)).unwrap());
        assert!(!playlists.add_video(&id, VideoItem::new("https://e.com/a.mp4", Some("dup"))).unwrap());
        assert_eq!(playlists.get(&id).unwrap().video_count(), 1);
    }

    #[test]
    fn test_add_video_touches_modified_time() {
        let (_dir, mut playlists) = store();
        let created = playlists.create("Talks").unwrap().clone();
        playlists
            .add_video(&created.id, VideoItem::new("https://e.com/a.mp4", None))
            .unwrap();
        assert!(playlists.get(&created.id).unwrap().last_modified_at >= created.last_modified_at);
    }

    #[test]
    fn test_remove_rename_delete_persist() {
        let (dir, mut playlists) = store();
        let id = playlists.create("Talks").unwrap().id.clone();
        playlists.add_video(&id, VideoItem::new("https://e.com/a.mp4", None)).unwrap();
        playlists.add_video(&id, VideoItem::new("https://e.com/b.mp4", None)).unwrap();
        let first = playlists.get(&id).unwrap().videos[0].id.clone();

        let removed = playlists.remove_video(&id, &first).unwrap();
        assert_eq!(removed.video_url, "https://e.com/a.mp4");
        playlists.rename(&id, "Conference").unwrap();

        let reopened = PlaylistStore::open(dir.path().join("playlists.json"));
        let playlist = reopened.get(&id).unwrap();
        assert_eq!(playlist.name, "Conference");
        assert_eq!(playlist.video_count(), 1);

        playlists.delete(&id).unwrap();
        assert!(PlaylistStore::open(dir.path().join("playlists.json")).playlists().is_empty());
    }

    #[test]
    fn test_unknown_playlist_is_not_found() {
        let (_dir, mut playlists) = store();
        let err = playlists
            .add_video("missing", VideoItem::new("https://e.com/a.mp4", None))
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { kind: "playlist", .. }));
    }
}
