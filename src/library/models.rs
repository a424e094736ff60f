//! Library records: videos and playlists.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::download::{derive_file_name, format_bytes};

/// One video the user played or saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub subtitle_url: Option<String>,
    pub added_at: DateTime<Local>,
    pub last_played_at: Option<DateTime<Local>>,
    /// Size in bytes, 0 when unknown.
    pub file_size: u64,
    pub local_video_path: Option<PathBuf>,
    pub local_subtitle_path: Option<PathBuf>,
    pub is_downloaded: bool,
    /// Length in seconds when known.
    pub duration_secs: Option<u64>,
    /// Resume position in seconds.
    pub last_position_secs: u64,
}

impl Default for VideoItem {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            video_url: String::new(),
            subtitle_url: None,
            added_at: Local::now(),
            last_played_at: None,
            file_size: 0,
            local_video_path: None,
            local_subtitle_path: None,
            is_downloaded: false,
            duration_secs: None,
            last_position_secs: 0,
        }
    }
}

impl VideoItem {
    /// Creates an item for `video_url`. Without a title, the file name
    /// derived from the URL is used.
    #[must_use]
    pub fn new(video_url: impl Into<String>, title: Option<&str>) -> Self {
        let video_url = video_url.into();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| derive_file_name(&video_url, None), str::to_string);
        Self {
            title,
            video_url,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle_url: Option<String>) -> Self {
        self.subtitle_url = subtitle_url.filter(|url| !url.is_empty());
        self
    }

    /// `HH:MM:SS`, or `--:--:--` when the length is unknown.
    #[must_use]
    pub fn display_duration(&self) -> String {
        match self.duration_secs {
            Some(secs) => format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60),
            None => "--:--:--".to_string(),
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn display_file_size(&self) -> String {
        if self.file_size == 0 {
            "-".to_string()
        } else {
            format_bytes(self.file_size as f64)
        }
    }
}

/// A named, ordered list of videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub videos: Vec<VideoItem>,
    pub created_at: DateTime<Local>,
    pub last_modified_at: DateTime<Local>,
}

impl Playlist {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            videos: Vec::new(),
            created_at: now,
            last_modified_at: now,
        }
    }

    #[must_use]
    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified_at = Local::now();
    }
}
