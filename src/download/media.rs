//! Video-plus-subtitle fetch built on the engine.
//!
//! The video is fetched first. The subtitle is fetched only when the video
//! succeeded, with its own task and a child cancellation token; any subtitle
//! failure is logged and swallowed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::constants::FALLBACK_MEDIA_EXTENSION;
use super::engine::DownloadEngine;
use super::filename::{
    derive_file_name, extension_from_url, has_extension, sanitize_file_name, subtitle_file_name,
};
use super::task::TransferTask;

/// What to fetch and where.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub video_url: String,
    pub subtitle_url: Option<String>,
    pub output_dir: PathBuf,
    /// Preferred base name for the video (often the title).
    pub file_name: Option<String>,
}

impl MediaRequest {
    #[must_use]
    pub fn new(video_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            video_url: video_url.into(),
            subtitle_url: None,
            output_dir: output_dir.into(),
            file_name: None,
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle_url: impl Into<String>) -> Self {
        self.subtitle_url = Some(subtitle_url.into()).filter(|url| !url.is_empty());
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into()).filter(|name| !name.is_empty());
        self
    }
}

/// Result of [`fetch_media`].
#[derive(Debug, Clone)]
pub struct MediaReport {
    pub video: Arc<TransferTask>,
    /// Present only when a subtitle was requested and the video succeeded.
    pub subtitle: Option<Arc<TransferTask>>,
    pub success: bool,
}

impl MediaReport {
    /// Local path of the subtitle if it was fetched successfully.
    #[must_use]
    pub fn subtitle_path(&self) -> Option<&Path> {
        self.subtitle
            .as_ref()
            .filter(|task| task.is_completed())
            .map(|task| task.save_path())
    }

    /// One-line terminal summary for the user.
    #[must_use]
    pub fn summary(&self) -> String {
        let video = &self.video;
        if video.is_completed() {
            let mut line = format!("Download complete: {}", video.save_path().display());
            if let Some(subtitle) = self.subtitle_path() {
                line.push_str(&format!(" (subtitle: {})", subtitle.display()));
            }
            line
        } else if video.is_cancelled() {
            format!("Download cancelled: {}", video.file_name())
        } else {
            format!("Download failed: {}", video.error_message())
        }
    }
}

/// Builds the on-disk name for the video of `request`.
///
/// A preferred name without an extension borrows the URL's extension, or
/// `.mp4` when the URL has none.
#[must_use]
pub fn video_file_name(request: &MediaRequest) -> String {
    let name = sanitize_file_name(&derive_file_name(
        &request.video_url,
        request.file_name.as_deref(),
    ));
    if has_extension(&name) {
        return name;
    }
    let extension = extension_from_url(&request.video_url)
        .unwrap_or_else(|| FALLBACK_MEDIA_EXTENSION.to_string());
    format!("{name}{extension}")
}

/// Fetches the video and, on success, its subtitle.
///
/// Tasks are returned as soon as they exist through `on_task`, so a UI can
/// subscribe before bytes start flowing.
#[instrument(skip(engine, cancel, on_task), fields(url = %request.video_url))]
pub async fn fetch_media<F>(
    engine: &DownloadEngine,
    request: &MediaRequest,
    cancel: &CancellationToken,
    mut on_task: F,
) -> MediaReport
where
    F: FnMut(&Arc<TransferTask>),
{
    let file_name = video_file_name(request);
    let destination = request.output_dir.join(&file_name);
    let video = Arc::new(TransferTask::new(
        file_name,
        request.video_url.clone(),
        destination.clone(),
    ));
    on_task(&video);

    let success = engine
        .transfer(&request.video_url, &destination, &video, cancel)
        .await;

    let subtitle = match (&request.subtitle_url, success) {
        (Some(subtitle_url), true) => {
            let task = fetch_subtitle(
                engine,
                subtitle_url,
                &request.output_dir,
                video.file_name(),
                cancel,
                &mut on_task,
            )
            .await;
            Some(task)
        }
        _ => None,
    };

    MediaReport {
        video,
        subtitle,
        success,
    }
}

async fn fetch_subtitle<F>(
    engine: &DownloadEngine,
    url: &str,
    output_dir: &Path,
    video_name: &str,
    cancel: &CancellationToken,
    on_task: &mut F,
) -> Arc<TransferTask>
where
    F: FnMut(&Arc<TransferTask>),
{
    let file_name = subtitle_file_name(url, Some(video_name));
    let destination = output_dir.join(&file_name);
    let task = Arc::new(TransferTask::new(file_name, url, destination.clone()));
    on_task(&task);

    let child = cancel.child_token();
    if engine.transfer(url, &destination, &task, &child).await {
        info!(path = %destination.display(), "subtitle saved");
    } else {
        warn!(
            url,
            error = %task.error_message(),
            cancelled = task.is_cancelled(),
            "subtitle fetch failed; continuing without it"
        );
    }
    task
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_file_name_from_url() {
        let request = MediaRequest::new("https://example.com/v/clip.webm", "/tmp");
        assert_eq!(video_file_name(&request), "clip.webm");
    }

    #[test]
    fn test_video_file_name_title_borrows_url_extension() {
        let request =
            MediaRequest::new("https://example.com/v/clip.mkv", "/tmp").with_file_name("My Trip");
        assert_eq!(video_file_name(&request), "My Trip.mkv");
    }

    #[test]
    fn test_video_file_name_title_without_url_extension_uses_mp4() {
        let request =
            MediaRequest::new("https://example.com/live/stream", "/tmp").with_file_name("Lecture 1");
        assert_eq!(video_file_name(&request), "Lecture 1.mp4");
    }

    #[test]
    fn test_video_file_name_title_is_sanitized() {
        let request =
            MediaRequest::new("https://example.com/a.mp4", "/tmp").with_file_name("a/b: c.mp4");
        assert_eq!(video_file_name(&request), "a_b_ c.mp4");
    }

    #[test]
    fn test_empty_subtitle_and_name_are_ignored() {
        let request = MediaRequest::new("https://example.com/a.mp4", "/tmp")
            .with_subtitle("")
            .with_file_name("");
        assert!(request.subtitle_url.is_none());
        assert!(request.file_name.is_none());
    }
}
