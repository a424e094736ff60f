//! File name derivation and sanitization for downloads.
//!
//! [`derive_file_name`] is pure: it never touches the network or the
//! filesystem. The only ambient input is the clock, read for the timestamp
//! fallback.

use std::path::{Component, Path};

use chrono::Local;
use tracing::debug;
use url::Url;

use super::constants::{FALLBACK_MEDIA_EXTENSION, SUBTITLE_FALLBACK_EXTENSION};

/// Picks the file name for a download.
///
/// 1. `preferred` verbatim, when supplied and non-empty
/// 2. the percent-decoded last path segment of `url`
/// 3. `video_<YYYYMMDDHHMMSS>.mp4`
#[must_use]
pub fn derive_file_name(url: &str, preferred: Option<&str>) -> String {
    if let Some(name) = preferred.filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    Url::parse(url)
        .ok()
        .and_then(|parsed| last_path_segment(&parsed))
        .unwrap_or_else(timestamp_file_name)
}

/// Makes a name safe to join onto a directory.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) and neutralizes `.`/`..`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_file_name_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Picks the file name for a subtitle saved next to `video_name`.
///
/// The URL's last segment is used when it carries an extension; otherwise the
/// subtitle is named after the video stem (or `subtitle`) with `.srt`. The
/// result never equals `video_name`, compared case-insensitively: a clash
/// becomes `<stem>.subtitle<ext>`.
#[must_use]
pub fn subtitle_file_name(url: &str, video_name: Option<&str>) -> String {
    let video_stem = video_name
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("subtitle");

    let name = match extension_from_url(url) {
        Some(_) => sanitize_file_name(&derive_file_name(url, None)),
        None => format!("{video_stem}{SUBTITLE_FALLBACK_EXTENSION}"),
    };
    if !video_name.is_some_and(|video| video.eq_ignore_ascii_case(&name)) {
        return name;
    }

    let path = Path::new(&name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(video_stem);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or_else(|| SUBTITLE_FALLBACK_EXTENSION.to_string(), |ext| format!(".{ext}"));
    format!("{stem}.subtitle{extension}")
}

/// Returns the lowercase extension (with dot) of the URL's last path segment.
pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    if ext.len() <= 1 || ext.len() > 12 {
        return None;
    }
    Some(ext.to_lowercase())
}

/// True when `name` already carries a short extension.
pub(crate) fn has_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| !ext.is_empty() && ext.len() <= 11)
}

fn last_path_segment(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).unwrap_or_else(|e| {
        debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
        last.into()
    });
    Some(decoded.into_owned())
}

fn timestamp_file_name() -> String {
    format!(
        "video_{}{FALLBACK_MEDIA_EXTENSION}",
        Local::now().format("%Y%m%d%H%M%S")
    )
}

fn is_safe_file_name_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
