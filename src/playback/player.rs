//! Boundary to the embedded media engine.
//!
//! The engine itself (decode, render, track selection) lives outside this
//! crate. Implementations wrap a concrete backend and forward its lifecycle
//! callbacks as [`PlayerEvent`]s.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Lifecycle events emitted by a player backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Playing,
    Paused,
    Stopped,
    EndReached,
    /// The stream failed (network drop, decoder error, ...).
    Error,
    /// Total media length became known.
    LengthKnown(Duration),
}

/// Errors reported by a player backend.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The backend rejected the media URL or could not open it.
    #[error("failed to load {url}: {reason}")]
    Load {
        url: String,
        reason: String,
    },

    /// A control command failed.
    #[error("player command `{command}` failed: {reason}")]
    Command {
        command: &'static str,
        reason: String,
    },

    /// A subtitle file could not be attached.
    #[error("failed to attach subtitle {path}: {reason}")]
    Subtitle {
        path: String,
        reason: String,
    },
}

impl PlaybackError {
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn command(command: &'static str, reason: impl Into<String>) -> Self {
        Self::Command {
            command,
            reason: reason.into(),
        }
    }

    pub fn subtitle(path: &Path, reason: impl Into<String>) -> Self {
        Self::Subtitle {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Opaque media player controlled by a [`PlaybackSession`](super::PlaybackSession).
///
/// Object safe through `async_trait`, so sessions can hold a
/// `Box<dyn MediaPlayer>` chosen at runtime.
#[async_trait]
pub trait MediaPlayer: Send {
    /// Opens `url` as the current media, replacing any previous one.
    async fn load(&mut self, url: &str) -> Result<(), PlaybackError>;

    async fn play(&mut self) -> Result<(), PlaybackError>;

    async fn pause(&mut self) -> Result<(), PlaybackError>;

    async fn stop(&mut self) -> Result<(), PlaybackError>;

    async fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;

    /// Playback speed multiplier (1.0 is normal speed).
    async fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError>;

    /// Volume in percent, `0..=100`.
    async fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError>;

    async fn add_subtitle_track(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Current playback position.
    fn position(&self) -> Duration;
}

#[async_trait]
impl<P: MediaPlayer + ?Sized> MediaPlayer for Box<P> {
    async fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
        (**self).load(url).await
    }

    async fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play().await
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        (**self).pause().await
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        (**self).stop().await
    }

    async fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        (**self).seek(position).await
    }

    async fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
        (**self).set_rate(rate).await
    }

    async fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError> {
        (**self).set_volume(volume).await
    }

    async fn add_subtitle_track(&mut self, path: &Path) -> Result<(), PlaybackError> {
        (**self).add_subtitle_track(path).await
    }

    fn position(&self) -> Duration {
        (**self).position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_error_names_the_file() {
        let error = PlaybackError::subtitle(Path::new("/tmp/talk.vtt"), "unsupported format");
        let msg = error.to_string();
        assert!(msg.contains("/tmp/talk.vtt"), "Expected path in: {msg}");
        assert!(msg.contains("unsupported format"), "Expected reason in: {msg}");
    }
}
