//! reelfetch core library
//!
//! Streams remote media files to disk with observable progress and
//! cooperative cancellation, and keeps the pieces a desktop player needs
//! around that: a recovering playback session and a local library.
//!
//! # Architecture
//!
//! - [`download`] - HTTP transfer engine and the observable [`TransferTask`]
//! - [`playback`] - player boundary and live stream recovery
//! - [`library`] - play history and playlists stored as JSON

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod library;
pub mod playback;

// Re-export commonly used types
pub use download::{
    DownloadEngine, DownloadError, HttpClient, MediaReport, MediaRequest, TaskField,
    TransferStatus, TransferTask, fetch_media,
};
pub use library::{HistoryStore, LibraryError, Playlist, PlaylistStore, VideoItem};
pub use playback::{MediaPlayer, PlaybackError, PlaybackSession, RecoveryMachine, RecoveryPolicy};
