//! HTTP download engine streaming media files to disk.
//!
//! # Features
//!
//! - Streaming transfers with bounded memory (fixed-size pieces)
//! - Observable [`TransferTask`] with per-field change notifications
//! - Throughput sampled on a wall-clock cadence (500 ms by default)
//! - Cooperative cancellation through [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - Partial files removed on every failed or cancelled run
//! - One shared, pooled [`HttpClient`] with a long overall timeout
//!
//! # Example
//!
//! ```no_run
//! use reelfetch::download::{DownloadEngine, HttpClient, MediaRequest, fetch_media};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(HttpClient::new());
//! let request = MediaRequest::new("https://example.com/talk.mp4", "./videos")
//!     .with_subtitle("https://example.com/talk.vtt");
//! let report = fetch_media(&engine, &request, &CancellationToken::new(), |_| {}).await;
//! println!("{}", report.summary());
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod filename;
mod media;
mod task;
mod throughput;

pub use client::HttpClient;
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_INTERVAL, MAX_CHUNK_SIZE,
    SUBTITLE_FALLBACK_EXTENSION, TRANSFER_TIMEOUT_SECS,
};
pub use engine::{DownloadEngine, EngineOptions};
pub use error::DownloadError;
pub use filename::{derive_file_name, sanitize_file_name, subtitle_file_name};
pub use media::{MediaReport, MediaRequest, fetch_media, video_file_name};
pub use task::{
    SubscriptionId, TaskField, TransferSnapshot, TransferStatus, TransferTask, format_bytes,
};
pub use throughput::ThroughputSampler;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
