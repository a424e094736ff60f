//! Streaming HTTP-to-disk transfer engine.
//!
//! [`DownloadEngine::transfer`] moves one HTTP resource to one local file
//! while publishing progress into a [`TransferTask`]. Memory use is bounded by
//! one network frame plus the write buffer, whatever the file size.
//!
//! # Exit paths
//!
//! Every run ends in exactly one terminal state on the task:
//!
//! | Outcome   | Return  | Task                               | Destination file |
//! |-----------|---------|------------------------------------|------------------|
//! | success   | `true`  | completed, 100%, speed 0           | complete         |
//! | cancelled | `false` | cancelled, speed 0                 | removed          |
//! | error     | `false` | failed, error message set, speed 0 | removed          |
//!
//! Expected failures (network, HTTP status, I/O, cancellation) never escape as
//! errors; they are folded into the task. Retrying is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use reelfetch::download::{DownloadEngine, HttpClient, TransferTask};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(HttpClient::new());
//! let task = TransferTask::new("movie.mp4", "https://example.com/movie.mp4", "/tmp/movie.mp4");
//! task.subscribe(|task, _field| println!("{} {}", task.status_text(), task.progress_text()));
//! let cancel = CancellationToken::new();
//! let ok = engine
//!     .transfer(task.url(), Path::new("/tmp/movie.mp4"), &task, &cancel)
//!     .await;
//! println!("success: {ok}");
//! # }
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, declared_content_length};
use super::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_INTERVAL, MAX_CHUNK_SIZE};
use super::error::DownloadError;
use super::filename;
use super::task::{TransferStatus, TransferTask};
use super::throughput::ThroughputSampler;

/// Tuning knobs for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Largest piece written between cancellation checks.
    pub chunk_size: usize,
    /// Minimum wall-clock window between throughput samples.
    pub sample_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

impl EngineOptions {
    fn validate(&self) -> Result<(), DownloadError> {
        if !(1..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(DownloadError::invalid_options(format!(
                "chunk size {} must be between 1 and {MAX_CHUNK_SIZE} bytes",
                self.chunk_size
            )));
        }
        if self.sample_interval.is_zero() {
            return Err(DownloadError::invalid_options(
                "sample interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Stateless transfer engine around a shared [`HttpClient`].
///
/// The engine keeps no per-transfer state, so one instance (or its clones)
/// can run any number of transfers concurrently as long as each has its own
/// [`TransferTask`] and [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    client: HttpClient,
    options: EngineOptions,
}

impl DownloadEngine {
    /// Creates an engine with default options (8 KiB chunks, 500 ms samples).
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            options: EngineOptions::default(),
        }
    }

    /// Creates an engine with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidOptions`] if the chunk size is outside
    /// `1..=1 MiB` or the sample interval is zero.
    pub fn with_options(client: HttpClient, options: EngineOptions) -> Result<Self, DownloadError> {
        options.validate()?;
        Ok(Self { client, options })
    }

    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Transfers `url` to `destination`, reporting into `task`.
    ///
    /// Returns `true` only on full success. Cancellation and failure both
    /// return `false`; inspect [`TransferTask::is_cancelled`] and
    /// [`TransferTask::error_message`] to tell them apart. In both cases the
    /// destination file no longer exists when this returns.
    ///
    /// `task` must not be shared with another in-flight transfer.
    #[instrument(skip(self, task, cancel), fields(url = %url, task_id = %task.id()))]
    pub async fn transfer(
        &self,
        url: &str,
        destination: &Path,
        task: &TransferTask,
        cancel: &CancellationToken,
    ) -> bool {
        match self.run(url, destination, task, cancel).await {
            Ok(bytes) => {
                task.mark_completed();
                info!(path = %destination.display(), bytes, "transfer complete");
                true
            }
            Err(error) if error.is_cancelled() => {
                remove_partial_file(destination).await;
                task.mark_cancelled();
                info!(
                    path = %destination.display(),
                    bytes = task.downloaded_bytes(),
                    "transfer cancelled"
                );
                false
            }
            Err(error) => {
                remove_partial_file(destination).await;
                task.mark_failed(error.to_string());
                warn!(error = %error, "transfer failed");
                false
            }
        }
    }

    /// Returns the size the server declares for `url`, or 0.
    ///
    /// Issues a HEAD request. Any failure (network, status, missing header)
    /// reads as 0; the value is a hint only.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe_size(&self, url: &str) -> u64 {
        match self.client.head_content_length(url).await {
            Ok(size) => size.unwrap_or(0),
            Err(error) => {
                debug!(error = %error, "size probe failed");
                0
            }
        }
    }

    /// See [`filename::derive_file_name`].
    #[must_use]
    pub fn derive_file_name(url: &str, preferred: Option<&str>) -> String {
        filename::derive_file_name(url, preferred)
    }

    async fn run(
        &self,
        url: &str,
        destination: &Path,
        task: &TransferTask,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        if cancel.is_cancelled() {
            return Err(DownloadError::cancelled(url));
        }

        task.set_status(TransferStatus::Connecting);
        debug!("requesting headers");
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            response = self.client.get(url) => response?,
        };

        let total = declared_content_length(&response).unwrap_or(0);
        task.set_total_bytes(total);
        debug!(total, "response headers received");

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        let file = File::create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        task.set_status(TransferStatus::Downloading);
        self.stream_to_file(file, response, url, destination, task, cancel)
            .await
    }

    /// Streams the body into `file` in pieces of at most `chunk_size` bytes.
    ///
    /// The file handle is dropped on return, so the caller can remove it.
    async fn stream_to_file(
        &self,
        file: File,
        response: reqwest::Response,
        url: &str,
        destination: &Path,
        task: &TransferTask,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let mut writer = BufWriter::with_capacity(self.options.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut sampler = ThroughputSampler::new(self.options.sample_interval, Instant::now());
        let mut written: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
                next = stream.next() => next,
            };
            let Some(frame) = next else {
                break;
            };
            let frame = frame.map_err(|e| DownloadError::network(url, e))?;

            for piece in frame.chunks(self.options.chunk_size) {
                if cancel.is_cancelled() {
                    return Err(DownloadError::cancelled(url));
                }
                writer
                    .write_all(piece)
                    .await
                    .map_err(|e| DownloadError::io(destination, e))?;
                written += piece.len() as u64;
                task.set_downloaded_bytes(written);

                if let Some(rate) = sampler.sample(Instant::now(), written) {
                    task.set_speed(rate);
                }
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        Ok(written)
    }
}

/// Best-effort removal of a partial destination file.
async fn remove_partial_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}
