//! Constants for the download module (timeouts, chunking, sampling).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default overall request timeout (2 hours, sized for large media files).
///
/// This bounds the whole transfer, not a single read. A stalled transfer that
/// crosses it fails as a network timeout.
pub const TRANSFER_TIMEOUT_SECS: u64 = 2 * 60 * 60;

/// Default size of the pieces streamed to disk between cancellation checks.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Upper bound accepted for a configured chunk size (1 MiB).
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Default cadence of throughput samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Extension used when a file name has to be generated.
pub const FALLBACK_MEDIA_EXTENSION: &str = ".mp4";

/// Extension given to a subtitle whose URL carries none.
pub const SUBTITLE_FALLBACK_EXTENSION: &str = ".srt";
