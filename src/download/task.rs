//! Observable state of a single transfer.
//!
//! A [`TransferTask`] is created by the caller right before a transfer starts
//! and is written only by the [`DownloadEngine`](super::DownloadEngine) while
//! that transfer runs. Anyone may read it at any time, or register a callback
//! with [`TransferTask::subscribe`] to be told about every individual field
//! change.
//!
//! Derived values (percentage, human-readable sizes, rate text) are computed
//! on read from the current counters and are therefore never stale.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest percentage reported while a transfer is still running.
///
/// A transfer reads as exactly 100% only once it has completed.
const IN_FLIGHT_PERCENT_CEILING: f64 = 99.9;

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Handle returned by [`TransferTask::subscribe`].
pub type SubscriptionId = u64;

type Observer = Arc<dyn Fn(&TransferTask, TaskField) + Send + Sync>;

/// Identifies which observable field of a task changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    /// The status (and its text) changed.
    Status,
    /// Bytes written to disk so far.
    DownloadedBytes,
    /// Declared total size.
    TotalBytes,
    /// Sampled throughput.
    Speed,
    /// Percentage complete.
    Progress,
    /// The task reached successful completion.
    Completed,
    /// The task was cancelled.
    Cancelled,
    /// An error message was recorded.
    ErrorMessage,
}

/// Lifecycle status of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Created, not started.
    Pending,
    /// Waiting for response headers.
    Connecting,
    /// Streaming the body to disk.
    Downloading,
    /// Finished successfully.
    Completed,
    /// Stopped by the caller.
    Cancelled,
    /// Stopped by a network or I/O error.
    Failed,
}

impl TransferStatus {
    /// Returns true for the three end states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Human-readable status line.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Waiting...",
            Self::Connecting => "Connecting...",
            Self::Downloading => "Downloading...",
            Self::Completed => "Download complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Download failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct TransferState {
    status: TransferStatus,
    downloaded_bytes: u64,
    total_bytes: u64,
    speed: f64,
    error_message: String,
}

impl Default for TransferState {
    fn default() -> Self {
        Self {
            status: TransferStatus::Pending,
            downloaded_bytes: 0,
            total_bytes: 0,
            speed: 0.0,
            error_message: String::new(),
        }
    }
}

impl TransferState {
    fn percentage(&self) -> Option<f64> {
        if self.status == TransferStatus::Completed {
            return Some(100.0);
        }
        if self.total_bytes == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let raw = self.downloaded_bytes as f64 / self.total_bytes as f64 * 100.0;
        Some(raw.clamp(0.0, IN_FLIGHT_PERCENT_CEILING))
    }
}

/// Point-in-time copy of a task, for logging or polling UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSnapshot {
    pub id: String,
    pub file_name: String,
    pub url: String,
    pub save_path: PathBuf,
    pub created_at: DateTime<Local>,
    pub status: TransferStatus,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed: f64,
    pub percentage: Option<f64>,
    pub error_message: String,
}

/// Observable state of one transfer.
///
/// Never reused: a new task is created for every transfer, including a
/// subtitle fetch that follows a video fetch.
pub struct TransferTask {
    id: String,
    file_name: String,
    url: String,
    save_path: PathBuf,
    created_at: DateTime<Local>,
    state: Mutex<TransferState>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

impl fmt::Debug for TransferTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferTask")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("url", &self.url)
            .field("save_path", &self.save_path)
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl TransferTask {
    /// Creates a pending task with a fresh identity.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        url: impl Into<String>,
        save_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            url: url.into(),
            save_path: save_path.into(),
            created_at: Local::now(),
            state: Mutex::new(TransferState::default()),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    #[must_use]
    pub fn status(&self) -> TransferStatus {
        self.state().status
    }

    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status().label()
    }

    #[must_use]
    pub fn downloaded_bytes(&self) -> u64 {
        self.state().downloaded_bytes
    }

    /// Declared size in bytes, 0 when the server did not report one.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.state().total_bytes
    }

    /// Last sampled throughput in bytes per second.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.state().speed
    }

    /// Percentage complete, or `None` while the total size is unknown.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.state().percentage()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status() == TransferStatus::Completed
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status() == TransferStatus::Cancelled
    }

    /// Empty unless the transfer failed.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.state().error_message.clone()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// `"<percent>%"` with one decimal, or `"--"` when unknown.
    #[must_use]
    pub fn progress_text(&self) -> String {
        self.percentage()
            .map_or_else(|| "--".to_string(), |p| format!("{p:.1}%"))
    }

    /// Rate as `"<size>/s"`.
    #[must_use]
    pub fn speed_text(&self) -> String {
        format!("{}/s", format_bytes(self.speed()))
    }

    /// `"<downloaded> / <total>"`; the total reads `"?"` when unknown.
    #[must_use]
    pub fn downloaded_text(&self) -> String {
        let (downloaded, total) = {
            let state = self.state();
            (state.downloaded_bytes, state.total_bytes)
        };
        let total_text = if total == 0 {
            "?".to_string()
        } else {
            format_u64(total)
        };
        format!("{} / {total_text}", format_u64(downloaded))
    }

    #[must_use]
    pub fn total_text(&self) -> String {
        format_u64(self.total_bytes())
    }

    #[must_use]
    pub fn snapshot(&self) -> TransferSnapshot {
        let state = self.state();
        TransferSnapshot {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            url: self.url.clone(),
            save_path: self.save_path.clone(),
            created_at: self.created_at,
            status: state.status,
            downloaded_bytes: state.downloaded_bytes,
            total_bytes: state.total_bytes,
            speed: state.speed,
            percentage: state.percentage(),
            error_message: state.error_message.clone(),
        }
    }

    /// Registers a callback invoked once per changed field.
    ///
    /// Callbacks run on the transferring task after the internal lock is
    /// released, so they may read the task. They should return quickly; a
    /// slow callback slows the transfer.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&TransferTask, TaskField) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.observers_guard().push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers_guard();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    // ==================== Engine-side mutation ====================

    pub(crate) fn set_status(&self, status: TransferStatus) {
        debug_assert!(!status.is_terminal(), "terminal states have dedicated setters");
        self.update(|state| {
            if state.status == status {
                return Vec::new();
            }
            state.status = status;
            vec![TaskField::Status]
        });
    }

    pub(crate) fn set_total_bytes(&self, total: u64) {
        self.update(|state| {
            if state.total_bytes == total {
                return Vec::new();
            }
            state.total_bytes = total;
            let mut changed = vec![TaskField::TotalBytes];
            if total > 0 {
                changed.push(TaskField::Progress);
            }
            changed
        });
    }

    /// Publishes the cumulative byte count. Values below the current count are ignored.
    pub(crate) fn set_downloaded_bytes(&self, downloaded: u64) {
        self.update(|state| {
            if downloaded <= state.downloaded_bytes {
                return Vec::new();
            }
            state.downloaded_bytes = downloaded;
            let mut changed = vec![TaskField::DownloadedBytes];
            if state.total_bytes > 0 {
                changed.push(TaskField::Progress);
            }
            changed
        });
    }

    pub(crate) fn set_speed(&self, bytes_per_second: f64) {
        self.update(|state| {
            let speed = bytes_per_second.max(0.0);
            if (state.speed - speed).abs() < f64::EPSILON {
                return Vec::new();
            }
            state.speed = speed;
            vec![TaskField::Speed]
        });
    }

    pub(crate) fn mark_completed(&self) {
        self.finish(TransferStatus::Completed, None);
    }

    pub(crate) fn mark_cancelled(&self) {
        self.finish(TransferStatus::Cancelled, None);
    }

    pub(crate) fn mark_failed(&self, message: impl Into<String>) {
        self.finish(TransferStatus::Failed, Some(message.into()));
    }

    fn finish(&self, status: TransferStatus, error: Option<String>) {
        self.update(|state| {
            let mut changed = Vec::new();
            if state.speed > 0.0 {
                state.speed = 0.0;
                changed.push(TaskField::Speed);
            }
            state.status = status;
            match status {
                TransferStatus::Completed => {
                    changed.extend([TaskField::Progress, TaskField::Status, TaskField::Completed]);
                }
                TransferStatus::Cancelled => {
                    changed.extend([TaskField::Status, TaskField::Cancelled]);
                }
                _ => {
                    state.error_message = error.unwrap_or_default();
                    changed.extend([TaskField::Status, TaskField::ErrorMessage]);
                }
            }
            changed
        });
    }

    /// Applies a mutation unless the task is already terminal, then notifies
    /// observers of each changed field with no lock held.
    fn update(&self, apply: impl FnOnce(&mut TransferState) -> Vec<TaskField>) {
        let changed = {
            let mut state = self.state();
            if state.status.is_terminal() {
                return;
            }
            apply(&mut state)
        };
        if changed.is_empty() {
            return;
        }
        let observers: Vec<Observer> = self
            .observers_guard()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for field in changed {
            for observer in &observers {
                observer(self, field);
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, TransferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers_guard(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Observer)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Formats a byte count with binary prefixes: `512 B`, `1.5 KB`, `10 MB`.
///
/// Values are divided by 1024 per step up to GB and printed with at most two
/// decimals, trailing zeros trimmed.
#[must_use]
pub fn format_bytes(bytes: f64) -> String {
    let mut value = if bytes.is_finite() { bytes.max(0.0) } else { 0.0 };
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let mut text = format!("{value:.2}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    format!("{text} {}", SIZE_UNITS[unit])
}

#[allow(clippy::cast_precision_loss)]
fn format_u64(bytes: u64) -> String {
    format_bytes(bytes as f64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn task() -> TransferTask {
        TransferTask::new("movie.mp4", "https://example.com/movie.mp4", "/tmp/movie.mp4")
    }

    fn record(task: &TransferTask) -> Arc<Mutex<Vec<TaskField>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        task.subscribe(move |_, field| sink.lock().unwrap().push(field));
        seen
    }

    #[test]
    fn test_new_task_is_pending_with_unique_id() {
        let a = task();
        let b = task();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.status(), TransferStatus::Pending);
        assert_eq!(a.downloaded_bytes(), 0);
        assert_eq!(a.total_bytes(), 0);
        assert!(a.error_message().is_empty());
        assert!(!a.is_terminal());
    }

    #[test]
    fn test_format_bytes_binary_prefixes() {
        assert_eq!(format_bytes(0.0), "0 B");
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1024.0), "1 KB");
        assert_eq!(format_bytes(1536.0), "1.5 KB");
        assert_eq!(format_bytes(10.0 * 1024.0 * 1024.0), "10 MB");
        assert_eq!(format_bytes(3.0 * 1024.0 * 1024.0 * 1024.0), "3 GB");
    }

    #[test]
    fn test_format_bytes_caps_at_gigabytes() {
        assert_eq!(format_bytes(2048.0 * 1024.0 * 1024.0 * 1024.0), "2048 GB");
    }

    #[test]
    fn test_format_bytes_two_decimals_max() {
        assert_eq!(format_bytes(1234.0), "1.21 KB");
    }

    #[test]
    fn test_format_bytes_negative_and_nan_read_as_zero() {
        assert_eq!(format_bytes(-5.0), "0 B");
        assert_eq!(format_bytes(f64::NAN), "0 B");
    }

    #[test]
    fn test_percentage_unknown_total_is_none() {
        let t = task();
        t.set_downloaded_bytes(500);
        assert_eq!(t.percentage(), None);
        assert_eq!(t.progress_text(), "--");
    }

    #[test]
    fn test_percentage_tracks_counters() {
        let t = task();
        t.set_total_bytes(1000);
        t.set_downloaded_bytes(250);
        assert_eq!(t.percentage(), Some(25.0));
        assert_eq!(t.progress_text(), "25.0%");
    }

    #[test]
    fn test_percentage_reaches_100_only_on_completion() {
        let t = task();
        t.set_total_bytes(1000);
        t.set_downloaded_bytes(1000);
        let in_flight = t.percentage().unwrap();
        assert!(in_flight < 100.0, "in-flight percentage was {in_flight}");
        t.mark_completed();
        assert_eq!(t.percentage(), Some(100.0));
    }

    #[test]
    fn test_percentage_clamped_when_server_sends_more_than_declared() {
        let t = task();
        t.set_total_bytes(100);
        t.set_downloaded_bytes(250);
        let p = t.percentage().unwrap();
        assert!((0.0..100.0).contains(&p));
    }

    #[test]
    fn test_downloaded_bytes_never_decrease() {
        let t = task();
        t.set_downloaded_bytes(300);
        t.set_downloaded_bytes(100);
        assert_eq!(t.downloaded_bytes(), 300);
    }

    #[test]
    fn test_each_field_change_is_notified() {
        let t = task();
        let seen = record(&t);
        t.set_status(TransferStatus::Connecting);
        t.set_total_bytes(100);
        t.set_downloaded_bytes(10);
        t.set_speed(42.0);
        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                TaskField::Status,
                TaskField::TotalBytes,
                TaskField::Progress,
                TaskField::DownloadedBytes,
                TaskField::Progress,
                TaskField::Speed,
            ]
        );
    }

    #[test]
    fn test_unchanged_values_are_not_notified() {
        let t = task();
        t.set_status(TransferStatus::Connecting);
        let seen = record(&t);
        t.set_status(TransferStatus::Connecting);
        t.set_total_bytes(0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_completion_zeroes_speed_and_notifies() {
        let t = task();
        t.set_speed(1000.0);
        let seen = record(&t);
        t.mark_completed();
        assert!(t.is_completed());
        assert_eq!(t.speed(), 0.0);
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec![
                TaskField::Speed,
                TaskField::Progress,
                TaskField::Status,
                TaskField::Completed
            ]
        );
    }

    #[test]
    fn test_terminal_states_are_mutually_exclusive() {
        let t = task();
        t.mark_cancelled();
        t.mark_failed("late error");
        t.mark_completed();
        assert!(t.is_cancelled());
        assert!(!t.is_completed());
        assert!(t.error_message().is_empty());
    }

    #[test]
    fn test_no_writes_after_terminal_state() {
        let t = task();
        t.set_total_bytes(100);
        t.set_downloaded_bytes(40);
        t.mark_failed("connection reset");
        let seen = record(&t);
        t.set_speed(99.0);
        t.set_downloaded_bytes(80);
        assert_eq!(t.speed(), 0.0);
        assert_eq!(t.downloaded_bytes(), 40);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failure_records_message() {
        let t = task();
        t.mark_failed("HTTP 404 downloading x");
        assert_eq!(t.status(), TransferStatus::Failed);
        assert_eq!(t.error_message(), "HTTP 404 downloading x");
        assert_eq!(t.status_text(), "Download failed");
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let t = task();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = t.subscribe(move |_, _| *sink.lock().unwrap() += 1);
        t.set_downloaded_bytes(1);
        assert!(t.unsubscribe(id));
        assert!(!t.unsubscribe(id));
        t.set_downloaded_bytes(2);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_callback_can_read_task_without_deadlock() {
        let t = task();
        let texts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&texts);
        t.subscribe(move |task, field| {
            if field == TaskField::DownloadedBytes {
                sink.lock().unwrap().push(task.downloaded_text());
            }
        });
        t.set_total_bytes(2048);
        t.set_downloaded_bytes(1024);
        assert_eq!(texts.lock().unwrap().clone(), vec!["1 KB / 2 KB".to_string()]);
    }

    #[test]
    fn test_downloaded_text_unknown_total() {
        let t = task();
        t.set_downloaded_bytes(512);
        assert_eq!(t.downloaded_text(), "512 B / ?");
    }

    #[test]
    fn test_speed_text_suffix() {
        let t = task();
        t.set_speed(2048.0);
        assert_eq!(t.speed_text(), "2 KB/s");
    }

    #[test]
    fn test_snapshot_serializes() {
        let t = task();
        t.set_total_bytes(10);
        let json = serde_json::to_value(t.snapshot()).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total_bytes"], 10);
        assert_eq!(json["file_name"], "movie.mp4");
    }
}
