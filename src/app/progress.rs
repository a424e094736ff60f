//! Terminal progress bar bound to a transfer task.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reelfetch::download::{SubscriptionId, TaskField, TransferTask};

const BAR_TEMPLATE: &str = "{spinner} {msg:<24} [{bar:30}] {prefix}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg:<24} {prefix}";

/// Mirrors one [`TransferTask`] into an indicatif bar until dropped.
///
/// The bar starts as a spinner and switches to a bounded bar once the
/// total size is known.
pub(crate) struct TaskProgress {
    task: Arc<TransferTask>,
    bar: ProgressBar,
    subscription: SubscriptionId,
}

impl TaskProgress {
    /// Attaches a bar to `task`; a hidden bar when `visible` is false.
    pub(crate) fn attach(task: &Arc<TransferTask>, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(task.file_name().to_string());
        bar.set_prefix(task.status_text());

        let handle = bar.clone();
        let subscription = task.subscribe(move |task, field| render(&handle, task, field));

        Self {
            task: Arc::clone(task),
            bar,
            subscription,
        }
    }

    #[cfg(test)]
    fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Drop for TaskProgress {
    fn drop(&mut self) {
        self.task.unsubscribe(self.subscription);
        self.bar.finish_and_clear();
    }
}

fn render(bar: &ProgressBar, task: &TransferTask, field: TaskField) {
    match field {
        TaskField::TotalBytes => {
            let total = task.total_bytes();
            if total > 0 {
                bar.set_length(total);
                bar.set_style(bar_style());
            }
        }
        TaskField::DownloadedBytes => bar.set_position(task.downloaded_bytes()),
        TaskField::Status | TaskField::Completed | TaskField::Cancelled | TaskField::ErrorMessage => {
            bar.set_message(format!("{} {}", task.file_name(), task.status_text()));
        }
        TaskField::Speed | TaskField::Progress => {}
    }
    bar.set_prefix(format!(
        "{} {} {}",
        task.progress_text(),
        task.downloaded_text(),
        task.speed_text()
    ));
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_and_drop_unsubscribes() {
        let task = Arc::new(TransferTask::new("a.mp4", "https://e.com/a.mp4", "/tmp/a.mp4"));
        let progress = TaskProgress::attach(&task, false);
        let id = progress.subscription;
        assert!(progress.bar().is_hidden());

        drop(progress);

        assert!(!task.unsubscribe(id), "subscription should already be gone");
    }
}
