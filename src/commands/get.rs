//! Get command handler: download a video (and subtitle) with live progress.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use reelfetch::download::{MediaReport, MediaRequest, TransferTask, fetch_media};
use reelfetch::library::{HistoryStore, VideoItem};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::progress::TaskProgress;
use crate::app::settings::AppConfig;
use crate::cli::GetArgs;

/// Runs one download. Returns whether the video was saved.
pub async fn run_get_command(args: &GetArgs, config: &AppConfig, quiet: bool) -> Result<bool> {
    let engine = config.engine()?;
    let mut request = MediaRequest::new(&args.url, config.output_dir());
    if let Some(subtitle) = &args.subtitle {
        request = request.with_subtitle(subtitle);
    }
    if let Some(name) = args.name.as_ref().or(args.title.as_ref()) {
        request = request.with_file_name(name);
    }
    debug!(?request, "media request built");

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling download");
                cancel.cancel();
            }
        })
    };

    let show_progress = !quiet && std::io::stderr().is_terminal();
    let mut bars: Vec<TaskProgress> = Vec::new();
    let report = fetch_media(&engine, &request, &cancel, |task: &Arc<TransferTask>| {
        bars.push(TaskProgress::attach(task, show_progress));
    })
    .await;
    drop(bars);
    ctrl_c.abort();

    record_history(config, args, &report);
    println!("{}", report.summary());
    Ok(report.success)
}

fn record_history(config: &AppConfig, args: &GetArgs, report: &MediaReport) {
    let video = &report.video;
    let mut item =
        VideoItem::new(&args.url, args.title.as_deref()).with_subtitle(args.subtitle.clone());
    if report.success {
        item.is_downloaded = true;
        item.file_size = video.downloaded_bytes();
        item.local_video_path = Some(video.save_path().to_path_buf());
        item.local_subtitle_path = report.subtitle_path().map(std::path::Path::to_path_buf);
    }

    let mut history = HistoryStore::open(config.history_path());
    if let Err(error) = history.record(item) {
        warn!(error = %error, "could not update history");
    }
}
