//! Probe command handler: report the declared size of a URL.

use anyhow::Result;
use reelfetch::download::format_bytes;

use crate::app::settings::AppConfig;

#[allow(clippy::cast_precision_loss)]
pub async fn run_probe_command(url: &str, config: &AppConfig) -> Result<()> {
    let engine = config.engine()?;
    let size = engine.probe_size(url).await;
    if size == 0 {
        println!("size = unknown");
    } else {
        println!("size = {} ({size} bytes)", format_bytes(size as f64));
    }
    Ok(())
}
