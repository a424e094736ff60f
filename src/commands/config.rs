//! Config command handler: show effective configuration.

use crate::app::settings::AppConfig;
use crate::app_config::LoadedConfig;

pub fn run_config_show_command(loaded: &LoadedConfig, config: &AppConfig) {
    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("data_dir = {}", config.data_dir.display());
    println!("output_dir = {}", config.output_dir.display());
    println!("connect_timeout_secs = {}", config.connect_timeout.as_secs());
    println!("transfer_timeout_secs = {}", config.transfer_timeout.as_secs());
    println!("chunk_size = {}", config.chunk_size);
    println!("verbosity = {}", config.verbosity.as_str());
}
