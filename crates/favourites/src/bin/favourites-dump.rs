//! Prints the sidebar favourites as JSON.
//!
//! Usage: `favourites-dump [--watch] [CONFIG_PATH]`
//!
//! Without a config path, `<config dir>/favourites/config.json` is used if present.
//! With `--watch`, keeps running and prints one JSON line per row event.

use favourites::config::default_config_path;
use favourites::{FavouritesConfig, FavouritesModel, LocalFileRegistry, RowEvent, load_config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often the watch loop drains file notifications
const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    // Respects RUST_LOG env var (default: info)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut watch = false;
    let mut config_path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--watch" => watch = true,
            "-h" | "--help" => {
                println!("Usage: favourites-dump [--watch] [CONFIG_PATH]");
                return ExitCode::SUCCESS;
            }
            _ => config_path = Some(PathBuf::from(arg)),
        }
    }

    let config = match config_path.or_else(default_config_path) {
        Some(path) => load_config(&path),
        None => FavouritesConfig::default(),
    };

    let registry = Arc::new(LocalFileRegistry::with_options(
        dirs::home_dir(),
        config.debounce(),
        config.icon_theme.clone(),
    ));
    let mut model = FavouritesModel::load(registry, config);

    match serde_json::to_string_pretty(&model.rows()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Failed to serialize favourites: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if !watch {
        return ExitCode::SUCCESS;
    }

    model.connect(|event: &RowEvent| match serde_json::to_string(event) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Failed to serialize row event: {}", e),
    });
    log::info!("Watching favourites, press Ctrl+C to stop");
    loop {
        model.dispatch_pending();
        thread::sleep(POLL_INTERVAL);
    }
}
