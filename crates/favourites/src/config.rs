//! Favourites configuration.
//!
//! Read from a JSON file with camelCase keys. Every field has a default, so a partial or
//! missing file still gives a usable config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::DEFAULT_DEBOUNCE_MS;

/// Bookmark file name, relative to the home directory.
pub const BOOKMARKS_FILE_NAME: &str = ".gtk-bookmarks";

/// Default icon edge length in pixels.
pub const DEFAULT_ICON_SIZE: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouritesConfig {
    /// Bookmark file to read. `None` means `<home>/.gtk-bookmarks`.
    #[serde(default)]
    pub bookmarks_path: Option<PathBuf>,
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,
    /// Remove a favourite when its file is deleted. `false` keeps the row as it was.
    #[serde(default = "default_remove_destroyed")]
    pub remove_destroyed: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// XDG icon theme to search first.
    #[serde(default)]
    pub icon_theme: Option<String>,
}

fn default_icon_size() -> u32 {
    DEFAULT_ICON_SIZE
}

fn default_remove_destroyed() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for FavouritesConfig {
    fn default() -> Self {
        Self {
            bookmarks_path: None,
            icon_size: DEFAULT_ICON_SIZE,
            remove_destroyed: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            icon_theme: None,
        }
    }
}

impl FavouritesConfig {
    /// The bookmark file to read, given the user's home directory.
    pub fn bookmarks_file(&self, home: Option<&Path>) -> Option<PathBuf> {
        match &self.bookmarks_path {
            Some(path) => Some(path.clone()),
            None => home.map(|h| h.join(BOOKMARKS_FILE_NAME)),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Loads the config from `path`.
/// Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> FavouritesConfig {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::debug!("Config: {} not readable ({}), using defaults", path.display(), e);
            return FavouritesConfig::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Config: failed to parse {}: {}", path.display(), e);
            FavouritesConfig::default()
        }
    }
}

/// Default config location: `<config dir>/favourites/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("favourites").join("config.json"))
}
