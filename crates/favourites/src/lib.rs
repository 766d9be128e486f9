// Deny unused code to catch dead code early
#![deny(unused)]
// Warn on unused dependencies to catch platform-specific cfg mismatches
#![warn(unused_crate_dependencies)]
// Warn on redundant path prefixes (e.g., std::path::Path when Path is imported)
#![warn(unused_qualifications)]
// Use log::* macros instead of println!/eprintln! for proper log level control
#![deny(clippy::print_stdout, clippy::print_stderr)]

//! Sidebar favourites for a file manager.
//!
//! - [`model::FavouritesModel`]: Home, Filesystem, a separator and the user's bookmarks,
//!   exposed through the [`model::TreeModel`] query interface with row notifications
//! - [`launcher::Launcher`]: opens or runs the selected files
//! - [`registry::FileRegistry`]: the file-system seam both of them go through

//noinspection RsUnusedImport
// env_logger is only initialized by the favourites-dump binary
use env_logger as _;

pub mod bookmarks;
pub mod config;
mod ignore_poison;
pub mod launcher;
pub mod model;
pub mod registry;

pub use config::{FavouritesConfig, load_config};
pub use launcher::{ActionGroup, LaunchReport, Launcher, LauncherAction, LauncherError, WidgetId};
pub use model::{FavouritesModel, ModelProvider, RowEvent, SharedModel, TreeIter, TreeModel, TreePath, dispatch_shared};
pub use registry::{FileHandle, FileRegistry, InMemoryFileRegistry, LocalFileRegistry, RegistryError};
