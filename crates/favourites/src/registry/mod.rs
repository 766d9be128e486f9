//! File registry abstraction.
//!
//! The favourites model and the launcher never touch the file system directly. They go
//! through a `FileRegistry`, which turns URIs and paths into shared `FileHandle`s, answers
//! display-name and icon queries, delivers change notifications, and launches files.
//!
//! Implementations:
//! - `LocalFileRegistry`: the real local file system, watched with notify
//! - `InMemoryFileRegistry`: a hand-driven registry for tests

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::sync::mpsc::Sender;

mod icons;
mod in_memory;
mod local;

pub use icons::Icon;
pub use in_memory::InMemoryFileRegistry;
pub use local::{DEFAULT_DEBOUNCE_MS, LocalFileRegistry};

/// Identity of a file within one registry. Two handles for the same path share an ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub u64);

pub(crate) struct FileInner {
    id: FileId,
    path: PathBuf,
}

/// A shared reference to a file known to a registry.
///
/// Cloning is cheap. Equality is identity: handles compare equal only when the
/// registry issued them for the same file.
#[derive(Clone)]
pub struct FileHandle(Arc<FileInner>);

impl FileHandle {
    pub(crate) fn new(id: FileId, path: impl Into<PathBuf>) -> Self {
        Self(Arc::new(FileInner { id, path: path.into() }))
    }

    pub(crate) fn downgrade(&self) -> Weak<FileInner> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(inner: &Weak<FileInner>) -> Option<Self> {
        inner.upgrade().map(Self)
    }

    pub fn id(&self) -> FileId {
        self.0.id
    }

    pub fn path(&self) -> &Path {
        &self.0.path
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for FileHandle {}

impl std::hash::Hash for FileHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("id", &self.0.id.0)
            .field("path", &self.0.path)
            .finish()
    }
}

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// The file or its directory contents changed.
    Changed,
    /// The file no longer exists.
    Destroyed,
}

/// A notification delivered to a subscriber's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub file: FileHandle,
}

impl FileEvent {
    pub fn changed(file: FileHandle) -> Self {
        Self {
            kind: FileEventKind::Changed,
            file,
        }
    }

    pub fn destroyed(file: FileHandle) -> Self {
        Self {
            kind: FileEventKind::Destroyed,
            file,
        }
    }
}

/// Handle returned by `FileRegistry::subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// How a file should be launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LaunchMode {
    /// Open with the desktop's default handler.
    Open,
    /// Run the file itself as a program.
    Execute,
}

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Path or URI could not be resolved
    NotFound(String),
    /// Operation not supported by this registry
    NotSupported,
    /// The change watcher could not be set up
    Watch(String),
    /// Launching a file failed
    Launch(String),
    /// Generic I/O error
    Io(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::NotSupported => write!(f, "Operation not supported"),
            Self::Watch(msg) => write!(f, "Watch error: {}", msg),
            Self::Launch(msg) => write!(f, "Launch failed: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<notify::Error> for RegistryError {
    fn from(err: notify::Error) -> Self {
        Self::Watch(err.to_string())
    }
}

/// Trait for resolving, describing, watching and launching files.
///
/// Registries are shared between the favourites model and the launcher, so they're
/// `Send + Sync` and use interior mutability for their bookkeeping.
pub trait FileRegistry: Send + Sync {
    /// Resolves a URI (for example `file:///tmp`) to a handle.
    /// Returns `None` for malformed URIs, unsupported schemes, or missing files.
    fn resolve_uri(&self, uri: &str) -> Option<FileHandle>;

    /// Resolves an absolute path to a handle. Returns `None` if the file doesn't exist.
    fn resolve_path(&self, path: &Path) -> Option<FileHandle>;

    /// The user's home directory, if known.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Returns the name to show for a file (usually its last path component).
    fn display_name(&self, file: &FileHandle) -> String;

    /// Loads an icon for the file, scaled to fit `size`×`size` pixels.
    fn load_icon(&self, file: &FileHandle, size: u32) -> Option<Icon>;

    fn is_directory(&self, file: &FileHandle) -> bool;

    /// Returns true if the file is a regular file the user may run.
    fn is_executable(&self, file: &FileHandle) -> bool;

    /// Starts delivering `Changed`/`Destroyed` events for `file` into `sink`.
    fn subscribe(&self, file: &FileHandle, sink: Sender<FileEvent>) -> Result<SubscriptionId, RegistryError>;

    /// Stops a subscription. Unknown IDs are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    // ========================================
    // Optional: Default to NotSupported
    // ========================================

    fn launch(&self, file: &FileHandle, mode: LaunchMode) -> Result<(), RegistryError> {
        let _ = (file, mode);
        Err(RegistryError::NotSupported)
    }
}

/// Converts a `file://` URI to a local path. Other schemes and malformed URIs give `None`.
pub(crate) fn path_from_uri(uri: &str) -> Option<PathBuf> {
    let url = url::Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// Last path component as a display string, or the full path for roots like `/`.
pub(crate) fn name_from_path(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => path.to_string_lossy().to_string(),
    }
}
