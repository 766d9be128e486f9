//! In-memory file registry for testing.
//!
//! Files exist only once added. Change and destroy notifications are fired by hand with
//! `touch` and `remove`, so model tests are deterministic and never touch the disk.

use super::{
    FileEvent, FileHandle, FileId, FileRegistry, Icon, LaunchMode, RegistryError, SubscriptionId, name_from_path,
    path_from_uri,
};
use crate::ignore_poison::IgnorePoison;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

struct MemoryFile {
    handle: FileHandle,
    is_directory: bool,
    is_executable: bool,
    display_name: Option<String>,
    icon: Option<Icon>,
}

struct Subscription {
    file: FileId,
    sink: Sender<FileEvent>,
}

#[derive(Default)]
struct State {
    next_file_id: u64,
    next_subscription_id: u64,
    files: HashMap<PathBuf, MemoryFile>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    launched: Vec<(PathBuf, LaunchMode)>,
}

impl State {
    fn insert(&mut self, path: &Path, is_directory: bool, is_executable: bool) -> FileHandle {
        if let Some(existing) = self.files.get(path) {
            return existing.handle.clone();
        }
        self.next_file_id += 1;
        let handle = FileHandle::new(FileId(self.next_file_id), path);
        self.files.insert(
            path.to_path_buf(),
            MemoryFile {
                handle: handle.clone(),
                is_directory,
                is_executable,
                display_name: None,
                icon: None,
            },
        );
        handle
    }

    fn by_id(&self, id: FileId) -> Option<&MemoryFile> {
        self.files.values().find(|f| f.handle.id() == id)
    }

    fn notify(&self, event: &FileEvent) -> usize {
        let mut delivered = 0;
        for subscription in self.subscriptions.values() {
            if subscription.file == event.file.id() && subscription.sink.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// A registry that keeps its files in a map.
pub struct InMemoryFileRegistry {
    home: Option<PathBuf>,
    state: Mutex<State>,
}

impl InMemoryFileRegistry {
    /// Creates an empty registry with no home directory.
    pub fn new() -> Self {
        Self {
            home: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Creates a registry containing `/` and `home`, with `home` reported as the home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let registry = Self {
            home: Some(home.clone()),
            state: Mutex::new(State::default()),
        };
        registry.add_directory("/");
        registry.add_directory(&home);
        registry
    }

    pub fn add_directory(&self, path: impl AsRef<Path>) -> FileHandle {
        self.state.lock_ignore_poison().insert(path.as_ref(), true, false)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, is_executable: bool) -> FileHandle {
        self.state.lock_ignore_poison().insert(path.as_ref(), false, is_executable)
    }

    /// Overrides the display name reported for `file`.
    pub fn set_display_name(&self, file: &FileHandle, name: &str) {
        if let Some(entry) = self.state.lock_ignore_poison().files.get_mut(file.path()) {
            entry.display_name = Some(name.to_string());
        }
    }

    pub fn set_icon(&self, file: &FileHandle, icon: Icon) {
        if let Some(entry) = self.state.lock_ignore_poison().files.get_mut(file.path()) {
            entry.icon = Some(icon);
        }
    }

    /// Fires a `Changed` event for `file`. Returns the number of subscribers reached.
    pub fn touch(&self, file: &FileHandle) -> usize {
        self.state.lock_ignore_poison().notify(&FileEvent::changed(file.clone()))
    }

    /// Forgets `file` and fires a `Destroyed` event for it. Returns the number of subscribers reached.
    pub fn remove(&self, file: &FileHandle) -> usize {
        let mut state = self.state.lock_ignore_poison();
        state.files.remove(file.path());
        state.notify(&FileEvent::destroyed(file.clone()))
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock_ignore_poison().subscriptions.len()
    }

    /// Files passed to `launch`, in call order.
    pub fn launched(&self) -> Vec<(PathBuf, LaunchMode)> {
        self.state.lock_ignore_poison().launched.clone()
    }
}

impl Default for InMemoryFileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry for InMemoryFileRegistry {
    fn resolve_uri(&self, uri: &str) -> Option<FileHandle> {
        self.resolve_path(&path_from_uri(uri)?)
    }

    fn resolve_path(&self, path: &Path) -> Option<FileHandle> {
        self.state.lock_ignore_poison().files.get(path).map(|f| f.handle.clone())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn display_name(&self, file: &FileHandle) -> String {
        let state = self.state.lock_ignore_poison();
        state
            .by_id(file.id())
            .and_then(|f| f.display_name.clone())
            .unwrap_or_else(|| name_from_path(file.path()))
    }

    fn load_icon(&self, file: &FileHandle, _size: u32) -> Option<Icon> {
        self.state.lock_ignore_poison().by_id(file.id()).and_then(|f| f.icon.clone())
    }

    fn is_directory(&self, file: &FileHandle) -> bool {
        self.state.lock_ignore_poison().by_id(file.id()).is_some_and(|f| f.is_directory)
    }

    fn is_executable(&self, file: &FileHandle) -> bool {
        self.state
            .lock_ignore_poison()
            .by_id(file.id())
            .is_some_and(|f| !f.is_directory && f.is_executable)
    }

    fn subscribe(&self, file: &FileHandle, sink: Sender<FileEvent>) -> Result<SubscriptionId, RegistryError> {
        let mut state = self.state.lock_ignore_poison();
        if state.by_id(file.id()).is_none() {
            return Err(RegistryError::NotFound(file.path().display().to_string()));
        }
        state.next_subscription_id += 1;
        let id = SubscriptionId(state.next_subscription_id);
        state.subscriptions.insert(id, Subscription { file: file.id(), sink });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock_ignore_poison().subscriptions.remove(&id);
    }

    fn launch(&self, file: &FileHandle, mode: LaunchMode) -> Result<(), RegistryError> {
        let mut state = self.state.lock_ignore_poison();
        if state.by_id(file.id()).is_none() {
            return Err(RegistryError::NotFound(file.path().display().to_string()));
        }
        if mode == LaunchMode::Execute && !state.by_id(file.id()).is_some_and(|f| f.is_executable) {
            return Err(RegistryError::Launch(format!("{} is not executable", file.path().display())));
        }
        state.launched.push((file.path().to_path_buf(), mode));
        Ok(())
    }
}
