//! File registry backed by the local file system.
//!
//! Subscriptions are served by a single debounced notify watcher. Each subscribed path is
//! watched non-recursively. Only events on the path itself count: a non-access event becomes
//! `Changed`, or `Destroyed` if the path no longer exists afterwards. Activity among a
//! directory's children doesn't change how its row looks, so it's ignored.
//!
//! Handles are cached weakly by path. Two lookups give the same handle while anyone holds
//! one, and dead entries are pruned on the next cache miss.

use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::icons::{icon_name_for, lookup_theme_icon};
use super::{
    FileEvent, FileEventKind, FileHandle, FileId, FileInner, FileRegistry, Icon, LaunchMode, RegistryError,
    SubscriptionId, name_from_path, path_from_uri,
};
use crate::ignore_poison::IgnorePoison;

/// Default debounce duration in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

struct Subscription {
    file: FileHandle,
    sink: Sender<FileEvent>,
}

#[derive(Default)]
struct State {
    next_file_id: u64,
    next_subscription_id: u64,
    /// One live handle per path, so repeated lookups give identical handles.
    handles: HashMap<PathBuf, Weak<FileInner>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    /// Number of subscriptions per watched path.
    watch_counts: HashMap<PathBuf, usize>,
}

/// A registry over the real file system.
pub struct LocalFileRegistry {
    home: Option<PathBuf>,
    icon_theme: Option<String>,
    debounce: Duration,
    state: Arc<Mutex<State>>,
    /// Created on the first subscription.
    debouncer: Mutex<Option<Debouncer<RecommendedWatcher, RecommendedCache>>>,
}

impl LocalFileRegistry {
    /// Creates a registry using the user's real home directory and default settings.
    pub fn new() -> Self {
        Self::with_options(dirs::home_dir(), Duration::from_millis(DEFAULT_DEBOUNCE_MS), None)
    }

    /// Creates a registry with explicit settings.
    ///
    /// # Arguments
    /// * `home` - Directory reported as home (and given the home icon)
    /// * `debounce` - How long to coalesce file system events before delivering them
    /// * `icon_theme` - XDG icon theme to search first, or `None` for the system default
    pub fn with_options(home: Option<PathBuf>, debounce: Duration, icon_theme: Option<String>) -> Self {
        Self {
            home,
            icon_theme,
            debounce,
            state: Arc::new(Mutex::new(State::default())),
            debouncer: Mutex::new(None),
        }
    }

    fn handle_for(&self, path: &Path) -> FileHandle {
        let mut state = self.state.lock_ignore_poison();
        if let Some(handle) = state.handles.get(path).and_then(FileHandle::upgrade) {
            return handle;
        }
        state.handles.retain(|_, inner| inner.strong_count() > 0);
        state.next_file_id += 1;
        let handle = FileHandle::new(FileId(state.next_file_id), path);
        state.handles.insert(path.to_path_buf(), handle.downgrade());
        handle
    }

    #[cfg(test)]
    pub(crate) fn cached_handle_count(&self) -> usize {
        self.state.lock_ignore_poison().handles.len()
    }

    /// Starts watching `path` unless another subscription already does.
    fn watch(&self, path: &Path) -> Result<(), RegistryError> {
        let mut debouncer_guard = self.debouncer.lock_ignore_poison();
        if debouncer_guard.is_none() {
            let state = Arc::clone(&self.state);
            let debouncer = new_debouncer(
                self.debounce,
                None, // No tick rate limit
                move |result: DebounceEventResult| handle_events(&state, result),
            )?;
            *debouncer_guard = Some(debouncer);
        }

        let already_watched = self.state.lock_ignore_poison().watch_counts.get(path).copied().unwrap_or(0) > 0;
        if !already_watched && let Some(debouncer) = debouncer_guard.as_mut() {
            debouncer.watch(path, RecursiveMode::NonRecursive)?;
            log::debug!("Registry: watching {}", path.display());
        }
        *self
            .state
            .lock_ignore_poison()
            .watch_counts
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        Ok(())
    }

    fn unwatch(&self, path: &Path) {
        let mut debouncer_guard = self.debouncer.lock_ignore_poison();
        let remaining = {
            let mut state = self.state.lock_ignore_poison();
            let Some(count) = state.watch_counts.get_mut(path) else {
                return;
            };
            *count -= 1;
            let remaining = *count;
            if remaining == 0 {
                state.watch_counts.remove(path);
            }
            remaining
        };

        if remaining == 0
            && let Some(debouncer) = debouncer_guard.as_mut()
        {
            // The path may already be gone, in which case the OS dropped the watch itself
            if let Err(e) = debouncer.unwatch(path) {
                log::debug!("Registry: unwatch {} failed: {}", path.display(), e);
            }
        }
    }
}

impl Default for LocalFileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes a debounced batch of notify events to the matching subscriptions.
fn handle_events(state: &Mutex<State>, result: DebounceEventResult) {
    let events = match result {
        Ok(events) => events,
        Err(errors) => {
            for e in errors {
                log::warn!("Registry: watcher error: {}", e);
            }
            return;
        }
    };

    let state = state.lock_ignore_poison();
    let mut pending: Vec<(SubscriptionId, FileEventKind)> = Vec::new();
    for event in &events {
        for path in &event.paths {
            for (id, subscription) in &state.subscriptions {
                let watched = subscription.file.path();
                let Some(kind) = classify(&event.kind, path, watched) else {
                    continue;
                };
                if !pending.contains(&(*id, kind)) {
                    pending.push((*id, kind));
                }
            }
        }
    }

    for (id, kind) in pending {
        let Some(subscription) = state.subscriptions.get(&id) else {
            continue;
        };
        let event = FileEvent {
            kind,
            file: subscription.file.clone(),
        };
        // A closed channel means the subscriber is gone and will unsubscribe shortly
        if subscription.sink.send(event).is_err() {
            log::debug!("Registry: subscriber for {} hung up", subscription.file.path().display());
        }
    }
}

/// What a notify event on `path` means for a subscription to `watched`, if anything.
pub(crate) fn classify(kind: &EventKind, path: &Path, watched: &Path) -> Option<FileEventKind> {
    if path != watched || kind.is_access() {
        return None;
    }
    if std::fs::symlink_metadata(watched).is_err() {
        Some(FileEventKind::Destroyed)
    } else {
        Some(FileEventKind::Changed)
    }
}

impl FileRegistry for LocalFileRegistry {
    fn resolve_uri(&self, uri: &str) -> Option<FileHandle> {
        self.resolve_path(&path_from_uri(uri)?)
    }

    fn resolve_path(&self, path: &Path) -> Option<FileHandle> {
        if !path.is_absolute() {
            return None;
        }
        // Follows symlinks, like stat: a dangling bookmark doesn't resolve
        std::fs::metadata(path).ok()?;
        Some(self.handle_for(path))
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn display_name(&self, file: &FileHandle) -> String {
        name_from_path(file.path())
    }

    fn load_icon(&self, file: &FileHandle, size: u32) -> Option<Icon> {
        let name = icon_name_for(file.path(), self.is_directory(file), self.home.as_deref());
        let icon_path = lookup_theme_icon(&name, size, self.icon_theme.as_deref())?;
        Icon::load(&icon_path, size)
    }

    fn is_directory(&self, file: &FileHandle) -> bool {
        file.path().is_dir()
    }

    #[cfg(unix)]
    fn is_executable(&self, file: &FileHandle) -> bool {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(file.path()).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    fn is_executable(&self, _file: &FileHandle) -> bool {
        false
    }

    fn subscribe(&self, file: &FileHandle, sink: Sender<FileEvent>) -> Result<SubscriptionId, RegistryError> {
        self.watch(file.path())?;
        let mut state = self.state.lock_ignore_poison();
        state.next_subscription_id += 1;
        let id = SubscriptionId(state.next_subscription_id);
        state.subscriptions.insert(
            id,
            Subscription {
                file: file.clone(),
                sink,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let removed = self.state.lock_ignore_poison().subscriptions.remove(&id);
        if let Some(subscription) = removed {
            self.unwatch(subscription.file.path());
        }
    }

    fn launch(&self, file: &FileHandle, mode: LaunchMode) -> Result<(), RegistryError> {
        let path = file.path();
        match mode {
            LaunchMode::Open => {
                open::that_detached(path).map_err(|e| RegistryError::Launch(format!("{}: {}", path.display(), e)))?;
            }
            LaunchMode::Execute => {
                if !self.is_executable(file) {
                    return Err(RegistryError::Launch(format!("{} is not executable", path.display())));
                }
                let mut command = std::process::Command::new(path);
                if let Some(parent) = path.parent() {
                    command.current_dir(parent);
                }
                command
                    .spawn()
                    .map_err(|e| RegistryError::Launch(format!("{}: {}", path.display(), e)))?;
            }
        }
        log::info!("Launched {} ({:?})", path.display(), mode);
        Ok(())
    }
}
