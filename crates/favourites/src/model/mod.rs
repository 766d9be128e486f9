//! Favourites list model backing the sidebar.
//!
//! Rows, top to bottom: Home, Filesystem, a separator, then the user's bookmarks in file
//! order. Entries live in an arena of slots chained by `next` indices. Each slot carries a
//! generation that is bumped when its entry is removed, and every `TreeIter` records the
//! model stamp and the slot generation it was issued for. A stale iterator therefore fails
//! the lookup instead of reaching a different entry.
//!
//! File notifications arrive on an mpsc channel fed by the registry. The owner drains it
//! on the UI thread with `dispatch_pending`, which turns them into `RowEvent`s for views.
//! Row events are queued while the model is being updated and delivered afterwards, so a
//! listener of a `SharedModel` (see `dispatch_shared`) can query the model it listens to.

mod provider;
mod types;

use serde::Serialize;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::bookmarks::read_bookmarks;
use crate::config::FavouritesConfig;
use crate::registry::{FileEvent, FileEventKind, FileHandle, FileRegistry, SubscriptionId};

pub use provider::{ModelProvider, SharedModel, dispatch_shared};
pub use types::{
    Column, ColumnType, ListenerId, ModelFlags, RowEvent, RowListener, TreeDragDest, TreeIter, TreeModel, TreePath,
    Value,
};

/// Label of the home directory row.
pub const HOME_LABEL: &str = "Home";
/// Label of the file system root row.
pub const FILESYSTEM_LABEL: &str = "Filesystem";

struct Favourite {
    /// `None` marks a separator row.
    file: Option<FileHandle>,
    /// Fixed label shown instead of the file's display name.
    special_name: Option<String>,
    subscription: Option<SubscriptionId>,
    next: Option<usize>,
}

struct Slot {
    generation: u32,
    entry: Option<Favourite>,
}

/// Serializable snapshot of one row, for front ends that don't walk iterators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteRow {
    pub name: Option<String>,
    pub path: Option<PathBuf>,
    pub is_separator: bool,
}

pub struct FavouritesModel {
    registry: Arc<dyn FileRegistry>,
    config: FavouritesConfig,
    stamp: u32,
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
    head: Option<usize>,
    count: usize,
    events_tx: Sender<FileEvent>,
    events_rx: Receiver<FileEvent>,
    listeners: Vec<(ListenerId, Rc<dyn RowListener>)>,
    next_listener_id: u64,
    /// Row events produced by the last update, not yet delivered.
    pending_rows: Vec<RowEvent>,
}

impl FavouritesModel {
    /// Builds the favourites list: bookmarks, then a separator, Filesystem and Home prepended.
    ///
    /// Bookmark lines that don't resolve are skipped. A missing bookmark file just means
    /// no bookmarks, and a missing root or home directory means no row for it.
    pub fn load(registry: Arc<dyn FileRegistry>, config: FavouritesConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let mut model = Self {
            registry,
            config,
            stamp: uuid::Uuid::new_v4().as_fields().0,
            slots: Vec::new(),
            free_slots: Vec::new(),
            head: None,
            count: 0,
            events_tx,
            events_rx,
            listeners: Vec::new(),
            next_listener_id: 0,
            pending_rows: Vec::new(),
        };

        let home = model.registry.home_dir();
        if let Some(bookmarks_path) = model.config.bookmarks_file(home.as_deref()) {
            for bookmark in read_bookmarks(&bookmarks_path) {
                match model.registry.resolve_uri(&bookmark.uri) {
                    Some(file) => model.append(Some(file), bookmark.label),
                    None => log::debug!("Favourites: skipping unresolvable bookmark {:?}", bookmark.uri),
                }
            }
        }

        model.prepend(None, None);

        if let Some(root) = model.registry.resolve_path(Path::new("/")) {
            model.prepend(Some(root), Some(FILESYSTEM_LABEL.to_string()));
        }

        if let Some(home) = home.as_deref().and_then(|h| model.registry.resolve_path(h)) {
            model.prepend(Some(home), Some(HOME_LABEL.to_string()));
        }

        log::info!("Favourites: loaded {} entries", model.count);
        model
    }

    /// Random per-instance stamp carried by every iterator this model issues.
    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn config(&self) -> &FavouritesConfig {
        &self.config
    }

    // ========================================
    // Arena bookkeeping
    // ========================================

    fn allocate(&mut self, entry: Favourite) -> usize {
        match self.free_slots.pop() {
            Some(index) => {
                self.slots[index].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        }
    }

    fn new_entry(&self, file: Option<FileHandle>, special_name: Option<String>) -> Favourite {
        let subscription = file.as_ref().and_then(|f| match self.registry.subscribe(f, self.events_tx.clone()) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Favourites: no change notifications for {}: {}", f.path().display(), e);
                None
            }
        });
        Favourite {
            file,
            special_name,
            subscription,
            next: None,
        }
    }

    fn append(&mut self, file: Option<FileHandle>, special_name: Option<String>) {
        let entry = self.new_entry(file, special_name);
        let tail = self.slot_indices().last();
        let index = self.allocate(entry);
        match tail {
            Some(tail) => {
                if let Some(tail_entry) = self.slots[tail].entry.as_mut() {
                    tail_entry.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.count += 1;
    }

    fn prepend(&mut self, file: Option<FileHandle>, special_name: Option<String>) {
        let mut entry = self.new_entry(file, special_name);
        entry.next = self.head;
        self.head = Some(self.allocate(entry));
        self.count += 1;
    }

    /// Unlinks the entry in `slot`, whose predecessor is `prev`, and frees the slot.
    fn unlink(&mut self, prev: Option<usize>, slot: usize) -> Option<Favourite> {
        let entry = self.slots[slot].entry.take()?;
        match prev {
            Some(prev) => {
                if let Some(prev_entry) = self.slots[prev].entry.as_mut() {
                    prev_entry.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        self.slots[slot].generation = self.slots[slot].generation.wrapping_add(1);
        self.free_slots.push(slot);
        self.count -= 1;
        Some(entry)
    }

    /// Slot indices in row order.
    fn slot_indices(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.head, |&index| self.slots[index].entry.as_ref().and_then(|e| e.next))
    }

    fn iter_for_slot(&self, slot: usize) -> TreeIter {
        TreeIter {
            stamp: self.stamp,
            slot,
            generation: self.slots[slot].generation,
        }
    }

    /// The entry `iter` points at, if the iterator is still valid for this model.
    fn entry(&self, iter: &TreeIter) -> Option<&Favourite> {
        if iter.stamp != self.stamp {
            return None;
        }
        let slot = self.slots.get(iter.slot)?;
        if slot.generation != iter.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    // ========================================
    // Queries beyond the tree-model interface
    // ========================================

    /// Returns the value of `column` for the row at `iter`. Panics on a stale iterator.
    pub fn value(&self, iter: &TreeIter, column: Column) -> Value {
        assert_eq!(iter.stamp, self.stamp, "iterator belongs to a different favourites model");
        let Some(entry) = self.entry(iter) else {
            panic!("iterator points at a removed favourite");
        };

        match column {
            Column::Name => {
                let name = match (&entry.special_name, &entry.file) {
                    (Some(name), _) => Some(name.clone()),
                    (None, Some(file)) => Some(self.registry.display_name(file)),
                    (None, None) => None,
                };
                Value::Text(name)
            }
            Column::Icon => Value::Image(
                entry
                    .file
                    .as_ref()
                    .and_then(|file| self.registry.load_icon(file, self.config.icon_size)),
            ),
            Column::Separator => Value::Boolean(entry.file.is_none()),
        }
    }

    /// Finds the first row whose file is `file`.
    pub fn iter_for_file(&self, file: &FileHandle) -> Option<TreeIter> {
        self.slot_indices()
            .find(|&index| self.slots[index].entry.as_ref().is_some_and(|e| e.file.as_ref() == Some(file)))
            .map(|index| self.iter_for_slot(index))
    }

    /// The file behind a row, or `None` for separators and stale iterators.
    pub fn file_at(&self, iter: &TreeIter) -> Option<FileHandle> {
        self.entry(iter).and_then(|e| e.file.clone())
    }

    /// Snapshot of all rows in order.
    pub fn rows(&self) -> Vec<FavouriteRow> {
        self.slot_indices()
            .map(|index| {
                let iter = self.iter_for_slot(index);
                FavouriteRow {
                    name: self.value(&iter, Column::Name).as_text().map(str::to_string),
                    path: self.file_at(&iter).map(|f| f.path().to_path_buf()),
                    is_separator: self.value(&iter, Column::Separator).as_bool().unwrap_or(false),
                }
            })
            .collect()
    }

    // ========================================
    // Change propagation
    // ========================================

    /// Registers a listener for row events.
    pub fn connect<L: RowListener + 'static>(&mut self, listener: L) -> ListenerId {
        self.next_listener_id += 1;
        let id = ListenerId(self.next_listener_id);
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it wasn't connected.
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Handles every file notification queued since the last call and delivers the
    /// resulting row events. Returns how many notifications were handled.
    ///
    /// Listeners run while `self` is still mutably borrowed. For a `SharedModel` whose
    /// listeners read the model, use `dispatch_shared` instead.
    pub fn dispatch_pending(&mut self) -> usize {
        let handled = self.apply_pending();
        let (events, listeners) = self.take_row_events();
        deliver(&events, &listeners);
        handled
    }

    /// Applies one file notification and delivers the resulting row events.
    pub fn handle_file_event(&mut self, event: &FileEvent) {
        self.apply_file_event(event);
        let (events, listeners) = self.take_row_events();
        deliver(&events, &listeners);
    }

    /// Applies queued file notifications without notifying anyone.
    pub(crate) fn apply_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    self.apply_file_event(&event);
                    handled += 1;
                }
                // The model holds a sender itself, so the channel never disconnects while we exist
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Takes the undelivered row events along with the listeners they are for.
    pub(crate) fn take_row_events(&mut self) -> (Vec<RowEvent>, Vec<Rc<dyn RowListener>>) {
        let events = mem::take(&mut self.pending_rows);
        if events.is_empty() {
            return (events, Vec::new());
        }
        let listeners = self.listeners.iter().map(|(_, listener)| Rc::clone(listener)).collect();
        (events, listeners)
    }

    fn apply_file_event(&mut self, event: &FileEvent) {
        match event.kind {
            FileEventKind::Changed => self.file_changed(&event.file),
            FileEventKind::Destroyed => self.file_destroyed(&event.file),
        }
    }

    fn file_changed(&mut self, file: &FileHandle) {
        let matches: Vec<(usize, usize)> = self
            .slot_indices()
            .enumerate()
            .filter(|&(_, index)| self.slots[index].entry.as_ref().is_some_and(|e| e.file.as_ref() == Some(file)))
            .collect();

        for (position, index) in matches {
            let iter = self.iter_for_slot(index);
            self.pending_rows.push(RowEvent::Changed {
                path: TreePath::from_index(position),
                iter,
            });
        }
    }

    fn file_destroyed(&mut self, file: &FileHandle) {
        if !self.config.remove_destroyed {
            log::debug!("Favourites: {} was deleted, keeping its row", file.path().display());
            return;
        }

        while let Some((position, prev, index)) = self.find_with_prev(file) {
            // Undelivered change events must not hand out an iterator that is about to go stale
            let removed = self.iter_for_slot(index);
            self.pending_rows
                .retain(|event| !matches!(event, RowEvent::Changed { iter, .. } if *iter == removed));
            if let Some(entry) = self.unlink(prev, index)
                && let Some(subscription) = entry.subscription
            {
                self.registry.unsubscribe(subscription);
            }
            log::info!("Favourites: removed {} (deleted)", file.path().display());
            self.pending_rows.push(RowEvent::Deleted {
                path: TreePath::from_index(position),
            });
        }
    }

    /// Position, predecessor slot and slot of the first entry holding `file`.
    fn find_with_prev(&self, file: &FileHandle) -> Option<(usize, Option<usize>, usize)> {
        let mut prev = None;
        for (position, index) in self.slot_indices().enumerate() {
            if self.slots[index].entry.as_ref().is_some_and(|e| e.file.as_ref() == Some(file)) {
                return Some((position, prev, index));
            }
            prev = Some(index);
        }
        None
    }
}

pub(crate) fn deliver(events: &[RowEvent], listeners: &[Rc<dyn RowListener>]) {
    for event in events {
        for listener in listeners {
            listener.row_event(event);
        }
    }
}

impl TreeModel for FavouritesModel {
    fn flags(&self) -> ModelFlags {
        ModelFlags::ITERS_PERSIST | ModelFlags::LIST_ONLY
    }

    fn n_columns(&self) -> usize {
        Column::COUNT
    }

    fn column_type(&self, index: usize) -> ColumnType {
        match Column::try_from(index) {
            Ok(column) => column.column_type(),
            Err(index) => panic!("favourites model has no column {}", index),
        }
    }

    fn get_iter(&self, path: &TreePath) -> Option<TreeIter> {
        assert!(path.depth() > 0, "tree path must have at least one index");
        let index = path.indices()[0];
        if index >= self.count {
            return None;
        }
        self.slot_indices().nth(index).map(|slot| self.iter_for_slot(slot))
    }

    fn get_path(&self, iter: &TreeIter) -> Option<TreePath> {
        self.entry(iter)?;
        self.slot_indices()
            .position(|index| index == iter.slot)
            .map(TreePath::from_index)
    }

    fn get_value(&self, iter: &TreeIter, column: usize) -> Value {
        match Column::try_from(column) {
            Ok(column) => self.value(iter, column),
            Err(index) => panic!("favourites model has no column {}", index),
        }
    }

    fn iter_next(&self, iter: &mut TreeIter) -> bool {
        let Some(next) = self.entry(iter).and_then(|e| e.next) else {
            return false;
        };
        *iter = self.iter_for_slot(next);
        true
    }

    fn iter_children(&self, parent: Option<&TreeIter>) -> Option<TreeIter> {
        if parent.is_some() {
            return None;
        }
        self.head.map(|head| self.iter_for_slot(head))
    }

    fn iter_has_child(&self, _iter: &TreeIter) -> bool {
        false
    }

    fn iter_n_children(&self, iter: Option<&TreeIter>) -> usize {
        match iter {
            None => self.count,
            Some(_) => 0,
        }
    }

    fn iter_nth_child(&self, parent: Option<&TreeIter>, n: usize) -> Option<TreeIter> {
        if parent.is_some() {
            return None;
        }
        self.slot_indices().nth(n).map(|slot| self.iter_for_slot(slot))
    }

    fn iter_parent(&self, _child: &TreeIter) -> Option<TreeIter> {
        None
    }
}

// TODO: Reordering bookmarks by drag-and-drop needs a bookmark file writer first.
impl TreeDragDest for FavouritesModel {
    fn row_drop_possible(&self, _path: &TreePath, _data: &[u8]) -> bool {
        false
    }

    fn drag_data_received(&mut self, _path: &TreePath, _data: &[u8]) -> bool {
        false
    }
}

impl Drop for FavouritesModel {
    fn drop(&mut self) {
        for slot in &self.slots {
            if let Some(subscription) = slot.entry.as_ref().and_then(|e| e.subscription) {
                self.registry.unsubscribe(subscription);
            }
        }
        log::debug!("Favourites: released {} entries", self.count);
    }
}

#[cfg(test)]
mod mod_test;
