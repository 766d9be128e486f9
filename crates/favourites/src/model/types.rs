//! Types of the tree-model interface: paths, iterators, columns, values, row events.

use serde::Serialize;
use std::fmt;

use crate::registry::Icon;

bitflags::bitflags! {
    /// Capabilities a model advertises to views.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModelFlags: u32 {
        /// Iterators stay valid as long as the row they point to exists.
        const ITERS_PERSIST = 1 << 0;
        /// Rows never have children.
        const LIST_ONLY = 1 << 1;
    }
}

/// Position of a row. Flat models only use the first index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    /// An empty path (depth 0). Passing it to `get_iter` is a contract violation.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_index(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn from_indices(indices: impl Into<Vec<usize>>) -> Self {
        Self(indices.into())
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join(":"))
    }
}

/// Opaque token pointing at one row of one model instance.
///
/// The stamp ties it to a model; the slot generation ties it to one entry, so a token
/// for a removed row or a rebuilt model is rejected instead of pointing at something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeIter {
    pub(crate) stamp: u32,
    pub(crate) slot: usize,
    pub(crate) generation: u32,
}

impl TreeIter {
    pub fn stamp(&self) -> u32 {
        self.stamp
    }
}

/// Data type stored in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    Text,
    Image,
    Boolean,
}

/// The favourites model's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name = 0,
    Icon = 1,
    Separator = 2,
}

impl Column {
    pub const COUNT: usize = 3;
    pub const ALL: [Column; Column::COUNT] = [Column::Name, Column::Icon, Column::Separator];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Self::Name => ColumnType::Text,
            Self::Icon => ColumnType::Image,
            Self::Separator => ColumnType::Boolean,
        }
    }
}

impl TryFrom<usize> for Column {
    type Error = usize;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(index).copied().ok_or(index)
    }
}

/// A cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(Option<String>),
    Image(Option<Icon>),
    Boolean(bool),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => text.as_deref(),
            _ => None,
        }
    }

    pub fn as_icon(&self) -> Option<&Icon> {
        match self {
            Self::Image(icon) => icon.as_ref(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// Notification sent to views when rows change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RowEvent {
    /// The row's name or icon may have changed.
    Changed { path: TreePath, iter: TreeIter },
    /// The row is gone. `path` is where it was.
    Deleted { path: TreePath },
}

/// Receives row notifications from a model.
pub trait RowListener {
    fn row_event(&self, event: &RowEvent);
}

impl<F: Fn(&RowEvent)> RowListener for F {
    fn row_event(&self, event: &RowEvent) {
        self(event)
    }
}

/// Returned by `connect`, used to disconnect a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// The query interface views use to walk a model.
///
/// Failures are `None`/`false`. Passing an out-of-range column, a depth-0 path, or a
/// stale iterator to `get_value` is a programming error and panics.
pub trait TreeModel {
    fn flags(&self) -> ModelFlags;

    fn n_columns(&self) -> usize;

    /// Panics if `index >= n_columns()`.
    fn column_type(&self, index: usize) -> ColumnType;

    /// Returns the iterator for the row at `path`, or `None` past the last row.
    fn get_iter(&self, path: &TreePath) -> Option<TreeIter>;

    /// Returns the row position of `iter`, or `None` if the iterator is stale.
    fn get_path(&self, iter: &TreeIter) -> Option<TreePath>;

    fn get_value(&self, iter: &TreeIter, column: usize) -> Value;

    /// Moves `iter` to the next row. Returns false (leaving `iter` as it was) at the last row.
    fn iter_next(&self, iter: &mut TreeIter) -> bool;

    /// First child of `parent`, or of the root level when `parent` is `None`.
    fn iter_children(&self, parent: Option<&TreeIter>) -> Option<TreeIter>;

    fn iter_has_child(&self, iter: &TreeIter) -> bool;

    /// Number of children of `iter`, or of the root level when `iter` is `None`.
    fn iter_n_children(&self, iter: Option<&TreeIter>) -> usize;

    fn iter_nth_child(&self, parent: Option<&TreeIter>, n: usize) -> Option<TreeIter>;

    fn iter_parent(&self, child: &TreeIter) -> Option<TreeIter>;
}

/// Drop target side of drag-and-drop between rows.
pub trait TreeDragDest {
    /// Whether `data` could be dropped before the row at `path`.
    fn row_drop_possible(&self, path: &TreePath, data: &[u8]) -> bool;

    /// Inserts `data` before the row at `path`. Returns true on success.
    fn drag_data_received(&mut self, path: &TreePath, data: &[u8]) -> bool;
}
