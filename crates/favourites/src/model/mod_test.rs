//! Tests for FavouritesModel.

use super::*;
use crate::registry::{Icon, InMemoryFileRegistry};
use std::cell::RefCell;
use std::rc::Rc;

const HOME: &str = "/home/alice";

struct Fixture {
    _dir: tempfile::TempDir,
    registry: Arc<InMemoryFileRegistry>,
    config: FavouritesConfig,
}

impl Fixture {
    /// Registry with `/`, the home directory and `/tmp`; bookmarks written to a temp file.
    fn new(bookmarks: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bookmarks_path = dir.path().join(".gtk-bookmarks");
        if let Some(contents) = bookmarks {
            std::fs::write(&bookmarks_path, contents).unwrap();
        }
        let registry = Arc::new(InMemoryFileRegistry::with_home(HOME));
        registry.add_directory("/tmp");
        let config = FavouritesConfig {
            bookmarks_path: Some(bookmarks_path),
            ..FavouritesConfig::default()
        };
        Self {
            _dir: dir,
            registry,
            config,
        }
    }

    fn model(&self) -> FavouritesModel {
        FavouritesModel::load(self.registry.clone(), self.config.clone())
    }

    fn file(&self, path: &str) -> FileHandle {
        self.registry.resolve_path(Path::new(path)).unwrap()
    }
}

fn names(model: &FavouritesModel) -> Vec<Option<String>> {
    model.rows().into_iter().map(|row| row.name).collect()
}

/// Connects a listener that records every event.
fn record_events(model: &mut FavouritesModel) -> Rc<RefCell<Vec<RowEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    model.connect(move |event: &RowEvent| sink.borrow_mut().push(event.clone()));
    events
}

// ========================================
// Construction
// ========================================

#[test]
fn test_missing_bookmark_file_gives_home_filesystem_separator() {
    let fixture = Fixture::new(None);
    let model = fixture.model();

    assert_eq!(model.len(), 3);
    assert_eq!(
        names(&model),
        vec![Some("Home".to_string()), Some("Filesystem".to_string()), None]
    );
    let rows = model.rows();
    assert_eq!(rows[0].path.as_deref(), Some(Path::new(HOME)));
    assert_eq!(rows[1].path.as_deref(), Some(Path::new("/")));
    assert!(rows[2].is_separator);
}

#[test]
fn test_empty_bookmark_file_gives_three_rows() {
    let fixture = Fixture::new(Some("\n   \n"));
    assert_eq!(fixture.model().len(), 3);
}

#[test]
fn test_unresolvable_bookmark_line_is_skipped() {
    let fixture = Fixture::new(Some("file:///tmp\nnot-a-uri\n"));
    let model = fixture.model();

    assert_eq!(model.len(), 4);
    let rows = model.rows();
    assert_eq!(rows[3].path.as_deref(), Some(Path::new("/tmp")));
    assert_eq!(rows[3].name.as_deref(), Some("tmp"));
}

#[test]
fn test_bookmarks_keep_file_order_and_labels() {
    let fixture = Fixture::new(None);
    fixture.registry.add_directory("/srv/data");
    std::fs::write(
        fixture.config.bookmarks_path.as_ref().unwrap(),
        "file:///srv/data Data Share\nfile:///missing\nfile:///tmp\n",
    )
    .unwrap();
    let model = fixture.model();

    assert_eq!(
        names(&model),
        vec![
            Some("Home".to_string()),
            Some("Filesystem".to_string()),
            None,
            Some("Data Share".to_string()),
            Some("tmp".to_string()),
        ]
    );
}

#[test]
fn test_no_home_directory_means_no_home_row() {
    let registry = Arc::new(InMemoryFileRegistry::new());
    registry.add_directory("/");
    let model = FavouritesModel::load(registry, FavouritesConfig::default());

    assert_eq!(names(&model), vec![Some("Filesystem".to_string()), None]);
}

#[test]
fn test_exactly_one_separator_row() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let model = fixture.model();

    let separators = model.rows().iter().filter(|row| row.is_separator).count();
    assert_eq!(separators, 1);
}

// ========================================
// Tree-model queries
// ========================================

#[test]
fn test_columns_and_flags() {
    let fixture = Fixture::new(None);
    let model = fixture.model();

    assert_eq!(model.n_columns(), 3);
    assert_eq!(model.column_type(0), ColumnType::Text);
    assert_eq!(model.column_type(1), ColumnType::Image);
    assert_eq!(model.column_type(2), ColumnType::Boolean);
    assert_eq!(model.flags(), ModelFlags::ITERS_PERSIST | ModelFlags::LIST_ONLY);
}

#[test]
#[should_panic(expected = "no column")]
fn test_column_type_out_of_range_panics() {
    let fixture = Fixture::new(None);
    fixture.model().column_type(3);
}

#[test]
#[should_panic(expected = "at least one index")]
fn test_get_iter_with_empty_path_panics() {
    let fixture = Fixture::new(None);
    fixture.model().get_iter(&TreePath::new());
}

#[test]
fn test_path_round_trip_for_every_row() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let model = fixture.model();

    for index in 0..model.len() {
        let iter = model.get_iter(&TreePath::from_index(index)).unwrap();
        assert_eq!(model.get_path(&iter), Some(TreePath::from_index(index)));
    }
    assert!(model.get_iter(&TreePath::from_index(model.len())).is_none());
    assert!(model.get_iter(&TreePath::from_index(model.len() + 5)).is_none());
}

#[test]
fn test_walking_with_iter_next_visits_every_row() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let model = fixture.model();

    let mut iter = model.iter_children(None).unwrap();
    let mut walked = 1;
    while model.iter_next(&mut iter) {
        walked += 1;
    }
    assert_eq!(walked, model.len());
    assert_eq!(model.iter_n_children(None), model.len());
    // At the last row, iter_next leaves the iterator in place
    assert_eq!(model.get_path(&iter), Some(TreePath::from_index(model.len() - 1)));
}

#[test]
fn test_flat_list_has_no_children_or_parents() {
    let fixture = Fixture::new(None);
    let model = fixture.model();
    let first = model.iter_children(None).unwrap();

    assert!(!model.iter_has_child(&first));
    assert_eq!(model.iter_n_children(Some(&first)), 0);
    assert!(model.iter_children(Some(&first)).is_none());
    assert!(model.iter_nth_child(Some(&first), 0).is_none());
    assert!(model.iter_parent(&first).is_none());
}

#[test]
fn test_iter_nth_child_at_root() {
    let fixture = Fixture::new(None);
    let model = fixture.model();

    let second = model.iter_nth_child(None, 1).unwrap();
    assert_eq!(model.get_path(&second), Some(TreePath::from_index(1)));
    assert!(model.iter_nth_child(None, 3).is_none());
}

#[test]
fn test_values_for_each_column() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let tmp = fixture.file("/tmp");
    fixture
        .registry
        .set_icon(&tmp, Icon::from_rgba(image::RgbaImage::new(16, 16)));
    let model = fixture.model();

    let home = model.get_iter(&TreePath::from_index(0)).unwrap();
    let separator = model.get_iter(&TreePath::from_index(2)).unwrap();
    let bookmark = model.get_iter(&TreePath::from_index(3)).unwrap();

    assert_eq!(model.get_value(&home, 0).as_text(), Some("Home"));
    assert_eq!(model.get_value(&home, 2), Value::Boolean(false));

    assert_eq!(model.get_value(&separator, 0), Value::Text(None));
    assert_eq!(model.get_value(&separator, 1), Value::Image(None));
    assert_eq!(model.get_value(&separator, 2), Value::Boolean(true));

    assert_eq!(model.value(&bookmark, Column::Name).as_text(), Some("tmp"));
    assert_eq!(model.value(&bookmark, Column::Icon).as_icon().map(|i| i.width()), Some(16));
}

#[test]
fn test_display_name_comes_from_registry() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    fixture.registry.set_display_name(&fixture.file("/tmp"), "Temporary");
    let model = fixture.model();

    let iter = model.get_iter(&TreePath::from_index(3)).unwrap();
    assert_eq!(model.value(&iter, Column::Name).as_text(), Some("Temporary"));
}

#[test]
fn test_iter_for_file() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let model = fixture.model();

    let iter = model.iter_for_file(&fixture.file("/tmp")).unwrap();
    assert_eq!(model.get_path(&iter), Some(TreePath::from_index(3)));
    let root = model.iter_for_file(&fixture.file("/")).unwrap();
    assert_eq!(model.get_path(&root), Some(TreePath::from_index(1)));

    let stranger = fixture.registry.add_directory("/never/bookmarked");
    assert!(model.iter_for_file(&stranger).is_none());
}

#[test]
fn test_iterator_from_another_model_is_rejected() {
    let fixture = Fixture::new(None);
    let model = fixture.model();
    let mut other = model.get_iter(&TreePath::from_index(0)).unwrap();
    other.stamp = model.stamp().wrapping_add(1);

    assert!(model.get_path(&other).is_none());
    assert!(!model.iter_next(&mut other));
    assert!(model.file_at(&other).is_none());
}

#[test]
#[should_panic(expected = "different favourites model")]
fn test_get_value_with_foreign_iterator_panics() {
    let fixture = Fixture::new(None);
    let model = fixture.model();
    let mut iter = model.get_iter(&TreePath::from_index(0)).unwrap();
    iter.stamp = model.stamp().wrapping_add(1);
    model.get_value(&iter, 0);
}

#[test]
fn test_drag_and_drop_is_refused() {
    let fixture = Fixture::new(None);
    let mut model = fixture.model();
    let path = TreePath::from_index(0);

    assert!(!model.row_drop_possible(&path, b"file:///tmp"));
    assert!(!model.drag_data_received(&path, b"file:///tmp"));
    assert_eq!(model.len(), 3);
}

// ========================================
// Change propagation
// ========================================

#[test]
fn test_changed_file_emits_one_row_changed() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let mut model = fixture.model();
    let events = record_events(&mut model);

    assert_eq!(fixture.registry.touch(&fixture.file("/tmp")), 1);
    assert_eq!(model.dispatch_pending(), 1);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    match &events[0] {
        RowEvent::Changed { path, iter } => {
            assert_eq!(*path, TreePath::from_index(3));
            assert_eq!(model.get_path(iter), Some(TreePath::from_index(3)));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_disconnected_listener_hears_nothing() {
    let fixture = Fixture::new(None);
    let mut model = fixture.model();
    let events = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&events);
    let id = model.connect(move |_: &RowEvent| *sink.borrow_mut() += 1);

    assert!(model.disconnect(id));
    assert!(!model.disconnect(id));
    fixture.registry.touch(&fixture.file(HOME));
    model.dispatch_pending();
    assert_eq!(*events.borrow(), 0);
}

#[test]
fn test_destroyed_file_removes_its_row() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    fixture.registry.add_directory("/srv");
    std::fs::write(
        fixture.config.bookmarks_path.as_ref().unwrap(),
        "file:///tmp\nfile:///srv\n",
    )
    .unwrap();
    let mut model = fixture.model();
    let events = record_events(&mut model);
    let tmp_iter = model.get_iter(&TreePath::from_index(3)).unwrap();
    let srv_iter = model.get_iter(&TreePath::from_index(4)).unwrap();
    assert_eq!(fixture.registry.subscription_count(), 4);

    fixture.registry.remove(&fixture.file("/tmp"));
    model.dispatch_pending();

    assert_eq!(model.len(), 4);
    assert_eq!(
        *events.borrow(),
        vec![RowEvent::Deleted {
            path: TreePath::from_index(3)
        }]
    );
    assert!(model.get_path(&tmp_iter).is_none());
    assert_eq!(model.get_path(&srv_iter), Some(TreePath::from_index(3)));
    assert_eq!(fixture.registry.subscription_count(), 3);
    assert_eq!(model.iter_n_children(None), 4);
}

#[test]
fn test_reused_slot_does_not_revive_old_iterator() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let mut model = fixture.model();
    let tmp = fixture.file("/tmp");
    let old = model.iter_for_file(&tmp).unwrap();

    model.handle_file_event(&FileEvent::destroyed(tmp.clone()));
    model.append(Some(tmp.clone()), None);

    let new = model.iter_for_file(&tmp).unwrap();
    assert_eq!(new.slot, old.slot);
    assert_ne!(new.generation, old.generation);
    assert!(model.get_path(&old).is_none());
    assert_eq!(model.get_path(&new), Some(TreePath::from_index(3)));
}

#[test]
fn test_destroyed_file_kept_when_removal_disabled() {
    let mut fixture = Fixture::new(Some("file:///tmp\n"));
    fixture.config.remove_destroyed = false;
    let mut model = fixture.model();
    let events = record_events(&mut model);

    fixture.registry.remove(&fixture.file("/tmp"));
    model.dispatch_pending();

    assert_eq!(model.len(), 4);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_dropping_model_unsubscribes_every_entry() {
    let fixture = Fixture::new(Some("file:///tmp\n"));
    let model = fixture.model();
    assert_eq!(fixture.registry.subscription_count(), 3);

    drop(model);
    assert_eq!(fixture.registry.subscription_count(), 0);
}

#[test]
fn test_rows_serialize_for_front_end() {
    let fixture = Fixture::new(None);
    let model = fixture.model();

    let json = serde_json::to_value(model.rows()).unwrap();
    assert_eq!(json[0]["name"], "Home");
    assert_eq!(json[2]["isSeparator"], true);
    assert!(json[2]["path"].is_null());
}
