//! Shared favourites model for all sidebar views.
//!
//! The provider is owned by the application's setup code. Every view asks it for the
//! default model and gets the same instance while any view still holds one. Once the
//! last holder drops it, the model unsubscribes from its files, and the next request
//! builds a fresh model with a new stamp.
//!
//! File notifications for a shared model are dispatched with `dispatch_shared`, which
//! releases the model before calling listeners so they can read it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::{FavouritesModel, deliver};
use crate::config::FavouritesConfig;
use crate::registry::FileRegistry;

/// A favourites model shared between views on the UI thread.
pub type SharedModel = Rc<RefCell<FavouritesModel>>;

pub struct ModelProvider {
    registry: Arc<dyn FileRegistry>,
    config: FavouritesConfig,
    current: RefCell<Weak<RefCell<FavouritesModel>>>,
}

impl ModelProvider {
    pub fn new(registry: Arc<dyn FileRegistry>, config: FavouritesConfig) -> Self {
        Self {
            registry,
            config,
            current: RefCell::new(Weak::new()),
        }
    }

    /// Returns the live shared model, building it on first use or after it was released.
    pub fn get_default(&self) -> SharedModel {
        if let Some(model) = self.current.borrow().upgrade() {
            return model;
        }
        let model = Rc::new(RefCell::new(FavouritesModel::load(
            Arc::clone(&self.registry),
            self.config.clone(),
        )));
        *self.current.borrow_mut() = Rc::downgrade(&model);
        model
    }

    /// Whether some view still holds the shared model.
    pub fn is_alive(&self) -> bool {
        self.current.borrow().strong_count() > 0
    }

    pub fn registry(&self) -> &Arc<dyn FileRegistry> {
        &self.registry
    }
}

/// Handles queued file notifications for a shared model, then calls its listeners with
/// the model unborrowed. Returns how many notifications were handled.
pub fn dispatch_shared(model: &SharedModel) -> usize {
    let (handled, events, listeners) = {
        let mut model = model.borrow_mut();
        let handled = model.apply_pending();
        let (events, listeners) = model.take_row_events();
        (handled, events, listeners)
    };
    deliver(&events, &listeners);
    handled
}
