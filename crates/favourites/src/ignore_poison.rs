//! Extension trait to ignore mutex poisoning.
//!
//! Registry bookkeeping (ID maps, subscription tables) stays consistent even if a watcher
//! callback panicked mid-update, so every lock in this crate goes through
//! `.lock_ignore_poison()` instead of `.lock().unwrap_or_else(|e| e.into_inner())`.

use std::sync::{Mutex, MutexGuard};

pub trait IgnorePoison<T> {
    /// Locks the mutex, ignoring poison.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnorePoison<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|e| e.into_inner())
    }
}
