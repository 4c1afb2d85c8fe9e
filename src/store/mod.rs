//! State containers shared by front ends.
//!
//! Each store owns its data source and its state; share one across threads
//! with an `Arc`.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod map;
pub mod theme;

/// Lock, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
