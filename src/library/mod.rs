//! Library data access for catalog items

pub mod artwork;
pub mod provider;

pub use artwork::{ArtworkSource, BlobRegistry, ImageSizing, ObjectUrl};
pub use provider::{FeedToken, LibraryProvider, LiveFeed};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
