//! Loaded image cache
//!
//! Maps a resource identifier (the widget's `src`) to decoded image data.
//! Entries are never evicted; writes for the same key are idempotent and the
//! last writer wins.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use crate::loader::ImageData;

static GLOBAL_CACHE: OnceLock<ImageCache> = OnceLock::new();

/// Shared handle to an image cache; clones see the same entries
#[derive(Clone, Default)]
pub struct ImageCache {
    entries: Arc<Mutex<FxHashMap<String, ImageData>>>,
}

impl ImageCache {
    /// A fresh, private cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> ImageCache {
        GLOBAL_CACHE.get_or_init(ImageCache::new).clone()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<String, ImageData>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<ImageData> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn insert(&self, key: impl Into<String>, data: ImageData) {
        self.lock().insert(key.into(), data);
    }

    pub fn remove(&self, key: &str) -> Option<ImageData> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache").field("len", &self.len()).finish()
    }
}
