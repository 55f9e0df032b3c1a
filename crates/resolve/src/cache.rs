use parking_lot::RwLock;
use repolens_primitives::DependencyValue;
use std::{collections::HashMap, sync::Arc};

/// Per-run cache of successfully resolved values, keyed by fingerprint.
///
/// Insertion is unconditional; the single-flight coalescer guarantees one
/// producer per fingerprint, so a last-writer-wins overwrite only ever
/// replaces a value with itself. There is no eviction and no negative
/// caching: errors leave the fingerprint free for the next caller.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, Arc<DependencyValue>>>,
}

impl ResultCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `fingerprint`, if any.
    pub fn get(&self, fingerprint: &str) -> Option<Arc<DependencyValue>> {
        self.entries.read().get(fingerprint).cloned()
    }

    /// Stores `value` under `fingerprint`.
    pub fn insert(&self, fingerprint: &str, value: Arc<DependencyValue>) {
        self.entries.write().insert(fingerprint.to_owned(), value);
    }

    /// Number of cached fingerprints.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
