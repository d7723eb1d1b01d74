//! Eviction Handler
//!
//! Drops a cached collector set so the next request rebuilds it.

use crate::domain::services::CollectorCache;
use std::sync::Arc;

pub struct EvictionHandler {
    cache: Arc<CollectorCache>,
}

impl EvictionHandler {
    pub fn new(cache: Arc<CollectorCache>) -> Self {
        Self { cache }
    }

    /// Evict the entry cached under `path`. Idempotent.
    ///
    /// Returns whether an entry was present.
    pub fn evict(&self, path: &str) -> bool {
        let removed = self.cache.remove(path);
        if removed {
            tracing::debug!("evicted collector set: {}", path);
        } else {
            tracing::debug!("evict: nothing cached under {}", path);
        }
        removed
    }
}
