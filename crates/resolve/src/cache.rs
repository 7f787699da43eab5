use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Label -> Wikidata ID cache shared by all rows of a run.
///
/// Only successful lookups are stored; a `max_entries` of zero disables
/// storage while keeping the counters.
pub struct ResolutionCache {
    ids: Arc<DashMap<String, String>>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
    fallbacks: AtomicUsize,
}

impl ResolutionCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            ids: Arc::new(DashMap::new()),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            fallbacks: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, label: &str) -> Option<String> {
        let key = self.hash_text(label);
        let found = self.ids.get(&key).map(|r| r.value().clone());
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn set(&self, label: &str, id: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.ids.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self.ids.iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.ids.remove(&key);
            }
        }
        let key = self.hash_text(label);
        self.ids.insert(key, id);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn hash_text(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            ids_cached: self.ids.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub ids_cached: usize,
    pub hits: usize,
    pub misses: usize,
    pub fallbacks: usize,
}
