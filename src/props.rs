//! Case-insensitive property lookup over JSON request objects.
//!
//! Request fields arrive with caller-chosen casing (`UserId`, `userid`,
//! `USERID`). Instead of rescanning the object on every lookup, the cache
//! builds one lowercased-name index per distinct source object and reuses it
//! for the lifetime of the request. The index maps normalized names back to
//! the original keys; values are read from the source object itself.
//!
//! Eviction is deliberately simple: when the map grows past
//! `MAX_CACHE_SIZE` entries it is cleared wholesale rather than trimmed.
//! Entries are keyed by object identity (allocation address), so a cleared
//! entry is just rebuilt on the next lookup against that object.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value as JsonValue};

use crate::MAX_CACHE_SIZE;

/// Shared, bounded index of case-insensitive property names.
///
/// Constructed once and injected into the engine (never ambient global
/// state), safe for concurrent readers across requests.
#[derive(Debug, Default)]
pub struct PropertyCache {
    indexes: RwLock<HashMap<usize, Arc<HashMap<String, String>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of cache counters, serializable for diagnostics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub cache_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name` in `object` ignoring case. Returns a clone of the
    /// value, or `None` when the object has no such property (or is not a
    /// JSON object at all).
    pub fn get(&self, object: &JsonValue, name: &str) -> Option<JsonValue> {
        let map = object.as_object()?;
        let index = self.index_for(object);
        let original = index.get(&name.to_lowercase())?;
        map.get(original).cloned()
    }

    /// True when the object carries the named property, ignoring case.
    pub fn contains(&self, object: &JsonValue, name: &str) -> bool {
        self.get(object, name).is_some()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            cache_size: self.indexes.read().expect("cache lock poisoned").len(),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    /// Drop every index and reset the counters.
    pub fn clear(&self) {
        self.indexes.write().expect("cache lock poisoned").clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Get-or-create the name index for one source object.
    ///
    /// Double-checked under the write lock so racing lookups build the index
    /// at most once; the read path takes no exclusive lock.
    ///
    /// Entries are keyed by allocation address, and an address can be
    /// recycled after its object is dropped. A hit is therefore only trusted
    /// after verifying the stored original names against the live object;
    /// a mismatch means the entry is stale and gets rebuilt.
    fn index_for(&self, object: &JsonValue) -> Arc<HashMap<String, String>> {
        let key = object as *const JsonValue as usize;
        let live = object.as_object();
        if let Some(index) = self.indexes.read().expect("cache lock poisoned").get(&key) {
            if index_matches(index, live) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(index);
            }
        }
        let mut indexes = self.indexes.write().expect("cache lock poisoned");
        if let Some(index) = indexes.get(&key) {
            if index_matches(index, live) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(index);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let built: HashMap<String, String> = object
            .as_object()
            .map(|m| {
                m.keys()
                    .map(|k| (k.to_lowercase(), k.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let built = Arc::new(built);
        indexes.insert(key, Arc::clone(&built));
        if indexes.len() > MAX_CACHE_SIZE {
            // Wholesale reset keeps the bound without bookkeeping per entry.
            indexes.clear();
            indexes.insert(key, Arc::clone(&built));
        }
        built
    }
}

/// True when a cached index still describes the given object: same key
/// count, and every stored original name is present verbatim.
fn index_matches(index: &HashMap<String, String>, object: Option<&Map<String, JsonValue>>) -> bool {
    match object {
        Some(map) => index.len() == map.len() && index.values().all(|name| map.contains_key(name)),
        None => index.is_empty(),
    }
}
