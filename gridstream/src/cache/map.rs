//! The key-to-entry map with single-writer-wins installation, atomic
//! clearing and the generation sweep.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::cache::entry::Entry;
use crate::error::LoadError;
use crate::loader::Loader;
use crate::stats::CacheStats;

/// Outcome of a serialized load through [`VolatileCache::load_entry`].
#[derive(Debug)]
pub enum LoadOutcome<V> {
    /// The loader ran and its value was published into the entry.
    Loaded(V),
    /// Another thread published first; the current value is returned and
    /// the loader was not invoked again.
    AlreadyValid(V),
    /// The loader ran but the entry was no longer registered under its
    /// key (the cache was cleared); the result was not published.
    Discarded(V),
}

impl<V> LoadOutcome<V> {
    /// The payload regardless of how it was obtained.
    pub fn into_value(self) -> V {
        match self {
            Self::Loaded(v) | Self::AlreadyValid(v) | Self::Discarded(v) => v,
        }
    }

    /// Whether the loader ran and published during this call.
    pub fn was_published(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Key-to-entry map guaranteeing at most one live entry per key.
///
/// Readers share the lock; `put` racers for the same key all receive the
/// single installed entry, and exactly one loader invocation occurs per
/// load cycle thanks to the entry-level load guard.
pub struct VolatileCache<K, V> {
    map: RwLock<HashMap<K, Arc<Entry<K, V>>>>,
    stats: Arc<CacheStats>,
}

impl<K, V> VolatileCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache reporting into `stats`.
    pub fn new(stats: Arc<CacheStats>) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            stats,
        }
    }

    /// Install an entry for `key`, or return the existing one.
    ///
    /// Single-writer-wins: under concurrent calls for the same key,
    /// exactly one entry instance is installed; the losers' `initial`
    /// value and `loader` are discarded.
    pub fn put<L>(&self, key: K, initial: V, loader: L) -> Arc<Entry<K, V>>
    where
        L: Loader<K, V> + 'static,
    {
        // Fast path for the common repeated access.
        if let Some(entry) = self.map.read().unwrap().get(&key) {
            return Arc::clone(entry);
        }

        let mut map = self.map.write().unwrap();
        // Re-check: another writer may have won between the locks.
        if let Some(entry) = map.get(&key) {
            return Arc::clone(entry);
        }
        let entry = Arc::new(Entry::new(key.clone(), initial, loader));
        map.insert(key, Arc::clone(&entry));
        entry
    }

    /// The entry registered under `key`, if any. Never triggers a load.
    pub fn get(&self, key: &K) -> Option<Arc<Entry<K, V>>> {
        self.map.read().unwrap().get(key).map(Arc::clone)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.read().unwrap().is_empty()
    }

    /// Atomically detach every entry from the map.
    ///
    /// In-flight loads for detached entries complete, but their publish
    /// step fails the registration check and the results are dropped.
    pub fn clear(&self) {
        let detached = {
            let mut map = self.map.write().unwrap();
            let count = map.len();
            map.clear();
            count
        };
        debug!(detached, "cache cleared");
    }

    /// Whether `entry` is the instance currently registered under its key.
    pub fn is_current(&self, entry: &Arc<Entry<K, V>>) -> bool {
        self.map
            .read()
            .unwrap()
            .get(entry.key())
            .is_some_and(|registered| Arc::ptr_eq(registered, entry))
    }

    /// Run `entry`'s loader if it is still invalid, publishing the result
    /// if the entry is still registered.
    ///
    /// This is the single load path shared by blocking accesses and
    /// fetcher threads. The entry's load guard serializes racers, and the
    /// validity re-check under the guard keeps loader invocations to one
    /// per load cycle. On failure the entry stays invalid and its failure
    /// count is bumped.
    pub fn load_entry(&self, entry: &Arc<Entry<K, V>>) -> Result<LoadOutcome<V>, LoadError> {
        let _guard = entry.load_guard().lock().unwrap();

        let (value, valid) = entry.snapshot();
        if valid {
            return Ok(LoadOutcome::AlreadyValid(value));
        }

        match entry.run_loader() {
            Ok(value) => {
                if self.is_current(entry) {
                    entry.publish(value.clone());
                    Ok(LoadOutcome::Loaded(value))
                } else {
                    trace!("dropping load result for detached entry");
                    self.stats.record_discarded_publish();
                    Ok(LoadOutcome::Discarded(value))
                }
            }
            Err(err) => {
                entry.record_failure();
                self.stats.record_load_failure();
                Err(err)
            }
        }
    }

    /// Remove entries untouched for more than `keep_frames` frames, then
    /// enforce the optional entry cap by evicting the least recently
    /// touched entries.
    ///
    /// O(entries); intended to run from a single driver thread once per
    /// frame (or per sweep interval). Returns the number of removed
    /// entries.
    pub fn sweep(&self, current_frame: u64, keep_frames: u64, max_entries: Option<usize>) -> usize {
        let mut map = self.map.write().unwrap();
        let before = map.len();

        map.retain(|_, entry| current_frame.saturating_sub(entry.last_touch()) <= keep_frames);

        if let Some(cap) = max_entries {
            if map.len() > cap {
                let mut by_age: Vec<(K, u64)> = map
                    .iter()
                    .map(|(key, entry)| (key.clone(), entry.last_touch()))
                    .collect();
                by_age.sort_by_key(|(_, touched)| *touched);
                let excess = map.len() - cap;
                for (key, _) in by_age.into_iter().take(excess) {
                    map.remove(&key);
                }
            }
        }

        let removed = before - map.len();
        if removed > 0 {
            self.stats.record_swept(removed as u64);
            debug!(removed, remaining = map.len(), "cache sweep");
        }
        removed
    }
}
