//! Cache entries: one per cell key.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::LoadError;
use crate::loader::Loader;

/// The tagged value cell of an entry.
///
/// Both variants carry a payload: `Invalid` holds the placeholder or a
/// previously published (now stale by definition of a fresh entry never
/// having loaded) value, `Valid` holds loader output. The whole state is
/// swapped under one write lock, so a reader always observes value and
/// validity together.
#[derive(Debug)]
enum EntryState<V> {
    /// Data not loaded; the payload is a placeholder or stale value.
    Invalid(V),
    /// Data loaded; the payload is the loader's output.
    Valid(V),
}

/// A single cached cell.
///
/// Entries are created by [`VolatileCache::put`](super::VolatileCache::put)
/// and shared as `Arc<Entry>` between the cache map, the fetch queue and
/// fetcher threads. The map is the owner of record: publication checks
/// that the entry is still the one registered under its key, so entries
/// detached by a cache clear can never resurrect their data.
pub struct Entry<K, V> {
    /// The key this entry was registered under.
    key: K,
    /// Value plus validity, swapped as one unit.
    state: RwLock<EntryState<V>>,
    /// Serializes loader invocations for this entry across blocking
    /// accesses and fetcher threads.
    load_guard: Mutex<()>,
    /// Produces the payload for this entry's key.
    loader: Box<dyn Loader<K, V>>,
    /// Frame number of the most recent access; drives the generation
    /// sweep.
    last_touch_frame: AtomicU64,
    /// Failed loader invocations; drives the bounded-retry policy.
    failed_attempts: AtomicU32,
}

impl<K, V> Entry<K, V> {
    /// Create an invalid entry holding `initial` as its placeholder.
    pub(crate) fn new<L>(key: K, initial: V, loader: L) -> Self
    where
        L: Loader<K, V> + 'static,
    {
        Self {
            key,
            state: RwLock::new(EntryState::Invalid(initial)),
            load_guard: Mutex::new(()),
            loader: Box::new(loader),
            last_touch_frame: AtomicU64::new(0),
            failed_attempts: AtomicU32::new(0),
        }
    }

    /// The key this entry is registered under.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V: Clone> Entry<K, V> {
    /// The current payload, valid or stale.
    pub fn value(&self) -> V {
        match &*self.state.read().unwrap() {
            EntryState::Invalid(v) | EntryState::Valid(v) => v.clone(),
        }
    }

    /// Whether the payload has been loaded.
    pub fn is_valid(&self) -> bool {
        matches!(&*self.state.read().unwrap(), EntryState::Valid(_))
    }

    /// Payload and validity read under one lock: never torn.
    pub fn snapshot(&self) -> (V, bool) {
        match &*self.state.read().unwrap() {
            EntryState::Invalid(v) => (v.clone(), false),
            EntryState::Valid(v) => (v.clone(), true),
        }
    }

    /// Swap in a loaded value, flipping the entry valid in the same step.
    pub(crate) fn publish(&self, value: V) {
        *self.state.write().unwrap() = EntryState::Valid(value);
    }

    /// Run this entry's loader. Callers must hold the load guard.
    pub(crate) fn run_loader(&self) -> Result<V, LoadError> {
        self.loader.load(&self.key)
    }

    /// The per-entry load serialization lock.
    pub(crate) fn load_guard(&self) -> &Mutex<()> {
        &self.load_guard
    }

    /// Stamp the entry as touched in `frame`.
    pub fn touch(&self, frame: u64) {
        self.last_touch_frame.store(frame, Ordering::Relaxed);
    }

    /// Frame number of the most recent access.
    pub fn last_touch(&self) -> u64 {
        self.last_touch_frame.load(Ordering::Relaxed)
    }

    /// Number of failed loader invocations for this entry.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    /// Record a failed loader invocation.
    pub(crate) fn record_failure(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn test_entry(initial: u32) -> Entry<u64, u32> {
        Entry::new(7u64, initial, |key: &u64| Ok::<_, LoadError>(*key as u32))
    }

    #[test]
    fn test_new_entry_is_invalid_with_placeholder() {
        let entry = test_entry(99);
        assert!(!entry.is_valid());
        assert_eq!(entry.value(), 99);
        assert_eq!(*entry.key(), 7);
        assert_eq!(entry.failed_attempts(), 0);
    }

    #[test]
    fn test_publish_flips_valid_and_value_together() {
        let entry = test_entry(0);
        entry.publish(42);
        let (value, valid) = entry.snapshot();
        assert!(valid);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_loader_uses_key() {
        let entry = test_entry(0);
        let _guard = entry.load_guard().lock().unwrap();
        assert_eq!(entry.run_loader().unwrap(), 7);
    }

    #[test]
    fn test_touch_and_last_touch() {
        let entry = test_entry(0);
        assert_eq!(entry.last_touch(), 0);
        entry.touch(12);
        assert_eq!(entry.last_touch(), 12);
    }

    #[test]
    fn test_record_failure_accumulates() {
        let entry = test_entry(0);
        entry.record_failure();
        entry.record_failure();
        assert_eq!(entry.failed_attempts(), 2);
    }

    #[test]
    fn test_snapshot_never_torn_under_concurrent_publish() {
        // Publish (i, i) pairs while readers assert the two halves of the
        // snapshot always agree.
        let entry = Arc::new(Entry::new(
            0u64,
            (0u64, 0u64),
            |_: &u64| Ok::<_, LoadError>((0, 0)),
        ));

        let writer = {
            let entry = Arc::clone(&entry);
            thread::spawn(move || {
                for i in 1..1000u64 {
                    entry.publish((i, i));
                }
            })
        };

        let mut readers = vec![];
        for _ in 0..4 {
            let entry = Arc::clone(&entry);
            readers.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let ((a, b), _valid) = entry.snapshot();
                    assert_eq!(a, b, "torn value observed");
                }
            }));
        }

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
