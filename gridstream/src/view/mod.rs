//! Grid-index-addressable accessor over a cache system.

mod resolver;

pub(crate) use resolver::resolve_access;

use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::cache::Entry;
use crate::error::{CacheError, LoadError};
use crate::hints::CacheHints;
use crate::system::CacheSystem;

/// Maps flat grid indices to cache keys and cell payloads.
///
/// This is the seam between the engine and the dataset: how indices
/// translate to keys (resolution level, cell coordinate, timepoint, …)
/// and how a cell's payload is produced stay entirely on the
/// application's side. `placeholder` supplies the initial value an entry
/// carries until its first load completes — typically an empty or
/// lower-resolution stand-in the renderer can draw immediately.
pub trait CellSource<K, V>: Send + Sync {
    /// The cache key for grid index `index`.
    fn key_of(&self, index: u64) -> K;

    /// Produce the payload for grid index `index`. May fail.
    fn load_cell(&self, index: u64) -> Result<V, LoadError>;

    /// The initial value shown while `index` is not yet loaded.
    fn placeholder(&self, index: u64) -> V;
}

/// Renderer-facing accessor: `get(index)` with the view's current hints.
///
/// Multiple views may share one [`CacheSystem`], e.g. one view per
/// resolution level with different priorities. The view-wide hints are
/// swapped wholesale via [`set_hints`](Self::set_hints), so concurrent
/// readers observe either the old or the new hints set in full.
pub struct CacheView<K, V> {
    system: Arc<CacheSystem<K, V>>,
    source: Arc<dyn CellSource<K, V>>,
    hints: RwLock<Arc<CacheHints>>,
}

impl<K, V> CacheView<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a view over `system` reading cells from `source`.
    pub fn new(
        system: Arc<CacheSystem<K, V>>,
        source: Arc<dyn CellSource<K, V>>,
        hints: CacheHints,
    ) -> Result<Self, CacheError> {
        validate_hints(&system, &hints)?;
        Ok(Self {
            system,
            source,
            hints: RwLock::new(Arc::new(hints)),
        })
    }

    /// Replace the view-wide hints; takes effect on the next access.
    pub fn set_hints(&self, hints: CacheHints) -> Result<(), CacheError> {
        validate_hints(&self.system, &hints)?;
        *self.hints.write().unwrap() = Arc::new(hints);
        Ok(())
    }

    /// The view's current hints.
    pub fn hints(&self) -> CacheHints {
        **self.hints.read().unwrap()
    }

    /// Access `index` with the view's current hints.
    pub fn try_get(&self, index: u64) -> Result<V, LoadError> {
        let hints = self.hints();
        self.try_get_with_hints(index, &hints)
    }

    /// Access `index` with explicit per-access hints.
    pub fn try_get_with_hints(&self, index: u64, hints: &CacheHints) -> Result<V, LoadError> {
        let entry = self.entry_for(index);
        resolve_access(&self.system, &entry, hints)
    }

    /// Access `index` with the view's current hints.
    ///
    /// Unchecked convenience for renderers whose loaders cannot fail:
    /// a blocking-path loader error panics. Use [`try_get`](Self::try_get)
    /// to handle failures.
    pub fn get(&self, index: u64) -> V {
        self.try_get(index)
            .unwrap_or_else(|err| panic!("cell load failed for index {index}: {err}"))
    }

    /// Access `index` with explicit hints; panics on a blocking-path
    /// loader error like [`get`](Self::get).
    pub fn get_with_hints(&self, index: u64, hints: &CacheHints) -> V {
        self.try_get_with_hints(index, hints)
            .unwrap_or_else(|err| panic!("cell load failed for index {index}: {err}"))
    }

    /// The cache entry backing `index`, installing it on first access.
    fn entry_for(&self, index: u64) -> Arc<Entry<K, V>> {
        let key = self.source.key_of(index);
        if let Some(entry) = self.system.cache().get(&key) {
            return entry;
        }
        let initial = self.source.placeholder(index);
        let source = Arc::clone(&self.source);
        self.system
            .cache()
            .put(key, initial, move |_key: &K| source.load_cell(index))
    }
}

fn validate_hints<K, V>(system: &CacheSystem<K, V>, hints: &CacheHints) -> Result<(), CacheError>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let levels = system.config().num_priorities;
    if hints.priority >= levels {
        return Err(CacheError::InvalidPriority {
            priority: hints.priority,
            levels,
        });
    }
    Ok(())
}
