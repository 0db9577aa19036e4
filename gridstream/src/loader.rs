//! The loader abstraction: how cell payloads are produced.

use crate::error::LoadError;

/// Produces the payload for a cell key.
///
/// A loader is a pure function from key to value that may fail. It is
/// supplied once per cache population and stored on the entry it created,
/// so background fetchers and blocking accesses run the same code path.
///
/// Any `Fn(&K) -> Result<V, LoadError> + Send + Sync` closure is a loader:
///
/// ```
/// use gridstream::{LoadError, Loader};
///
/// let loader = |key: &u64| -> Result<Vec<u8>, LoadError> {
///     Ok(key.to_le_bytes().to_vec())
/// };
/// assert_eq!(loader.load(&1).unwrap(), 1u64.to_le_bytes().to_vec());
/// ```
pub trait Loader<K, V>: Send + Sync {
    /// Load the payload for `key`.
    fn load(&self, key: &K) -> Result<V, LoadError>;
}

impl<K, V, F> Loader<K, V> for F
where
    F: Fn(&K) -> Result<V, LoadError> + Send + Sync,
{
    fn load(&self, key: &K) -> Result<V, LoadError> {
        (self)(key)
    }
}
