//! Per-access loading-strategy resolution.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{Entry, LoadOutcome};
use crate::error::LoadError;
use crate::hints::{CacheHints, LoadingStrategy};
use crate::system::CacheSystem;

/// Resolve one cell access against the engine state.
///
/// Valid entries return their value immediately. Invalid entries are
/// handled per the hinted strategy:
///
/// - `DontLoad`: return the stale value, touch nothing else.
/// - `Volatile`: defer to the fetch queue (once per frame per key and
///   level), return the stale value.
/// - `Blocking`: load on the calling thread, return the fresh value or
///   the loader's error.
/// - `Budgeted`: as `Blocking` while the priority group has frame time
///   left, charging the measured elapsed time; as `Volatile` otherwise.
pub(crate) fn resolve_access<K, V>(
    system: &CacheSystem<K, V>,
    entry: &Arc<Entry<K, V>>,
    hints: &CacheHints,
) -> Result<V, LoadError>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    entry.touch(system.frame());

    let (value, valid) = entry.snapshot();
    if valid {
        system.stats_ref().record_valid_hit();
        return Ok(value);
    }

    match hints.strategy {
        LoadingStrategy::DontLoad => {
            system.stats_ref().record_stale_read();
            Ok(value)
        }
        LoadingStrategy::Volatile => {
            defer(system, entry, hints);
            Ok(value)
        }
        LoadingStrategy::Blocking => load_now(system, entry, false),
        LoadingStrategy::Budgeted => {
            let group = hints.priority;
            if system.budget().is_exhausted(group) {
                defer(system, entry, hints);
                Ok(value)
            } else {
                let start = Instant::now();
                let result = load_now(system, entry, true);
                system.budget().use_time(group, start.elapsed());
                result
            }
        }
    }
}

/// Hand the entry to the fetch queue, subject to per-frame de-duplication
/// and the bounded-retry limit. The caller returns the stale value.
fn defer<K, V>(system: &CacheSystem<K, V>, entry: &Arc<Entry<K, V>>, hints: &CacheHints)
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let stats = system.stats_ref();
    stats.record_stale_read();

    if entry.failed_attempts() >= system.config().max_load_attempts {
        stats.record_retry_parked();
        return;
    }
    if system
        .queue()
        .enqueue(Arc::clone(entry), hints.priority, hints.enqueue_to_front)
    {
        stats.record_deferred();
    } else {
        stats.record_dedup_suppressed();
    }
}

/// Load on the calling thread through the serialized entry load path.
fn load_now<K, V>(
    system: &CacheSystem<K, V>,
    entry: &Arc<Entry<K, V>>,
    budgeted: bool,
) -> Result<V, LoadError>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let outcome = system.cache().load_entry(entry)?;
    let stats = system.stats_ref();
    match &outcome {
        LoadOutcome::AlreadyValid(_) => stats.record_valid_hit(),
        LoadOutcome::Loaded(_) | LoadOutcome::Discarded(_) => {
            if budgeted {
                stats.record_budgeted_load();
            } else {
                stats.record_blocking_load();
            }
        }
    }
    Ok(outcome.into_value())
}
