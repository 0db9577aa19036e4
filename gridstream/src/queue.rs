//! Multi-level fetch queue with per-frame de-duplication and a blocking,
//! cancellable take.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};

use tracing::debug;

use crate::cache::Entry;

/// Queue internals guarded by one mutex so enqueue, de-dup check and take
/// are each a single atomic step.
struct Levels<K, V> {
    /// One deque per priority level, index 0 = highest priority.
    deques: Vec<VecDeque<Arc<Entry<K, V>>>>,
    /// Per-level keys enqueued this frame.
    seen: Vec<HashSet<K>>,
    /// Set once at shutdown; wakes and terminates blocked takers.
    shutdown: bool,
}

/// Pending-load queue with `n` ordered priority levels.
///
/// Requests carry the entry to load, so a fetcher needs no map lookup.
/// Within one frame a key enters a given level at most once; the per-frame
/// sets are dropped by [`clear_to_prefetch`](Self::clear_to_prefetch) at
/// the frame boundary. Requests still queued at that point are dropped
/// too — a cell still wanted next frame will simply be re-requested by
/// the consumer's next access.
pub struct FetchQueue<K, V> {
    levels: Mutex<Levels<K, V>>,
    ready: Condvar,
    num_levels: usize,
}

impl<K, V> FetchQueue<K, V> {
    /// Create a queue with `num_levels` priority levels (at least one).
    pub fn new(num_levels: usize) -> Self {
        let num_levels = num_levels.max(1);
        Self {
            levels: Mutex::new(Levels {
                deques: (0..num_levels).map(|_| VecDeque::new()).collect(),
                seen: (0..num_levels).map(|_| HashSet::new()).collect(),
                shutdown: false,
            }),
            ready: Condvar::new(),
            num_levels,
        }
    }

    /// Number of priority levels.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Pop the front request of the first non-empty level, blocking while
    /// all levels are empty. Returns `None` once the queue is shut down.
    pub fn take(&self) -> Option<Arc<Entry<K, V>>> {
        let mut levels = self.levels.lock().unwrap();
        loop {
            if levels.shutdown {
                return None;
            }
            if let Some(entry) = levels.deques.iter_mut().find_map(VecDeque::pop_front) {
                return Some(entry);
            }
            levels = self.ready.wait(levels).unwrap();
        }
    }

    /// Frame-boundary reset: drop all pending requests and the per-frame
    /// de-dup sets. Requests already taken by a fetcher are unaffected.
    pub fn clear_to_prefetch(&self) {
        let mut levels = self.levels.lock().unwrap();
        let dropped: usize = levels.deques.iter().map(VecDeque::len).sum();
        for deque in &mut levels.deques {
            deque.clear();
        }
        for seen in &mut levels.seen {
            seen.clear();
        }
        if dropped > 0 {
            debug!(dropped, "fetch queue cleared at frame boundary");
        }
    }

    /// Shut the queue down, waking every blocked [`take`](Self::take).
    pub fn shutdown(&self) {
        let mut levels = self.levels.lock().unwrap();
        levels.shutdown = true;
        drop(levels);
        self.ready.notify_all();
    }

    /// Whether the queue has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.levels.lock().unwrap().shutdown
    }

    /// Pending requests at `level`.
    pub fn depth(&self, level: usize) -> usize {
        let levels = self.levels.lock().unwrap();
        levels.deques.get(level).map_or(0, VecDeque::len)
    }

    /// Pending requests across all levels.
    pub fn len(&self) -> usize {
        let levels = self.levels.lock().unwrap();
        levels.deques.iter().map(VecDeque::len).sum()
    }

    /// Whether no requests are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> FetchQueue<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Enqueue `entry` at `priority`, back or front of its level.
    ///
    /// Returns `false` without queueing if the key already entered this
    /// level during the current frame. Priorities beyond the configured
    /// range are clamped to the lowest level.
    pub fn enqueue(&self, entry: Arc<Entry<K, V>>, priority: usize, to_front: bool) -> bool {
        let level = priority.min(self.num_levels - 1);
        let mut levels = self.levels.lock().unwrap();
        if levels.shutdown {
            return false;
        }
        if !levels.seen[level].insert(entry.key().clone()) {
            return false;
        }
        if to_front {
            levels.deques[level].push_front(entry);
        } else {
            levels.deques[level].push_back(entry);
        }
        drop(levels);
        self.ready.notify_one();
        true
    }
}
