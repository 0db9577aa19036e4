//! Access hints: how a cell request should be satisfied.

/// What to do when an accessed cell's data is not yet loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStrategy {
    /// Enqueue the cell for asynchronous loading by a fetcher thread (at
    /// most once per frame) and return the current, possibly stale, value.
    Volatile,
    /// Load the cell data immediately on the calling thread.
    Blocking,
    /// Load immediately if the calling priority group has frame time
    /// budget left; otherwise behave like [`Volatile`](Self::Volatile).
    Budgeted,
    /// Neither load nor enqueue; return the current value as-is.
    DontLoad,
}

/// Per-access request hints.
///
/// Hints combine a [`LoadingStrategy`] with a queue priority level and a
/// queue-order flag. Priorities are consecutive integers `0..n`, where 0
/// is served first. `enqueue_to_front` pushes deferred requests to the
/// front of their priority level instead of the back, which lets a view
/// favor the most recently requested cells.
///
/// Hints are attached per access call; a [`CacheView`](crate::view::CacheView)
/// also carries a current hints set that can be swapped at any time (for
/// example on a zoom-level switch) and takes effect on the next access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHints {
    /// What to do when the accessed cell is invalid.
    pub strategy: LoadingStrategy,
    /// Queue priority level for deferred loads, `0` = highest.
    pub priority: usize,
    /// Enqueue deferred loads at the front of their priority level.
    pub enqueue_to_front: bool,
}

impl CacheHints {
    /// Create hints with the given strategy, priority and queue order.
    pub fn new(strategy: LoadingStrategy, priority: usize, enqueue_to_front: bool) -> Self {
        Self {
            strategy,
            priority,
            enqueue_to_front,
        }
    }

    /// Non-blocking best-effort hints at the given priority.
    pub fn volatile(priority: usize) -> Self {
        Self::new(LoadingStrategy::Volatile, priority, false)
    }

    /// Always-fresh hints: load synchronously on access.
    pub fn blocking(priority: usize) -> Self {
        Self::new(LoadingStrategy::Blocking, priority, false)
    }

    /// Budget-bounded hints: synchronous while frame budget remains.
    pub fn budgeted(priority: usize) -> Self {
        Self::new(LoadingStrategy::Budgeted, priority, false)
    }

    /// Passive hints: never trigger any loading.
    pub fn dont_load() -> Self {
        Self::new(LoadingStrategy::DontLoad, 0, false)
    }

    /// Set the queue-order flag.
    pub fn with_enqueue_to_front(mut self, to_front: bool) -> Self {
        self.enqueue_to_front = to_front;
        self
    }
}

impl Default for CacheHints {
    /// Best-effort rendering defaults: volatile at the highest priority.
    fn default() -> Self {
        Self::volatile(0)
    }
}
