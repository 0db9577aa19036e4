//! Engine statistics tracking and reporting.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared atomic counters updated from consumer and fetcher threads.
///
/// All counters are monotonic; [`snapshot`](Self::snapshot) produces a
/// consistent-enough point-in-time copy for reporting (individual counters
/// are read independently, which is fine for monitoring purposes).
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Accesses that found a valid entry.
    valid_hits: AtomicU64,
    /// Accesses that returned a stale or placeholder value.
    stale_reads: AtomicU64,
    /// Synchronous loads performed on the consumer thread (Blocking).
    blocking_loads: AtomicU64,
    /// Synchronous loads performed under a frame budget (Budgeted).
    budgeted_loads: AtomicU64,
    /// Requests handed to the fetch queue.
    deferred: AtomicU64,
    /// Enqueue attempts suppressed by per-frame de-duplication.
    dedup_suppressed: AtomicU64,
    /// Enqueue attempts suppressed by the bounded-retry policy.
    retry_parked: AtomicU64,
    /// Loads completed by background fetcher threads.
    background_loads: AtomicU64,
    /// Loader invocations that returned an error.
    load_failures: AtomicU64,
    /// Load results dropped because the entry was no longer registered.
    discarded_publishes: AtomicU64,
    /// Entries removed by the generation sweep.
    swept_entries: AtomicU64,
    /// Frames started via `prepare_next_frame`.
    frames: AtomicU64,
}

impl CacheStats {
    /// Create a zeroed statistics block.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_valid_hit(&self) {
        self.valid_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_read(&self) {
        self.stale_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_blocking_load(&self) {
        self.blocking_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_budgeted_load(&self) {
        self.budgeted_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dedup_suppressed(&self) {
        self.dedup_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_parked(&self) {
        self.retry_parked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_background_load(&self) {
        self.background_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded_publish(&self) {
        self.discarded_publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: u64) {
        self.swept_entries.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            valid_hits: self.valid_hits.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
            blocking_loads: self.blocking_loads.load(Ordering::Relaxed),
            budgeted_loads: self.budgeted_loads.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            dedup_suppressed: self.dedup_suppressed.load(Ordering::Relaxed),
            retry_parked: self.retry_parked.load(Ordering::Relaxed),
            background_loads: self.background_loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            discarded_publishes: self.discarded_publishes.load(Ordering::Relaxed),
            swept_entries: self.swept_entries.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time statistics copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub valid_hits: u64,
    pub stale_reads: u64,
    pub blocking_loads: u64,
    pub budgeted_loads: u64,
    pub deferred: u64,
    pub dedup_suppressed: u64,
    pub retry_parked: u64,
    pub background_loads: u64,
    pub load_failures: u64,
    pub discarded_publishes: u64,
    pub swept_entries: u64,
    pub frames: u64,
}

impl StatsSnapshot {
    /// Total cell accesses observed.
    pub fn total_accesses(&self) -> u64 {
        self.valid_hits + self.stale_reads + self.blocking_loads + self.budgeted_loads
    }

    /// Fraction of accesses that found valid data (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.valid_hits as f64 / total as f64
        }
    }

    /// Total synchronous loads on consumer threads.
    pub fn synchronous_loads(&self) -> u64 {
        self.blocking_loads + self.budgeted_loads
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames:              {}", self.frames)?;
        writeln!(f, "accesses:            {}", self.total_accesses())?;
        writeln!(
            f,
            "  valid hits:        {} ({:.1}%)",
            self.valid_hits,
            self.hit_rate() * 100.0
        )?;
        writeln!(f, "  stale reads:       {}", self.stale_reads)?;
        writeln!(f, "  blocking loads:    {}", self.blocking_loads)?;
        writeln!(f, "  budgeted loads:    {}", self.budgeted_loads)?;
        writeln!(f, "queue:")?;
        writeln!(f, "  deferred:          {}", self.deferred)?;
        writeln!(f, "  dedup suppressed:  {}", self.dedup_suppressed)?;
        writeln!(f, "  retry parked:      {}", self.retry_parked)?;
        writeln!(f, "background:")?;
        writeln!(f, "  loads:             {}", self.background_loads)?;
        writeln!(f, "  failures:          {}", self.load_failures)?;
        writeln!(f, "  discarded:         {}", self.discarded_publishes)?;
        write!(f, "swept entries:       {}", self.swept_entries)
    }
}
