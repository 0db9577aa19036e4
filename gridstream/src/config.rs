//! Engine configuration.

use std::time::Duration;

use crate::error::CacheError;

/// Default number of priority levels.
pub const DEFAULT_NUM_PRIORITIES: usize = 2;

/// Default number of frames an untouched entry survives before the sweep
/// reclaims it.
pub const DEFAULT_KEEP_FRAMES: u64 = 60;

/// Default number of frames between generation sweeps.
pub const DEFAULT_SWEEP_INTERVAL: u64 = 1;

/// Default maximum loader attempts per entry before deferred loading is
/// parked for that entry.
pub const DEFAULT_MAX_LOAD_ATTEMPTS: u32 = 3;

/// Number of cores left free for the consuming (render) thread when
/// sizing the fetcher pool from available parallelism.
pub const FETCHER_HEADROOM: usize = 1;

/// Compute the default fetcher pool size: available parallelism minus
/// headroom for the consumer thread, but at least one.
pub fn default_fetcher_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    cpus.saturating_sub(FETCHER_HEADROOM).max(1)
}

/// Configuration for a [`CacheSystem`](crate::system::CacheSystem).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of fetch-queue priority levels, `0` = highest.
    pub num_priorities: usize,
    /// Number of background fetcher threads.
    pub fetcher_threads: usize,
    /// Per-frame synchronous-load time budget per priority group.
    /// Groups beyond the vector length get a zero budget.
    pub frame_budget: Vec<Duration>,
    /// Entries untouched for more than this many frames are swept.
    pub keep_frames: u64,
    /// Run the generation sweep every this many frames.
    pub sweep_interval: u64,
    /// Optional cap on cached entries; the sweep evicts the least
    /// recently touched entries beyond it.
    pub max_entries: Option<usize>,
    /// Loader attempts per entry before deferred loading is parked.
    pub max_load_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_priorities: DEFAULT_NUM_PRIORITIES,
            fetcher_threads: default_fetcher_count(),
            frame_budget: Vec::new(),
            keep_frames: DEFAULT_KEEP_FRAMES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_entries: None,
            max_load_attempts: DEFAULT_MAX_LOAD_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of priority levels.
    pub fn with_priorities(mut self, levels: usize) -> Self {
        self.num_priorities = levels;
        self
    }

    /// Set the fetcher pool size.
    pub fn with_fetcher_threads(mut self, threads: usize) -> Self {
        self.fetcher_threads = threads;
        self
    }

    /// Set the per-group frame budget. Groups beyond the vector length
    /// get a zero budget.
    pub fn with_frame_budget(mut self, budget: Vec<Duration>) -> Self {
        self.frame_budget = budget;
        self
    }

    /// Give every priority group the same frame budget.
    pub fn with_uniform_budget(mut self, per_group: Duration) -> Self {
        self.frame_budget = vec![per_group; self.num_priorities];
        self
    }

    /// Set how many frames an untouched entry survives.
    pub fn with_keep_frames(mut self, frames: u64) -> Self {
        self.keep_frames = frames;
        self
    }

    /// Set the sweep interval in frames.
    pub fn with_sweep_interval(mut self, frames: u64) -> Self {
        self.sweep_interval = frames;
        self
    }

    /// Cap the number of cached entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set the bounded-retry attempt limit.
    pub fn with_max_load_attempts(mut self, attempts: u32) -> Self {
        self.max_load_attempts = attempts;
        self
    }

    /// The frame budget padded with zeros to `num_priorities` entries.
    pub fn normalized_budget(&self) -> Vec<Duration> {
        let mut budget = self.frame_budget.clone();
        budget.resize(self.num_priorities, Duration::ZERO);
        budget.truncate(self.num_priorities);
        budget
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.num_priorities == 0 {
            return Err(CacheError::InvalidConfig(
                "num_priorities must be at least 1".to_string(),
            ));
        }
        if self.fetcher_threads == 0 {
            return Err(CacheError::InvalidConfig(
                "fetcher_threads must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval == 0 {
            return Err(CacheError::InvalidConfig(
                "sweep_interval must be at least 1".to_string(),
            ));
        }
        if self.max_load_attempts == 0 {
            return Err(CacheError::InvalidConfig(
                "max_load_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
