//! The assembled cache engine: map, queue, budget, clock and fetchers.

use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::budget::TimeBudget;
use crate::cache::VolatileCache;
use crate::config::EngineConfig;
use crate::control::FrameClock;
use crate::error::CacheError;
use crate::fetcher::{DataListener, FetcherPool, NoOpListener};
use crate::queue::FetchQueue;
use crate::stats::{CacheStats, StatsSnapshot};

/// One volatile cache engine instance.
///
/// Bundles the key-to-entry map, the priority fetch queue, the per-frame
/// time budget, the frame clock and the background fetcher pool behind a
/// single handle. Views ([`CacheView`](crate::view::CacheView)) borrow the
/// shared pieces; the driving application calls
/// [`prepare_next_frame`](Self::prepare_next_frame) once per render cycle.
pub struct CacheSystem<K, V> {
    cache: Arc<VolatileCache<K, V>>,
    queue: Arc<FetchQueue<K, V>>,
    budget: TimeBudget,
    clock: FrameClock,
    stats: Arc<CacheStats>,
    config: EngineConfig,
    /// Precomputed per-group budget applied at each frame start.
    frame_budget: Vec<Duration>,
    fetchers: Mutex<Option<FetcherPool<K, V>>>,
}

impl<K, V> CacheSystem<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Build an engine from `config` with a no-op data listener.
    pub fn new(config: EngineConfig) -> Result<Self, CacheError> {
        Self::with_listener(config, Arc::new(NoOpListener))
    }

    /// Build an engine whose background publishes notify `listener`.
    pub fn with_listener(
        config: EngineConfig,
        listener: Arc<dyn DataListener<K>>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let stats = Arc::new(CacheStats::new());
        let cache = Arc::new(VolatileCache::new(Arc::clone(&stats)));
        let queue = Arc::new(FetchQueue::new(config.num_priorities));
        let budget = TimeBudget::new(config.num_priorities);
        let clock = FrameClock::new(config.sweep_interval);
        let frame_budget = config.normalized_budget();

        let fetchers = FetcherPool::start(
            Arc::clone(&queue),
            Arc::clone(&cache),
            listener,
            Arc::clone(&stats),
            config.fetcher_threads,
        );

        info!(
            priorities = config.num_priorities,
            fetchers = config.fetcher_threads,
            "cache system started"
        );

        Ok(Self {
            cache,
            queue,
            budget,
            clock,
            stats,
            config,
            frame_budget,
            fetchers: Mutex::new(Some(fetchers)),
        })
    }

    /// Begin a new frame. Must be called by the driving application
    /// exactly once before issuing that frame's accesses.
    ///
    /// Drops all still-pending fetch requests and the per-frame de-dup
    /// sets, resets the per-group time budget, and runs the generation
    /// sweep when it is due. Completes synchronously; loads already taken
    /// by a fetcher are unaffected.
    pub fn prepare_next_frame(&self) {
        let frame = self.clock.advance();
        self.queue.clear_to_prefetch();
        self.budget.reset(&self.frame_budget);
        self.stats.record_frame();
        if self.clock.sweep_due(frame) {
            self.sweep_now();
        }
        debug!(frame, "frame prepared");
    }

    /// Run the generation sweep immediately; returns removed entries.
    ///
    /// Normally driven by [`prepare_next_frame`](Self::prepare_next_frame)
    /// on the configured interval.
    pub fn sweep_now(&self) -> usize {
        self.cache.sweep(
            self.clock.current(),
            self.config.keep_frames,
            self.config.max_entries,
        )
    }

    /// Atomically detach every cached entry. In-flight loads complete but
    /// their results are discarded at publish time.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// The current frame number.
    pub fn frame(&self) -> u64 {
        self.clock.current()
    }

    /// The key-to-entry map.
    pub fn cache(&self) -> &Arc<VolatileCache<K, V>> {
        &self.cache
    }

    /// The pending-load queue.
    pub fn queue(&self) -> &Arc<FetchQueue<K, V>> {
        &self.queue
    }

    /// The per-frame time budget.
    pub fn budget(&self) -> &TimeBudget {
        &self.budget
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A point-in-time statistics snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn stats_ref(&self) -> &CacheStats {
        &self.stats
    }

    /// Stop the fetcher pool and wait for its workers. Idempotent; also
    /// performed on drop.
    pub fn shutdown(&self) {
        if let Some(mut pool) = self.fetchers.lock().unwrap().take() {
            pool.shutdown();
            pool.join();
            info!("cache system stopped");
        }
    }
}

impl<K, V> Drop for CacheSystem<K, V> {
    fn drop(&mut self) {
        if let Some(pool) = self.fetchers.lock().unwrap().take() {
            drop(pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use std::time::Duration;

    fn small_config() -> EngineConfig {
        EngineConfig::new()
            .with_priorities(2)
            .with_fetcher_threads(1)
    }

    fn new_system() -> CacheSystem<u64, String> {
        CacheSystem::new(small_config()).unwrap()
    }

    fn ok_loader(key: &u64) -> Result<String, LoadError> {
        Ok(format!("cell-{key}"))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = CacheSystem::<u64, String>::new(EngineConfig::new().with_priorities(0));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_prepare_next_frame_advances_and_resets_budget() {
        let system: CacheSystem<u64, String> = CacheSystem::new(
            small_config().with_frame_budget(vec![Duration::from_millis(10)]),
        )
        .unwrap();

        assert_eq!(system.frame(), 0);
        assert!(system.budget().is_exhausted(0));

        system.prepare_next_frame();
        assert_eq!(system.frame(), 1);
        assert_eq!(system.budget().time_left(0), Duration::from_millis(10));
        // Group 1 has no configured budget.
        assert!(system.budget().is_exhausted(1));
    }

    #[test]
    fn test_prepare_next_frame_clears_queue() {
        use std::sync::mpsc;
        use std::thread;

        let system = new_system();

        // Occupy the single fetcher with a gated load so the second
        // request stays queued until the frame boundary.
        let (release, gate) = mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(gate);
        let busy = system.cache().put(1, String::new(), move |_: &u64| {
            let _ = gate.lock().unwrap().recv();
            Ok::<_, LoadError>(String::new())
        });
        system.queue().enqueue(busy, 0, false);
        thread::sleep(Duration::from_millis(50));

        let pending = system.cache().put(2, String::new(), ok_loader);
        system.queue().enqueue(Arc::clone(&pending), 0, false);
        assert_eq!(system.queue().len(), 1);

        system.prepare_next_frame();
        assert!(system.queue().is_empty());

        release.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));
        // The dropped request was never fetched.
        assert!(!pending.is_valid());
    }

    #[test]
    fn test_sweep_driven_by_frame_interval() {
        let system: CacheSystem<u64, String> = CacheSystem::new(
            small_config().with_keep_frames(2).with_sweep_interval(1),
        )
        .unwrap();

        let entry = system.cache().put(1, String::new(), ok_loader);
        entry.touch(system.frame());

        // Advance past keep_frames without touching the entry again.
        for _ in 0..4 {
            system.prepare_next_frame();
        }
        assert!(system.cache().get(&1).is_none());
    }

    #[test]
    fn test_clear_empties_cache() {
        let system = new_system();
        system.cache().put(1, String::new(), ok_loader);
        system.clear();
        assert!(system.cache().is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let system = new_system();
        system.shutdown();
        system.shutdown();
    }
}
