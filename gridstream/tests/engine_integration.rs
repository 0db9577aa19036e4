//! Integration tests for the full cache engine.
//!
//! These tests drive the engine the way a renderer does:
//! - at-most-once entry installation and loading under contention
//! - strategy behavior across frames (volatile, blocking, budgeted)
//! - frame-boundary de-duplication and budget resets
//! - clear-versus-in-flight-load races
//! - the data-changed listener contract

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gridstream::{
    CacheHints, CacheSystem, CacheView, CellSource, DataListener, EngineConfig, LoadError,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Cell source producing `"cell-<index>"` strings with a configurable
/// per-load delay and an optional set of always-failing indices.
struct SlowSource {
    loads: AtomicUsize,
    delay: Duration,
    failing: Vec<u64>,
}

impl SlowSource {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            delay,
            failing: Vec::new(),
        })
    }

    fn with_failing(delay: Duration, failing: Vec<u64>) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            delay,
            failing,
        })
    }

    fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl CellSource<u64, String> for SlowSource {
    fn key_of(&self, index: u64) -> u64 {
        index
    }

    fn load_cell(&self, index: u64) -> Result<String, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.failing.contains(&index) {
            Err(LoadError::failed(format!("cell {index} unavailable")))
        } else {
            Ok(format!("cell-{index}"))
        }
    }

    fn placeholder(&self, _index: u64) -> String {
        String::new()
    }
}

/// Listener recording every notification it receives.
struct RecordingListener {
    loaded: Mutex<Vec<u64>>,
    failed: Mutex<Vec<u64>>,
}

impl RecordingListener {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            loaded: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
        })
    }

    fn loaded_keys(&self) -> Vec<u64> {
        self.loaded.lock().unwrap().clone()
    }

    fn failed_keys(&self) -> Vec<u64> {
        self.failed.lock().unwrap().clone()
    }
}

impl DataListener<u64> for RecordingListener {
    fn on_loaded(&self, key: &u64) {
        self.loaded.lock().unwrap().push(*key);
    }

    fn on_failed(&self, key: &u64, _error: &LoadError) {
        self.failed.lock().unwrap().push(*key);
    }
}

fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

// =============================================================================
// Cache map guarantees
// =============================================================================

#[test]
fn test_concurrent_puts_yield_one_entry_and_one_load() {
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::new(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(2),
        )
        .unwrap(),
    );
    let loads = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let system = Arc::clone(&system);
            let loads = Arc::clone(&loads);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let loads = Arc::clone(&loads);
                let entry = system.cache().put(99, String::new(), move |key: &u64| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LoadError>(format!("cell-{key}"))
                });
                system.cache().load_entry(&entry).unwrap().into_value()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "cell-99");
    }
    assert_eq!(system.cache().len(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_before_put_is_empty() {
    let system: CacheSystem<u64, String> =
        CacheSystem::new(EngineConfig::new().with_fetcher_threads(1)).unwrap();
    assert!(system.cache().get(&123).is_none());
}

// =============================================================================
// Strategy behavior through a view
// =============================================================================

#[test]
fn test_blocking_access_validates_entry_with_loader_output() {
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::new(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::ZERO);
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::blocking(0)).unwrap();

    system.prepare_next_frame();
    assert_eq!(view.try_get(7).unwrap(), "cell-7");

    let entry = system.cache().get(&7).unwrap();
    assert!(entry.is_valid());
    assert_eq!(entry.value(), "cell-7");
}

#[test]
fn test_volatile_enqueues_once_per_frame_and_again_after_frame() {
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::new(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1),
        )
        .unwrap(),
    );
    // Loads stall long enough that the entry stays invalid across both
    // frames of the test.
    let source = SlowSource::new(Duration::from_millis(400));
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::volatile(0)).unwrap();

    system.prepare_next_frame();
    for _ in 0..5 {
        assert_eq!(view.try_get(1).unwrap(), "");
    }
    let stats = system.stats();
    assert_eq!(stats.deferred, 1);
    assert_eq!(stats.dedup_suppressed, 4);

    // A new frame clears the de-dup set; the still-invalid cell may be
    // requested once more.
    system.prepare_next_frame();
    view.try_get(1).unwrap();
    assert_eq!(system.stats().deferred, 2);
}

#[test]
fn test_budgeted_zero_budget_behaves_like_volatile() {
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::new(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::from_millis(200));
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::budgeted(0)).unwrap();

    system.prepare_next_frame();
    assert_eq!(view.try_get(1).unwrap(), "");
    let stats = system.stats();
    assert_eq!(stats.budgeted_loads, 0);
    assert_eq!(stats.deferred, 1);
}

#[test]
fn test_budgeted_ample_budget_behaves_like_blocking_and_charges() {
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::new(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1)
                .with_frame_budget(vec![Duration::from_secs(3600)]),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::from_millis(20));
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::budgeted(0)).unwrap();

    system.prepare_next_frame();
    let before = system.budget().time_left(0);
    assert_eq!(view.try_get(1).unwrap(), "cell-1");
    let after = system.budget().time_left(0);

    assert_eq!(system.stats().budgeted_loads, 1);
    assert_eq!(system.stats().deferred, 0);
    // The measured elapsed time, at least the loader's delay, was
    // charged against the group.
    assert!(before - after >= Duration::from_millis(20));
}

// =============================================================================
// Clearing and in-flight loads
// =============================================================================

#[test]
fn test_clear_hides_key_despite_inflight_load() {
    let listener = RecordingListener::new();
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::with_listener(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1),
            listener.clone(),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::from_millis(150));
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::volatile(0)).unwrap();

    system.prepare_next_frame();
    view.try_get(1).unwrap();

    // Give the fetcher time to start the load, then clear mid-flight.
    thread::sleep(Duration::from_millis(50));
    system.clear();
    assert!(system.cache().get(&1).is_none());

    // The late publish is discarded: the key stays absent and the
    // listener never fires.
    thread::sleep(Duration::from_millis(300));
    assert!(system.cache().get(&1).is_none());
    assert!(listener.loaded_keys().is_empty());
    assert_eq!(system.stats().discarded_publishes, 1);
}

// =============================================================================
// The two-priority budget scenario
// =============================================================================

#[test]
fn test_budgeted_and_volatile_priorities_end_to_end() {
    let listener = RecordingListener::new();
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::with_listener(
            EngineConfig::new()
                .with_priorities(2)
                .with_fetcher_threads(1)
                .with_frame_budget(vec![Duration::from_millis(100)]),
            listener.clone(),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::from_millis(10));

    let background =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::volatile(1)).unwrap();
    let foreground =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::budgeted(0)).unwrap();

    system.prepare_next_frame();

    // Cell A goes to the low-priority queue and stays stale for now.
    assert_eq!(background.try_get(100).unwrap(), "");

    // Cell B loads synchronously within the priority-0 budget.
    assert_eq!(foreground.try_get(200).unwrap(), "cell-200");
    let remaining = system.budget().time_left(0);
    assert!(remaining <= Duration::from_millis(90));
    assert!(remaining > Duration::ZERO);

    // A fetcher eventually loads cell A and the listener fires once.
    let entry_a = system.cache().get(&100).unwrap();
    assert!(wait_until(Duration::from_secs(2), || entry_a.is_valid()));
    assert_eq!(entry_a.value(), "cell-100");
    assert!(wait_until(Duration::from_secs(1), || {
        listener.loaded_keys() == vec![100]
    }));
}

// =============================================================================
// Background failures and the listener contract
// =============================================================================

#[test]
fn test_background_failure_reports_and_does_not_requeue() {
    let listener = RecordingListener::new();
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::with_listener(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1),
            listener.clone(),
        )
        .unwrap(),
    );
    let source = SlowSource::with_failing(Duration::ZERO, vec![5]);
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::volatile(0)).unwrap();

    system.prepare_next_frame();
    view.try_get(5).unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        listener.failed_keys() == vec![5]
    }));
    let entry = system.cache().get(&5).unwrap();
    assert!(!entry.is_valid());
    assert_eq!(entry.failed_attempts(), 1);

    // No automatic retry: the failure count stays put until a later
    // access re-enqueues.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(source.load_count(), 1);

    system.prepare_next_frame();
    view.try_get(5).unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        source.load_count() == 2
    }));
}

#[test]
fn test_listener_fires_once_per_cell_under_heavy_access() {
    let listener = RecordingListener::new();
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::with_listener(
            EngineConfig::new()
                .with_priorities(2)
                .with_fetcher_threads(3),
            listener.clone(),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::from_millis(1));
    let view = Arc::new(
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::volatile(0)).unwrap(),
    );

    system.prepare_next_frame();
    let accessors: Vec<_> = (0..4)
        .map(|_| {
            let view = Arc::clone(&view);
            thread::spawn(move || {
                for index in 0..50u64 {
                    view.try_get(index).unwrap();
                }
            })
        })
        .collect();
    for accessor in accessors {
        accessor.join().unwrap();
    }

    // Every cell eventually becomes valid and was announced exactly once.
    assert!(wait_until(Duration::from_secs(5), || {
        (0..50u64).all(|index| {
            system
                .cache()
                .get(&index)
                .is_some_and(|entry| entry.is_valid())
        })
    }));

    let mut loaded = listener.loaded_keys();
    loaded.sort_unstable();
    let expected: Vec<u64> = (0..50).collect();
    assert_eq!(loaded, expected);
    assert_eq!(source.load_count(), 50);
}

// =============================================================================
// Sweeping
// =============================================================================

#[test]
fn test_untouched_entries_are_swept_after_keep_frames() {
    let system: Arc<CacheSystem<u64, String>> = Arc::new(
        CacheSystem::new(
            EngineConfig::new()
                .with_priorities(1)
                .with_fetcher_threads(1)
                .with_keep_frames(3),
        )
        .unwrap(),
    );
    let source = SlowSource::new(Duration::ZERO);
    let view =
        CacheView::new(Arc::clone(&system), source.clone(), CacheHints::blocking(0)).unwrap();

    system.prepare_next_frame();
    view.try_get(1).unwrap();
    view.try_get(2).unwrap();

    // Keep touching cell 1 while cell 2 goes cold.
    for _ in 0..5 {
        system.prepare_next_frame();
        view.try_get(1).unwrap();
    }

    assert!(system.cache().get(&1).is_some());
    assert!(system.cache().get(&2).is_none());
    assert!(system.stats().swept_entries >= 1);
}
