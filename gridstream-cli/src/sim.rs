//! Synthetic dataset and frame-loop simulation.
//!
//! Drives a [`CacheSystem`] the way a renderer would: a window of cell
//! indices slides over the dataset, one frame at a time, and every frame
//! starts with [`CacheSystem::prepare_next_frame`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gridstream::{
    CacheHints, CacheSystem, CacheView, CellSource, EngineConfig, LoadError, StatsSnapshot,
};

/// Synthetic cell source: payloads are deterministic byte blocks, loads
/// take a fixed delay, and optionally every n-th cell fails to load.
pub struct SyntheticSource {
    payload_bytes: usize,
    load_delay: Duration,
    fail_every: Option<u64>,
    loads: AtomicU64,
}

impl SyntheticSource {
    pub fn new(payload_bytes: usize, load_delay: Duration, fail_every: Option<u64>) -> Self {
        Self {
            payload_bytes,
            load_delay,
            fail_every,
            loads: AtomicU64::new(0),
        }
    }

    /// Total loader invocations so far.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl CellSource<u64, Vec<u8>> for SyntheticSource {
    fn key_of(&self, index: u64) -> u64 {
        index
    }

    fn load_cell(&self, index: u64) -> Result<Vec<u8>, LoadError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if !self.load_delay.is_zero() {
            thread::sleep(self.load_delay);
        }
        if let Some(n) = self.fail_every {
            if n > 0 && index % n == 0 {
                return Err(LoadError::failed(format!("synthetic failure for cell {index}")));
            }
        }
        Ok(vec![(index % 251) as u8; self.payload_bytes])
    }

    fn placeholder(&self, _index: u64) -> Vec<u8> {
        vec![0; self.payload_bytes]
    }
}

/// Parameters of one simulation run.
pub struct Simulation {
    /// Frames to render.
    pub frames: u64,
    /// Total cells in the dataset.
    pub cells: u64,
    /// Cells accessed per frame.
    pub window: u64,
    /// Window advance per frame.
    pub step: u64,
    /// Hints applied to every access.
    pub hints: CacheHints,
    /// Wall-clock pacing per frame; zero runs unpaced.
    pub frame_time: Duration,
    /// How long to wait for the fetch queue to drain after the last
    /// frame.
    pub drain_timeout: Duration,
}

/// Results of a simulation run.
pub struct Report {
    pub frames: u64,
    pub elapsed: Duration,
    pub loader_calls: u64,
    pub access_errors: u64,
    pub stats: StatsSnapshot,
}

impl Simulation {
    /// Run the simulation to completion and shut the engine down.
    pub fn run(
        &self,
        config: EngineConfig,
        source: Arc<SyntheticSource>,
    ) -> Result<Report, gridstream::CacheError> {
        let system: Arc<CacheSystem<u64, Vec<u8>>> = Arc::new(CacheSystem::with_listener(
            config,
            Arc::new(gridstream::TracingListener),
        )?);
        let dyn_source: Arc<dyn CellSource<u64, Vec<u8>>> = source.clone();
        let view = CacheView::new(Arc::clone(&system), dyn_source, self.hints)?;

        let start = Instant::now();
        let mut access_errors = 0u64;

        for frame in 0..self.frames {
            let frame_start = Instant::now();
            system.prepare_next_frame();

            let base = frame * self.step;
            for offset in 0..self.window {
                let index = (base + offset) % self.cells.max(1);
                if view.try_get(index).is_err() {
                    access_errors += 1;
                }
            }

            if !self.frame_time.is_zero() {
                let spent = frame_start.elapsed();
                if spent < self.frame_time {
                    thread::sleep(self.frame_time - spent);
                }
            }
        }

        // Let in-flight background loads finish before reading the final
        // counters.
        let drain_deadline = Instant::now() + self.drain_timeout;
        while !system.queue().is_empty() && Instant::now() < drain_deadline {
            thread::sleep(Duration::from_millis(10));
        }

        let elapsed = start.elapsed();
        system.shutdown();

        Ok(Report {
            frames: self.frames,
            elapsed,
            loader_calls: source.loads(),
            access_errors,
            stats: system.stats(),
        })
    }
}
