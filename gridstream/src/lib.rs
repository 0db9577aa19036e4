//! GridStream - volatile cell caching for streaming gridded datasets
//!
//! This library streams large, tiled datasets into an interactive
//! consumer (typically a renderer) without blocking the consuming thread
//! beyond a configurable per-frame budget. Cells are cached as volatile
//! entries: an access returns immediately with the best available value,
//! while missing data is loaded in the background by a pool of fetcher
//! threads driven through a multi-level priority queue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CacheView                             │
//! │  get(index) → key → entry → strategy resolution             │
//! ├──────────────────┬──────────────────┬───────────────────────┤
//! │  VolatileCache   │   FetchQueue     │   TimeBudget          │
//! │  key → Entry     │   n priority     │   per-group frame     │
//! │  map + sweep     │   levels + dedup │   time accounting     │
//! ├──────────────────┴──────────────────┴───────────────────────┤
//! │                       FetcherPool                            │
//! │  background workers: take → load → publish → notify         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each access carries [`CacheHints`] choosing between four strategies:
//! return stale data and defer loading (`Volatile`), load immediately
//! (`Blocking`), load immediately while the frame's time budget lasts
//! (`Budgeted`), or do nothing (`DontLoad`). The driving application
//! calls [`CacheSystem::prepare_next_frame`] once per render cycle to
//! reset the per-frame de-duplication, the time budget, and to run the
//! generation sweep.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gridstream::{
//!     CacheHints, CacheSystem, CacheView, CellSource, EngineConfig, LoadError,
//! };
//!
//! struct Checkerboard;
//!
//! impl CellSource<u64, Vec<u8>> for Checkerboard {
//!     fn key_of(&self, index: u64) -> u64 {
//!         index
//!     }
//!     fn load_cell(&self, index: u64) -> Result<Vec<u8>, LoadError> {
//!         Ok(vec![(index % 2) as u8; 16])
//!     }
//!     fn placeholder(&self, _index: u64) -> Vec<u8> {
//!         vec![0; 16]
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let system: Arc<CacheSystem<u64, Vec<u8>>> = Arc::new(CacheSystem::new(
//!     EngineConfig::new().with_fetcher_threads(1),
//! )?);
//! let view = CacheView::new(
//!     Arc::clone(&system),
//!     Arc::new(Checkerboard),
//!     CacheHints::blocking(0),
//! )?;
//!
//! system.prepare_next_frame();
//! assert_eq!(view.try_get(3)?[0], 1);
//! system.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod fetcher;
pub mod hints;
pub mod loader;
pub mod logging;
pub mod queue;
pub mod stats;
pub mod system;
pub mod view;

pub use budget::TimeBudget;
pub use cache::{Entry, LoadOutcome, VolatileCache};
pub use config::EngineConfig;
pub use control::FrameClock;
pub use error::{CacheError, LoadError};
pub use fetcher::{DataListener, FetcherPool, NoOpListener, TracingListener};
pub use hints::{CacheHints, LoadingStrategy};
pub use loader::Loader;
pub use queue::FetchQueue;
pub use stats::{CacheStats, StatsSnapshot};
pub use system::CacheSystem;
pub use view::{CacheView, CellSource};

/// Version of the gridstream library.
///
/// Synchronized across the workspace; injected from `Cargo.toml` at
/// compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
