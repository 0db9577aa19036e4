//! Background fetcher pool draining the fetch queue.

mod listener;

pub use listener::{DataListener, NoOpListener, TracingListener};

use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::cache::{LoadOutcome, VolatileCache};
use crate::queue::FetchQueue;
use crate::stats::CacheStats;

/// Fixed pool of long-lived worker threads executing deferred loads.
///
/// Each worker blocks on [`FetchQueue::take`], re-checks the entry's
/// validity (a blocking access or another fetcher may have loaded it in
/// the meantime), runs the loader, and publishes through the cache's
/// registration check. Successful publishes notify the [`DataListener`];
/// failures leave the entry invalid and are not re-queued here — a later
/// access decides whether to try again.
///
/// The pool shuts down by closing the queue and joining every worker,
/// either explicitly or on drop.
pub struct FetcherPool<K, V> {
    queue: Arc<FetchQueue<K, V>>,
    handles: Vec<JoinHandle<()>>,
}

impl<K, V> FetcherPool<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Spawn `threads` workers draining `queue` into `cache`.
    pub fn start(
        queue: Arc<FetchQueue<K, V>>,
        cache: Arc<VolatileCache<K, V>>,
        listener: Arc<dyn DataListener<K>>,
        stats: Arc<CacheStats>,
        threads: usize,
    ) -> Self {
        let threads = threads.max(1);
        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let queue = Arc::clone(&queue);
            let cache = Arc::clone(&cache);
            let listener = Arc::clone(&listener);
            let stats = Arc::clone(&stats);
            let handle = thread::Builder::new()
                .name(format!("fetcher-{i}"))
                .spawn(move || Self::worker_loop(queue, cache, listener, stats))
                .expect("failed to spawn fetcher thread");
            handles.push(handle);
        }
        info!(threads, "fetcher pool started");
        Self { queue, handles }
    }

    fn worker_loop(
        queue: Arc<FetchQueue<K, V>>,
        cache: Arc<VolatileCache<K, V>>,
        listener: Arc<dyn DataListener<K>>,
        stats: Arc<CacheStats>,
    ) {
        while let Some(entry) = queue.take() {
            // Cheap pre-check before taking the load guard.
            if entry.is_valid() {
                continue;
            }
            match cache.load_entry(&entry) {
                Ok(LoadOutcome::Loaded(_)) => {
                    stats.record_background_load();
                    listener.on_loaded(entry.key());
                }
                Ok(LoadOutcome::AlreadyValid(_)) | Ok(LoadOutcome::Discarded(_)) => {}
                Err(err) => {
                    warn!(%err, "background load failed");
                    listener.on_failed(entry.key(), &err);
                }
            }
        }
        debug!("fetcher worker stopped");
    }

    /// Number of worker threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }

    /// Whether any worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }

    /// Signal shutdown. Non-blocking; call [`join`](Self::join) to wait.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    /// Wait for every worker to finish.
    pub fn join(&mut self) {
        self.join_workers();
    }
}

impl<K, V> FetcherPool<K, V> {
    fn join_workers(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.join() {
                warn!("fetcher thread panicked: {err:?}");
            }
        }
    }
}

impl<K, V> Drop for FetcherPool<K, V> {
    fn drop(&mut self) {
        self.queue.shutdown();
        self.join_workers();
    }
}
