//! Observer notified of background load results.
//!
//! Fetchers emit, consumers decide how to present: the driving
//! application typically maps [`DataListener::on_loaded`] to a repaint
//! request so the next frame picks up freshly loaded cells.

use std::fmt::Debug;

use tracing::{debug, warn};

use crate::error::LoadError;

/// Callback surface for background fetch results.
///
/// `on_loaded` fires exactly once per successful background publish.
/// Implementations must be cheap and non-blocking; they run on fetcher
/// threads.
pub trait DataListener<K>: Send + Sync {
    /// A cell's data was loaded and published.
    fn on_loaded(&self, key: &K);

    /// A background load attempt failed; the cell stays invalid.
    fn on_failed(&self, key: &K, error: &LoadError) {
        let _ = (key, error);
    }
}

/// Listener that ignores every notification.
pub struct NoOpListener;

impl<K> DataListener<K> for NoOpListener {
    fn on_loaded(&self, _key: &K) {}
}

/// Listener that logs notifications through `tracing`.
pub struct TracingListener;

impl<K: Debug> DataListener<K> for TracingListener {
    fn on_loaded(&self, key: &K) {
        debug!(?key, "cell loaded");
    }

    fn on_failed(&self, key: &K, error: &LoadError) {
        warn!(?key, %error, "cell load failed");
    }
}
