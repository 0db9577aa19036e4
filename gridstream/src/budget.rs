//! Per-frame synchronous-load time budgets.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Remaining synchronous-load time per priority group for the current
/// frame.
///
/// Budgeted accesses consult [`is_exhausted`](Self::is_exhausted) before
/// loading on the consumer thread and charge the measured elapsed time
/// afterwards with [`use_time`](Self::use_time). Charges are atomic
/// saturating subtractions, so concurrent loaders from several threads
/// can never drive a group's budget below zero.
///
/// The budget is reset from the configured per-group values at the start
/// of every frame. Groups outside the configured range always report an
/// exhausted budget.
#[derive(Debug)]
pub struct TimeBudget {
    /// Remaining nanoseconds per priority group.
    remaining: Vec<AtomicI64>,
}

impl TimeBudget {
    /// Create a budget with `groups` priority groups, all exhausted.
    pub fn new(groups: usize) -> Self {
        Self {
            remaining: (0..groups).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    /// Number of priority groups.
    pub fn groups(&self) -> usize {
        self.remaining.len()
    }

    /// Reset each group's remaining time from `budget`. Groups beyond the
    /// slice length are reset to zero.
    pub fn reset(&self, budget: &[Duration]) {
        for (group, cell) in self.remaining.iter().enumerate() {
            let nanos = budget
                .get(group)
                .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
                .unwrap_or(0);
            cell.store(nanos, Ordering::Relaxed);
        }
    }

    /// Remaining time for `group`; zero for out-of-range groups.
    pub fn time_left(&self, group: usize) -> Duration {
        match self.remaining.get(group) {
            Some(cell) => {
                let nanos = cell.load(Ordering::Relaxed).max(0);
                Duration::from_nanos(nanos as u64)
            }
            None => Duration::ZERO,
        }
    }

    /// Whether `group` has no synchronous-load time left this frame.
    pub fn is_exhausted(&self, group: usize) -> bool {
        self.time_left(group).is_zero()
    }

    /// Charge `elapsed` against `group`, saturating at zero.
    pub fn use_time(&self, group: usize, elapsed: Duration) {
        let Some(cell) = self.remaining.get(group) else {
            return;
        };
        let spent = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        // fetch_update retries on contention; the closure clamps so the
        // stored value never goes negative.
        let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |remaining| {
            Some(remaining.saturating_sub(spent).max(0))
        });
    }
}
