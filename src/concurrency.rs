//! Cancellation and the divination worker pool (§5).
//!
//! Patch generation itself is single-threaded end to end; only divination of
//! a batch of archives is embarrassingly parallel, with each task owning its
//! own archive source, hint cache, and statistics accumulator. With the
//! `parallel` feature disabled, the same code path runs sequentially on the
//! calling thread and produces identical results — the feature only affects
//! wall-clock time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply clonable flag checked at loop boundaries throughout generation
/// and application (§5 Cancellation).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; observed by subsequent [`CancellationToken::is_cancelled`] checks.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs `task` over every item in `items`, respecting `jobs` (the worker
/// pool size) when the `parallel` feature is enabled, and aggregating
/// results deterministically in input order regardless of which mode is
/// active.
///
/// `task` must not depend on cross-task shared mutable state; each call
/// receives only its own item.
pub fn run_divination_batch<T, R, F>(items: Vec<T>, jobs: usize, task: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        if jobs > 1 {
            use rayon::prelude::*;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .expect("thread pool with bounded size should build");
            return pool.install(|| items.into_par_iter().map(task).collect());
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = jobs;

    items.into_iter().map(task).collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_observed_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn batch_preserves_input_order() {
        let items = vec![1, 2, 3, 4, 5];
        let results = run_divination_batch(items, 4, |x| x * 10);
        assert_eq!(results, vec![10, 20, 30, 40, 50]);
    }
}
