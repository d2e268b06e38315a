//! Parallelism configuration shared by the training components.
//!
//! Components receive a [`Parallelism`] flag instead of managing thread pools
//! themselves. The pool is set up once at the top level via [`run_with_threads`].

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators.
/// When `Sequential`, components must iterate on the calling thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Number of workers a component should spawn under this setting.
    #[inline]
    pub fn n_workers(self) -> usize {
        match self {
            Parallelism::Sequential => 1,
            Parallelism::Parallel => rayon::current_num_threads(),
        }
    }

    /// Map over a slice, preserving order.
    #[inline]
    pub fn maybe_par_map<T, B, F>(self, items: &[T], f: F) -> Vec<B>
    where
        T: Sync,
        B: Send,
        F: Fn(&T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    /// Filter-map over a slice, preserving the order of surviving items.
    #[inline]
    pub fn maybe_par_filter_map<T, B, F>(self, items: &[T], f: F) -> Vec<B>
    where
        T: Sync,
        B: Send,
        F: Fn(&T) -> Option<B> + Sync + Send,
    {
        if self.is_parallel() {
            items.par_iter().filter_map(f).collect()
        } else {
            items.iter().filter_map(f).collect()
        }
    }

    /// Run `f` once per worker, concurrently when parallel.
    ///
    /// Each invocation receives its worker index. Returns after every worker
    /// has finished.
    pub fn for_each_worker<F>(self, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        let n_workers = self.n_workers();
        if n_workers <= 1 {
            f(0);
            return;
        }
        let f = &f;
        rayon::scope(|scope| {
            for worker in 0..n_workers {
                scope.spawn(move |_| f(worker));
            }
        });
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// # Example
///
/// ```
/// use treeformer::run_with_threads;
///
/// let result = run_with_threads(1, |_| 40 + 2);
/// assert_eq!(result, 42);
/// ```
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()
                .expect("Failed to create thread pool");
            pool.install(|| f(Parallelism::Parallel))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parallelism_from_threads() {
        assert!(!Parallelism::from_threads(1).is_parallel());
        assert!(Parallelism::from_threads(2).is_parallel());
        assert!(Parallelism::from_threads(8).is_parallel());
    }

    #[test]
    fn test_run_with_threads_sequential() {
        let result = run_with_threads(1, |par| (par, 42));
        assert_eq!(result, (Parallelism::Sequential, 42));
    }

    #[test]
    fn test_run_with_threads_explicit() {
        let result = run_with_threads(2, |_| rayon::current_num_threads());
        assert_eq!(result, 2);
    }

    #[test]
    fn test_maybe_par_map_preserves_order() {
        let items: Vec<usize> = (0..100).collect();
        let seq = Parallelism::Sequential.maybe_par_map(&items, |i| i * 2);
        let par = Parallelism::Parallel.maybe_par_map(&items, |i| i * 2);
        assert_eq!(seq, par);
        assert_eq!(seq[10], 20);
    }

    #[test]
    fn test_maybe_par_filter_map_preserves_order() {
        let items: Vec<usize> = (0..50).collect();
        let evens = Parallelism::Parallel.maybe_par_filter_map(&items, |&i| (i % 2 == 0).then_some(i));
        assert_eq!(evens, (0..50).step_by(2).collect::<Vec<_>>());
    }

    #[test]
    fn test_for_each_worker_runs_every_worker() {
        let hits = AtomicUsize::new(0);
        run_with_threads(3, |par| {
            par.for_each_worker(|_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        });
        assert_eq!(hits.load(Ordering::Relaxed), 3);

        hits.store(0, Ordering::Relaxed);
        Parallelism::Sequential.for_each_worker(|worker| {
            assert_eq!(worker, 0);
            hits.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }
}
