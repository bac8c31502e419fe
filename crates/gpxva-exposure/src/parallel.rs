//! Conditional parallel iteration.
//!
//! Uses rayon when the `parallel` feature is enabled and the caller asks
//! for it. Output order always matches input order, so results do not
//! depend on the execution mode.

/// Returns true if work over `count` items should run on the thread pool.
pub fn should_parallelize(enabled: bool, count: usize) -> bool {
    cfg!(feature = "parallel") && enabled && count > 1
}

/// Maps a function over items, in parallel when enabled.
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], enabled: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if should_parallelize(enabled, items.len()) {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}
