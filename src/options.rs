//! Engine-wide tunables.
//!
//! One small struct of knobs that must stay constant for the lifetime of a
//! single call, constructed once by the caller and threaded down through
//! every subsystem rather than read from global/thread-local state.

/// Options affecting a single engine call.
///
/// None of these are required; `EngineOptions::default()` is a sensible
/// baseline for a single ad hoc call.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Batches smaller than this always run sequentially, regardless of
    /// `use_threads`.
    pub min_batch_size_for_mt: usize,
    /// Cap on the number of array elements sampled when inducing an
    /// `items` schema for an array.
    pub max_array_sample_size: usize,
    /// Maximum length in bytes of a flattened key path.
    pub max_path_depth: usize,
    /// If `Some(n)`, caps the auto-detected thread count at `n` regardless
    /// of core count.
    pub thread_pool_cap: Option<usize>,
    /// Enables `debug!`-level timing logs around each public entry point.
    pub timing: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            min_batch_size_for_mt: 100,
            max_array_sample_size: 50,
            max_path_depth: 2048,
            thread_pool_cap: None,
            timing: false,
        }
    }
}

impl EngineOptions {
    /// Resolves a requested thread count using the auto-detection
    /// heuristic below when `requested` is `0`, and applies
    /// `thread_pool_cap` if set.
    ///
    /// Heuristic: 1-2 cores -> all; 3-8 cores -> cores-1; more than 8 cores
    /// -> cores/2 + 2.
    pub fn resolve_threads(&self, requested: usize) -> usize {
        let n = if requested == 0 {
            self.auto_threads()
        } else {
            requested
        };
        match self.thread_pool_cap {
            Some(cap) => n.min(cap),
            None => n,
        }
    }

    /// The auto-detection heuristic in isolation, independently testable
    /// without going through `resolve_threads`.
    pub fn auto_threads(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        match cores {
            0 => 1,
            1..=2 => cores,
            3..=8 => cores - 1,
            _ => cores / 2 + 2,
        }
    }
}

/// Runs `f`, logging its wall-clock duration at `debug!` when
/// `opts.timing` is set.
pub(crate) fn time<R>(opts: &EngineOptions, name: &str, f: impl FnOnce() -> R) -> R {
    if !opts.timing {
        return f();
    }
    let start = std::time::Instant::now();
    let ret = f();
    log::debug!("{name} took {:?}", start.elapsed());
    ret
}
