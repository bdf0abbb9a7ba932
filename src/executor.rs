//! A reusable fan-out/join scheduler for per-neuron tasks.

use crate::error::{Error, Result};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Runs one task per neuron on a work-stealing thread pool.
///
/// Every call blocks the calling thread until all tasks it dispatched have
/// finished, which makes each call a barrier between layers.
pub struct ParallelExecutor {
    pool: ThreadPool,
}

impl ParallelExecutor {
    /// Builds a pool with `threads` workers, or rayon's default when
    /// `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("neuron-worker-{}", i))
            .build()
            .map_err(|e| Error::Config(format!("cannot build worker pool: {}", e)))?;
        debug!("worker pool started with {} threads", pool.current_num_threads());
        Ok(ParallelExecutor { pool })
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Dispatches `task` once for every item of `tasks` and joins.
    ///
    /// The task receives the neuron index alongside its item. The first error
    /// returned by any task is handed back to the caller; a panicking task is
    /// reported as `Error::Runtime` instead of unwinding through the caller.
    pub fn for_each_neuron<I, F>(&self, tasks: I, task: F) -> Result<()>
    where
        I: IntoParallelIterator + Send,
        I::Iter: IndexedParallelIterator,
        F: Fn(usize, I::Item) -> Result<()> + Sync + Send,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                tasks
                    .into_par_iter()
                    .enumerate()
                    .try_for_each(|(neuron, item)| task(neuron, item))
            })
        }));
        match outcome {
            Ok(result) => result,
            Err(payload) => Err(Error::Runtime(format!(
                "neuron task panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

impl fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("threads", &self.threads())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
