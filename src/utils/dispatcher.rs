//! Worker pool used to fan a timestep's independent work items out across threads.
//!
//! Every callback receives the index of the worker running it. Callbacks must
//! only write to the item they were handed; anything else they touch is shared
//! read-only across workers.

use parking_lot::Mutex;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{PhysicsError, Result};

/// Items processed by one worker since the last reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerLoad {
    pub items: u64,
}

/// Fixed-size pool sized once at startup.
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    worker_count: usize,
    // One slot per worker; a worker only ever locks its own slot.
    loads: Vec<Mutex<WorkerLoad>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(PhysicsError::WorkerPoolUnavailable(
                "worker count must be at least 1".to_string(),
            ));
        }

        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|index| format!("physics-worker-{index}"))
            .build()
            .map_err(|err| PhysicsError::WorkerPoolUnavailable(err.to_string()))?;

        log::debug!("worker pool started with {worker_count} workers");

        Ok(Self {
            #[cfg(feature = "parallel")]
            pool,
            worker_count,
            loads: (0..worker_count)
                .map(|_| Mutex::new(WorkerLoad::default()))
                .collect(),
        })
    }

    /// Pool with one worker per available processor.
    pub fn with_available_parallelism() -> Result<Self> {
        let count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(count)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs `body` once per item, possibly concurrently.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], body: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        if items.is_empty() {
            return;
        }

        #[cfg(feature = "parallel")]
        self.pool.install(|| {
            items.par_iter_mut().for_each(|item| {
                let worker = self.current_worker();
                body(worker, item);
                self.record(worker);
            });
        });

        #[cfg(not(feature = "parallel"))]
        for item in items.iter_mut() {
            body(0, item);
            self.record(0);
        }
    }

    /// Maps every item through `body`, keeping the `Some` results in input order.
    pub fn filter_map<T, R, F>(&self, items: &[T], body: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> Option<R> + Sync,
    {
        if items.is_empty() {
            return Vec::new();
        }

        #[cfg(feature = "parallel")]
        let results = self.pool.install(|| {
            items
                .par_iter()
                .filter_map(|item| {
                    let worker = self.current_worker();
                    let result = body(worker, item);
                    self.record(worker);
                    result
                })
                .collect()
        });

        #[cfg(not(feature = "parallel"))]
        let results = items
            .iter()
            .filter_map(|item| {
                let result = body(0, item);
                self.record(0);
                result
            })
            .collect();

        results
    }

    /// Snapshot of per-worker counters.
    pub fn worker_loads(&self) -> Vec<WorkerLoad> {
        self.loads.iter().map(|slot| *slot.lock()).collect()
    }

    #[cfg(feature = "parallel")]
    fn current_worker(&self) -> usize {
        rayon::current_thread_index()
            .unwrap_or(0)
            .min(self.worker_count - 1)
    }

    fn record(&self, worker: usize) {
        self.loads[worker].lock().items += 1;
    }
}
