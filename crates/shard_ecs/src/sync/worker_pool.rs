//! # Bounded Worker Pool
//!
//! A fixed set of worker threads consuming a bounded queue of jobs.
//!
//! ```text
//!   execute() ──► [ bounded queue ] ──► worker 0
//!                                  ├──► worker 1
//!                                  └──► worker N-1
//! ```
//!
//! The pool does not decide how work is partitioned. Systems enqueue
//! per-entity or per-batch jobs and call [`WorkerPool::wait_idle`] before
//! returning from their update, so the tick stays sequential across
//! systems.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::config::EngineConfig;
use crate::error::{EcsError, EcsResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Outstanding-job counter shared with the workers.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn begin(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Fixed-size thread pool with a bounded job queue.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use shard_ecs::WorkerPool;
///
/// let mut pool = WorkerPool::new(2, 16)?;
/// let done = Arc::new(AtomicUsize::new(0));
/// for _ in 0..8 {
///     let done = Arc::clone(&done);
///     pool.execute(move || {
///         done.fetch_add(1, Ordering::Relaxed);
///     })?;
/// }
/// pool.wait_idle();
/// assert_eq!(done.load(Ordering::Relaxed), 8);
/// pool.close();
/// # Ok::<(), shard_ecs::EcsError>(())
/// ```
pub struct WorkerPool {
    /// `None` once closed.
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<Pending>,
    worker_count: usize,
}

impl WorkerPool {
    /// Starts `workers` threads sharing a queue of `queue_capacity` jobs.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidConfig`] if either argument is zero
    /// - [`EcsError::WorkerSpawn`] if a thread cannot be started
    pub fn new(workers: usize, queue_capacity: usize) -> EcsResult<Self> {
        if workers == 0 {
            return Err(EcsError::InvalidConfig(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if queue_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "worker queue capacity must be at least 1".to_string(),
            ));
        }

        let (sender, receiver) = bounded::<Job>(queue_capacity);
        let pending = Arc::new(Pending::default());

        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(workers),
            pending,
            worker_count: workers,
        };
        for index in 0..workers {
            let receiver = receiver.clone();
            let pending = Arc::clone(&pool.pending);
            let handle = thread::Builder::new()
                .name(format!("shard-ecs-worker-{index}"))
                .spawn(move || Self::worker_loop(index, &receiver, &pending))
                .map_err(|e| EcsError::WorkerSpawn(e.to_string()));
            match handle {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    // Join whatever did start before reporting.
                    pool.close();
                    return Err(err);
                }
            }
        }

        tracing::info!(workers, queue_capacity, "worker pool started");
        Ok(pool)
    }

    /// Starts a pool sized by `worker_threads` / `worker_queue_capacity`.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::new`].
    pub fn from_config(config: &EngineConfig) -> EcsResult<Self> {
        Self::new(config.worker_threads, config.worker_queue_capacity)
    }

    /// Worker thread main loop. Ends once the queue is closed and drained.
    fn worker_loop(index: usize, receiver: &Receiver<Job>, pending: &Pending) {
        for job in receiver.iter() {
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                tracing::warn!(worker = index, "worker job panicked, continuing");
            }
            pending.finish();
        }
    }

    /// Enqueues a job, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::WorkerPoolClosed`] after [`WorkerPool::close`].
    pub fn execute<F>(&self, job: F) -> EcsResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(EcsError::WorkerPoolClosed)?;
        self.pending.begin();
        if sender.send(Box::new(job)).is_err() {
            self.pending.finish();
            return Err(EcsError::WorkerPoolClosed);
        }
        Ok(())
    }

    /// Blocks until every job submitted so far has finished.
    ///
    /// Must not be called from inside a job.
    pub fn wait_idle(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.idle.wait(&mut count);
        }
    }

    /// Jobs queued or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Number of worker threads.
    #[inline]
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Whether [`WorkerPool::close`] has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Stops accepting jobs, drains the queue and joins every worker.
    ///
    /// Blocks until all queued work has run. Later calls are no-ops;
    /// dropping the pool closes it too.
    pub fn close(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        drop(sender);
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread exited abnormally");
            }
        }
        tracing::info!(workers = self.worker_count, "worker pool closed");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}
