//! Bounded worker pool for objective function evaluations.
//!
//! A [`WorkerPool`] is a fixed-size rayon thread pool behind a bounded
//! submission gate. The backpressure policy is explicit: [`submit`]
//! **blocks** the submitting thread while the number of outstanding tasks
//! (queued plus running) equals the configured capacity, and wakes when a
//! task finishes or the pool shuts down.
//!
//! [`shutdown`] is immediate from the caller's point of view: it flips an
//! atomic flag and wakes every blocked submitter with
//! [`OptimError::Cancelled`]. Tasks already queued are not torn out of the
//! rayon queue; instead the evaluation cache checks the flag when a task
//! starts and resolves the task's waiters with `Cancelled` rather than
//! evaluating, so nobody hangs on a discarded task.
//!
//! [`submit`]: WorkerPool::submit
//! [`shutdown`]: WorkerPool::shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{OptimError, Result};

/// A fixed-size worker pool with a bounded submission queue.
///
/// Multiple independent optimization runs may share one pool; each run must
/// still use its own [`ParallelEvaluationCache`](crate::ParallelEvaluationCache),
/// since cache correctness assumes one function per cache.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    shared: Arc<PoolShared>,
}

struct PoolShared {
    /// Maximum outstanding tasks (queued + running).
    capacity: usize,
    /// Current outstanding task count, guarded for the condvar.
    outstanding: Mutex<usize>,
    /// Signaled when a task finishes or the pool shuts down.
    changed: Condvar,
    shutdown: AtomicBool,
}

impl WorkerPool {
    /// Create a pool with `threads` worker threads and room for `capacity`
    /// outstanding tasks.
    ///
    /// # Errors
    /// Returns `OptimError::InvalidArgs` if either argument is zero or the
    /// underlying thread pool cannot be built.
    pub fn new(threads: usize, capacity: usize) -> Result<Self> {
        if threads == 0 || capacity == 0 {
            return Err(OptimError::InvalidArgs(
                "worker pool needs at least one thread and one queue slot".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mdsearch-worker-{i}"))
            .build()
            .map_err(|e| OptimError::InvalidArgs(format!("failed to build thread pool: {e}")))?;
        Ok(Self {
            pool,
            shared: Arc::new(PoolShared {
                capacity,
                outstanding: Mutex::new(0),
                changed: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }),
        })
    }

    /// Submit a task for execution, blocking while the pool is at capacity.
    ///
    /// # Errors
    /// Returns `OptimError::Cancelled` if the pool is (or becomes, while
    /// blocked) shut down.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        {
            let mut outstanding = self.shared.outstanding.lock();
            loop {
                if self.shared.shutdown.load(Ordering::Acquire) {
                    return Err(OptimError::Cancelled);
                }
                if *outstanding < self.shared.capacity {
                    break;
                }
                self.shared.changed.wait(&mut outstanding);
            }
            *outstanding += 1;
        }

        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            task();
            let mut outstanding = shared.outstanding.lock();
            *outstanding -= 1;
            shared.changed.notify_all();
        });
        Ok(())
    }

    /// Shut the pool down.
    ///
    /// Blocked and future submitters observe `Cancelled`. Already-running
    /// tasks finish normally; already-queued tasks should consult
    /// [`is_shut_down`](Self::is_shut_down) on entry and bail out.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.changed.notify_all();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(WorkerPool::new(0, 10).is_err());
        assert!(WorkerPool::new(2, 0).is_err());
    }

    #[test]
    fn test_tasks_run() {
        let pool = WorkerPool::new(2, 10).unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            pool.submit(move || tx.send(i).unwrap()).unwrap();
        }
        let mut got: Vec<i32> = (0..5).map(|_| rx.recv().unwrap()).collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_submit_after_shutdown_is_cancelled() {
        let pool = WorkerPool::new(1, 1).unwrap();
        pool.shutdown();
        assert_eq!(pool.submit(|| ()).unwrap_err(), OptimError::Cancelled);
    }

    #[test]
    fn test_shutdown_wakes_blocked_submitter() {
        let pool = Arc::new(WorkerPool::new(1, 1).unwrap());
        let (tx, rx) = mpsc::channel();

        // Occupy the only slot with a task that waits for permission to end.
        let (release_tx, release_rx) = mpsc::channel::<()>();
        pool.submit(move || {
            release_rx.recv().unwrap();
        })
        .unwrap();

        let submitter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                // Blocks on the full queue until shutdown.
                tx.send(pool.submit(|| ())).unwrap();
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        pool.shutdown();
        assert_eq!(rx.recv().unwrap().unwrap_err(), OptimError::Cancelled);
        submitter.join().unwrap();
        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_backpressure_bounds_outstanding_tasks() {
        let pool = Arc::new(WorkerPool::new(2, 2).unwrap());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        // Wait for the queue to drain.
        while *pool.shared.outstanding.lock() > 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
