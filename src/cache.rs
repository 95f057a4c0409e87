//! Memoized, deduplicated, concurrent function evaluation.
//!
//! [`ParallelEvaluationCache`] turns a possibly-slow [`Function`] into a
//! service with at-most-once evaluation semantics per distinct [`Point`]:
//!
//! - a point never seen before is submitted to the worker pool exactly
//!   once, with an in-flight slot inserted into the table first;
//! - concurrent requesters for an already in-flight point attach to the
//!   same slot instead of re-submitting;
//! - a resolved point is served straight from the table;
//! - a point whose [`pre_computed`](Function::pre_computed) check yields a
//!   definitive value never touches the table or the pool at all.
//!
//! The table mutex is held only for lookup, insert, and resolve — never
//! across an evaluation — so distinct keys do not serialize each other.
//!
//! Failed or cancelled evaluations propagate their error to every waiter
//! and remove the table entry, leaving the point retryable. Failures are
//! never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{OptimError, Result};
use crate::point::Point;
use crate::pool::WorkerPool;
use crate::types::Function;

// ──────────────────────────────────────────────────────────────────────────────
// In-flight slot
// ──────────────────────────────────────────────────────────────────────────────

enum SlotState {
    Pending,
    Ready(f64),
    Failed(OptimError),
}

/// One pending computation; every waiter for the same point blocks on the
/// same slot.
struct Slot {
    state: Mutex<SlotState>,
    resolved: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            resolved: Condvar::new(),
        }
    }

    fn resolve(&self, result: Result<f64>) {
        let mut state = self.state.lock();
        *state = match result {
            Ok(v) => SlotState::Ready(v),
            Err(e) => SlotState::Failed(e),
        };
        self.resolved.notify_all();
    }

    fn wait(&self) -> Result<f64> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                SlotState::Pending => self.resolved.wait(&mut state),
                SlotState::Ready(v) => return Ok(*v),
                SlotState::Failed(e) => return Err(e.clone()),
            }
        }
    }
}

enum Entry {
    InFlight(Arc<Slot>),
    Resolved(f64),
}

/// What one requested point resolved to during the lookup phase.
enum Outcome {
    /// Known immediately: a `pre_computed` short-circuit or a table hit.
    Known(f64),
    /// In flight; block on the slot.
    Wait(Arc<Slot>),
}

type Table = Mutex<HashMap<Point, Entry>>;

// ──────────────────────────────────────────────────────────────────────────────
// Cache
// ──────────────────────────────────────────────────────────────────────────────

/// Deduplicated, concurrency-safe, bulk-evaluable wrapper around a
/// [`Function`] and a [`WorkerPool`].
///
/// One cache serves one function. Runs over different functions sharing a
/// pool must each use their own cache instance.
pub struct ParallelEvaluationCache<F: Function + 'static> {
    function: Arc<F>,
    pool: Arc<WorkerPool>,
    table: Arc<Table>,
    requested: AtomicUsize,
    computed: AtomicUsize,
    hits: AtomicUsize,
}

impl<F: Function + 'static> ParallelEvaluationCache<F> {
    /// Create a cache for `function`, evaluating on `pool`.
    pub fn new(function: F, pool: Arc<WorkerPool>) -> Self {
        Self {
            function: Arc::new(function),
            pool,
            table: Arc::new(Mutex::new(HashMap::new())),
            requested: AtomicUsize::new(0),
            computed: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    /// Evaluate the function at `point`, blocking until the value is
    /// available.
    ///
    /// # Errors
    /// - `EvaluationFailed` if the function failed at this point (the entry
    ///   is invalidated; retrying is allowed).
    /// - `Cancelled` if the evaluation was cancelled or the pool shut down.
    pub fn evaluate(&self, point: &Point) -> Result<f64> {
        self.requested.fetch_add(1, Ordering::Relaxed);

        let pre = self.function.pre_computed(point);
        if !pre.is_nan() {
            return Ok(pre);
        }

        match self.lookup_or_submit(point)? {
            Outcome::Known(v) => Ok(v),
            Outcome::Wait(slot) => slot.wait(),
        }
    }

    /// Evaluate the function at every point of `points`, submitting all
    /// not-yet-cached points to the pool before waiting on any of them.
    ///
    /// Output position `i` always corresponds to input position `i`,
    /// regardless of completion order. Duplicate points within one batch
    /// share a single computation.
    ///
    /// # Errors
    /// `DimensionMismatch` if the points do not all share one dimension, or
    /// the first evaluation error encountered while collecting results.
    pub fn evaluate_all(&self, points: &[Point]) -> Result<Vec<f64>> {
        let Some(first) = points.first() else {
            return Ok(Vec::new());
        };
        let expected = first.dim();
        for p in points {
            if p.dim() != expected {
                return Err(OptimError::DimensionMismatch {
                    expected,
                    actual: p.dim(),
                });
            }
        }

        // Phase 1: short-circuits and lookups; submits everything missing.
        let mut outcomes = Vec::with_capacity(points.len());
        for point in points {
            self.requested.fetch_add(1, Ordering::Relaxed);
            let pre = self.function.pre_computed(point);
            if !pre.is_nan() {
                outcomes.push(Outcome::Known(pre));
            } else {
                outcomes.push(self.lookup_or_submit(point)?);
            }
        }

        // Phase 2: collect in input order.
        outcomes
            .into_iter()
            .map(|o| match o {
                Outcome::Known(v) => Ok(v),
                Outcome::Wait(slot) => slot.wait(),
            })
            .collect()
    }

    /// Look `point` up in the table; on a miss, insert an in-flight slot
    /// and submit the evaluation while the table lock is already released.
    fn lookup_or_submit(&self, point: &Point) -> Result<Outcome> {
        let slot = {
            let mut table = self.table.lock();
            match table.get(point) {
                Some(Entry::Resolved(v)) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Outcome::Known(*v));
                }
                Some(Entry::InFlight(slot)) => return Ok(Outcome::Wait(Arc::clone(slot))),
                None => {
                    let slot = Arc::new(Slot::new());
                    table.insert(point.clone(), Entry::InFlight(Arc::clone(&slot)));
                    slot
                }
            }
        };

        self.spawn_evaluation(point.clone(), Arc::clone(&slot))?;
        // Counted only after the pool accepted the task, so a rejected
        // submission never registers as a computation.
        self.computed.fetch_add(1, Ordering::Relaxed);
        Ok(Outcome::Wait(slot))
    }

    fn spawn_evaluation(&self, point: Point, slot: Arc<Slot>) -> Result<()> {
        let function = Arc::clone(&self.function);
        let pool = Arc::clone(&self.pool);
        let table = Arc::clone(&self.table);

        let submitted = self.pool.submit({
            let point = point.clone();
            let slot = Arc::clone(&slot);
            move || {
                // A task that was still queued when the pool shut down is
                // discarded: its waiters observe cancellation.
                let result = if pool.is_shut_down() {
                    Err(OptimError::Cancelled)
                } else {
                    function.evaluate(&point)
                };
                finish(&table, &point, &slot, result);
            }
        });

        if let Err(e) = submitted {
            // Pool rejected the task; resolve the slot ourselves so no
            // attached waiter hangs, and leave the point retryable.
            finish(&self.table, &point, &slot, Err(e.clone()));
            return Err(e);
        }
        Ok(())
    }

    /// Requests served, including cache hits and short-circuits.
    pub fn evaluations_requested(&self) -> usize {
        self.requested.load(Ordering::Relaxed)
    }

    /// Evaluations submitted to the pool, at most one per distinct point.
    pub fn evaluations_computed(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }

    /// Requests served from the resolved table.
    pub fn cache_hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Publish `result` to the table and to every waiter on `slot`.
///
/// On success the entry becomes `Resolved`; on failure the entry is removed
/// (only if it still refers to this computation) so the point can be
/// retried.
fn finish(table: &Table, point: &Point, slot: &Arc<Slot>, result: Result<f64>) {
    {
        let mut table = table.lock();
        match &result {
            Ok(v) => {
                table.insert(point.clone(), Entry::Resolved(*v));
            }
            Err(_) => {
                if matches!(table.get(point), Some(Entry::InFlight(s)) if Arc::ptr_eq(s, slot)) {
                    table.remove(point);
                }
            }
        }
    }
    slot.resolve(result);
}
