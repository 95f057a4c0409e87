//! # mdsearch: parallel multidirectional search optimization
//!
//! A derivative-free optimizer for expensive, black-box, multi-dimensional
//! objective functions, paired with a concurrency layer that parallelizes
//! and memoizes function evaluations.
//!
//! ## Overview
//!
//! The crate has two tightly coupled halves:
//!
//! 1. **[`ParallelEvaluationCache`]**: wraps a [`Function`] and a bounded
//!    [`WorkerPool`]; guarantees at-most-once evaluation per distinct
//!    [`Point`], lets concurrent requesters for the same point join a single
//!    in-flight computation, and evaluates whole batches of candidate
//!    points in parallel.
//!
//! 2. **[`MultidirectionalSearchOptimizer`]**: the multidirectional search
//!    algorithm of Torczon, a simplex method that reflects and expands the
//!    entire non-best face of the simplex per iteration. Because every
//!    iteration produces a full face of candidate points at once, the
//!    method parallelizes naturally over the evaluation cache — unlike
//!    sequential single-vertex Nelder-Mead updates.
//!
//! A typical run constructs a [`Function`] (the expensive objective), wraps
//! it in a cache bound to a worker pool, and hands the cache to the
//! optimizer together with an [`OptimizationController`] that observes each
//! accepted step and decides when to stop:
//!
//! ```
//! use std::sync::Arc;
//! use mdsearch::{
//!     MultidirectionalSearchOptimizer, OptimizerOptions, ParallelEvaluationCache,
//!     Point, WorkerPool,
//! };
//!
//! let target = Point::from(vec![0.3, 0.7]);
//! let objective = {
//!     let target = target.clone();
//!     move |p: &Point| p.sub(&target).length2()
//! };
//!
//! let pool = Arc::new(WorkerPool::new(2, 100).unwrap());
//! let cache = ParallelEvaluationCache::new(objective, pool);
//! let mut optimizer =
//!     MultidirectionalSearchOptimizer::new(cache, OptimizerOptions::default());
//!
//! let mut controller =
//!     |_old: &Point, _old_f: f64, new: &Point, _new_f: f64, _step: f64| {
//!         new.sub(&target).length() >= 0.01
//!     };
//! let result = optimizer
//!     .optimize(Point::uniform(2, 0.5), &mut controller)
//!     .unwrap();
//! assert!(result.point.sub(&target).length() < 0.01);
//! ```
//!
//! ## References
//!
//! - Torczon, V. "On the Convergence of the Multidirectional Search
//!   Algorithm." SIAM J. Optimization 1(1), 123–145 (1991).
//! - Dennis, J.E. & Torczon, V. "Direct Search Methods on Parallel
//!   Machines." SIAM J. Optimization 1(4), 448–474 (1991).

pub mod cache;
pub mod error;
pub mod optimizer;
pub mod point;
pub mod pool;
pub mod types;

// Re-export main types
pub use cache::ParallelEvaluationCache;
pub use error::{OptimError, Result};
pub use optimizer::MultidirectionalSearchOptimizer;
pub use point::Point;
pub use pool::WorkerPool;
pub use types::{
    Function, OptimizationController, OptimizationResult, OptimizerOptions, Statistics,
    TerminationReason,
};
