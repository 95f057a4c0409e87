//! Core type definitions: capability traits, optimizer options, run
//! results, and statistics.

use std::fmt;

use crate::error::Result;
use crate::point::Point;

// ──────────────────────────────────────────────────────────────────────────────
// Capability traits
// ──────────────────────────────────────────────────────────────────────────────

/// The black-box objective function being optimized.
///
/// From the optimizer's perspective the mapping must be pure: deterministic
/// and side-effect-free. The evaluation cache depends on this — it will
/// serve a memoized value for a repeated point without calling
/// [`evaluate`](Function::evaluate) again.
///
/// Implementations run on worker-pool threads, hence the `Send + Sync`
/// bound.
pub trait Function: Send + Sync {
    /// The expensive, possibly long-running computation.
    ///
    /// May return [`OptimError::Cancelled`](crate::OptimError::Cancelled)
    /// if the computation supports external interruption, or
    /// [`OptimError::EvaluationFailed`](crate::OptimError::EvaluationFailed)
    /// on failure. Either outcome is propagated to every task waiting on
    /// this point and the point is left retryable.
    fn evaluate(&self, point: &Point) -> Result<f64>;

    /// A cheap pre-check that can short-circuit evaluation entirely.
    ///
    /// Returns [`f64::NAN`] (the sentinel) when no short-circuit applies;
    /// any other value is taken as definitive and bypasses both the cache
    /// table and the worker pool. The typical use is box constraints:
    /// return `f64::MAX` for out-of-domain points.
    fn pre_computed(&self, _point: &Point) -> f64 {
        f64::NAN
    }
}

/// Plain closures are infallible objective functions with no short-circuit.
impl<F> Function for F
where
    F: Fn(&Point) -> f64 + Send + Sync,
{
    fn evaluate(&self, point: &Point) -> Result<f64> {
        Ok(self(point))
    }
}

/// Observation hook and stopping decision, invoked once per accepted step.
///
/// Called strictly sequentially from the optimizer's single driving thread,
/// so implementations need no internal synchronization. The optimizer never
/// reports a `new_value` worse than the previous best.
pub trait OptimizationController {
    /// Called after an accepted improvement with the previous best point
    /// and value, the new best point and value, and the step size (the
    /// simplex's characteristic size at this iteration, measured as the
    /// maximum Euclidean distance from the best vertex to any other).
    ///
    /// Return `true` to continue the search, `false` to stop.
    fn step_taken(
        &mut self,
        old_point: &Point,
        old_value: f64,
        new_point: &Point,
        new_value: f64,
        step_size: f64,
    ) -> bool;
}

impl<F> OptimizationController for F
where
    F: FnMut(&Point, f64, &Point, f64, f64) -> bool,
{
    fn step_taken(
        &mut self,
        old_point: &Point,
        old_value: f64,
        new_point: &Point,
        new_value: f64,
        step_size: f64,
    ) -> bool {
        self(old_point, old_value, new_point, new_value, step_size)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────────────────────────────────────

/// Configuration for [`MultidirectionalSearchOptimizer`](crate::MultidirectionalSearchOptimizer).
///
/// The reflection/expansion/shrink coefficients themselves are the standard
/// multidirectional-search constants (reflection 1, expansion 2, shrink
/// 0.5) and are fixed in the optimizer, not configurable here.
#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    /// Perturbation applied along each coordinate axis of the starting
    /// point when building the initial simplex.
    pub initial_step: f64,

    /// Hard cap on iterations, a guard against a controller that never
    /// stops. Hitting it terminates the run with
    /// [`TerminationReason::IterationLimit`] and a `warn`-level log event.
    pub max_iterations: usize,

    /// Emit a `warn`-level stall event every this many accepted steps.
    /// Zero disables stall warnings.
    pub stall_warning_interval: usize,

    /// Numerical floor on the simplex's characteristic size. A simplex that
    /// collapses below it terminates the run, guarding against infinite
    /// shrink loops on degenerate functions.
    pub simplex_floor: f64,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            initial_step: 0.5,
            max_iterations: 10_000,
            stall_warning_interval: 1_000,
            simplex_floor: 1e-12,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Termination and result
// ──────────────────────────────────────────────────────────────────────────────

/// Why an optimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The controller returned `false` from `step_taken`.
    ControllerStop,
    /// The simplex's characteristic size fell below
    /// [`OptimizerOptions::simplex_floor`].
    SimplexCollapsed,
    /// [`OptimizerOptions::max_iterations`] was reached before the
    /// controller stopped the run.
    IterationLimit,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControllerStop => write!(f, "controller requested stop"),
            Self::SimplexCollapsed => write!(f, "simplex collapsed below numerical floor"),
            Self::IterationLimit => write!(f, "iteration limit reached"),
        }
    }
}

/// Result of one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Best point found.
    pub point: Point,

    /// Function value at the best point.
    pub value: f64,

    /// Why the run stopped.
    pub reason: TerminationReason,

    /// Counters accumulated over the run.
    pub statistics: Statistics,
}

// ──────────────────────────────────────────────────────────────────────────────
// Statistics
// ──────────────────────────────────────────────────────────────────────────────

/// Monotone counters accumulated over a run, read-only once it completes.
///
/// `evaluations_computed <= evaluations_requested` always holds: a request
/// served from the cache or by a `pre_computed` short-circuit never reaches
/// the worker pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Simplex iterations performed.
    pub iterations: usize,

    /// Evaluation requests, including cache hits and short-circuits.
    pub evaluations_requested: usize,

    /// Evaluations actually submitted to the worker pool (at most one per
    /// distinct point).
    pub evaluations_computed: usize,

    /// Requests served from the resolved cache table.
    pub cache_hits: usize,

    /// Iterations accepted via the reflected face.
    pub reflections: usize,

    /// Iterations accepted via the expanded face.
    pub expansions: usize,

    /// Shrink iterations.
    pub reductions: usize,

    /// Stall warnings emitted.
    pub stall_warnings: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} requested={} computed={} hits={} \
             reflections={} expansions={} reductions={} stall_warnings={}",
            self.iterations,
            self.evaluations_requested,
            self.evaluations_computed,
            self.cache_hits,
            self.reflections,
            self.expansions,
            self.reductions,
            self.stall_warnings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimError;

    #[test]
    fn test_closure_function() {
        let f = |p: &Point| p.length2();
        assert_eq!(f.evaluate(&Point::from(vec![3.0, 4.0])).unwrap(), 25.0);
        // Closures have no short-circuit.
        assert!(f.pre_computed(&Point::from(vec![3.0, 4.0])).is_nan());
    }

    #[test]
    fn test_pre_computed_override() {
        struct Boxed;
        impl Function for Boxed {
            fn evaluate(&self, _point: &Point) -> Result<f64> {
                Err(OptimError::EvaluationFailed("should not be called".into()))
            }
            fn pre_computed(&self, point: &Point) -> f64 {
                if point.as_slice().iter().any(|&c| !(0.0..=1.0).contains(&c)) {
                    f64::MAX
                } else {
                    f64::NAN
                }
            }
        }
        let f = Boxed;
        assert_eq!(f.pre_computed(&Point::from(vec![1.5])), f64::MAX);
        assert!(f.pre_computed(&Point::from(vec![0.5])).is_nan());
    }

    #[test]
    fn test_closure_controller() {
        let mut calls = 0;
        {
            let mut ctrl = |_: &Point, _: f64, _: &Point, _: f64, _: f64| {
                calls += 1;
                calls < 2
            };
            let p = Point::from(vec![0.0]);
            assert!(ctrl.step_taken(&p, 1.0, &p, 0.5, 0.1));
            assert!(!ctrl.step_taken(&p, 0.5, &p, 0.2, 0.1));
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_default_options() {
        let opts = OptimizerOptions::default();
        assert_eq!(opts.initial_step, 0.5);
        assert_eq!(opts.max_iterations, 10_000);
        assert_eq!(opts.stall_warning_interval, 1_000);
        assert_eq!(opts.simplex_floor, 1e-12);
    }

    #[test]
    fn test_statistics_display() {
        let stats = Statistics {
            iterations: 7,
            evaluations_requested: 30,
            evaluations_computed: 21,
            cache_hits: 4,
            reflections: 4,
            expansions: 2,
            reductions: 1,
            stall_warnings: 0,
        };
        assert_eq!(
            format!("{stats}"),
            "iterations=7 requested=30 computed=21 hits=4 \
             reflections=4 expansions=2 reductions=1 stall_warnings=0"
        );
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(
            format!("{}", TerminationReason::ControllerStop),
            "controller requested stop"
        );
        assert_eq!(
            format!("{}", TerminationReason::IterationLimit),
            "iteration limit reached"
        );
    }
}
