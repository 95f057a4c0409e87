//! Multidirectional search: derivative-free simplex optimization.
//!
//! The algorithm of Torczon evolves a simplex of `n+1` vertices by
//! transforming the entire non-best face through the current best vertex
//! each iteration, so every iteration's candidates form one batch for
//! [`ParallelEvaluationCache::evaluate_all`]. The transformation
//! coefficients are the standard multidirectional-search constants:
//!
//! - reflection: `r_i = b + 1.0 * (b - v_i)`
//! - expansion:  `e_i = b + 2.0 * (b - v_i)`
//! - shrink:     `c_i = b - 0.5 * (b - v_i)` (contraction toward best)
//!
//! One iteration: evaluate the reflected face. If its best value improves
//! on the current best vertex, evaluate the expanded face too and keep
//! whichever face is better; the accepted step is reported to the
//! controller. Otherwise the simplex shrinks toward the best vertex; a
//! shrink that happens to improve on the best is reported as an accepted
//! step as well, and a shrink with no improvement is a silent extra
//! iteration (bounded by the iteration cap and the simplex-size floor).

use crate::cache::ParallelEvaluationCache;
use crate::error::Result;
use crate::point::Point;
use crate::types::{
    Function, OptimizationController, OptimizationResult, OptimizerOptions, Statistics,
    TerminationReason,
};

/// Reflection coefficient.
const REFLECTION_COEFF: f64 = 1.0;
/// Expansion factor.
const EXPANSION_COEFF: f64 = 2.0;
/// Contraction/shrink factor, expressed as a face transformation through
/// the best vertex: `b - 0.5 * (b - v_i)` is the midpoint of `b` and `v_i`.
const SHRINK_COEFF: f64 = -0.5;

// ──────────────────────────────────────────────────────────────────────────────
// Simplex
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Vertex {
    point: Point,
    value: f64,
}

/// `n+1` scored vertices, kept ordered ascending by value. Ties keep their
/// prior order (stable sort), so the search is deterministic given
/// deterministic evaluation.
struct Simplex {
    vertices: Vec<Vertex>,
}

impl Simplex {
    fn new(points: Vec<Point>, values: Vec<f64>) -> Self {
        debug_assert_eq!(points.len(), values.len());
        let mut simplex = Self {
            vertices: points
                .into_iter()
                .zip(values)
                .map(|(point, value)| Vertex { point, value })
                .collect(),
        };
        simplex.order();
        simplex
    }

    fn order(&mut self) {
        self.vertices.sort_by(|a, b| a.value.total_cmp(&b.value));
    }

    fn best(&self) -> &Vertex {
        &self.vertices[0]
    }

    /// Characteristic size: maximum Euclidean distance from the best vertex
    /// to any other. The controller's step size and the collapse check both
    /// use this same norm.
    fn size(&self) -> f64 {
        let best = &self.vertices[0].point;
        self.vertices[1..]
            .iter()
            .map(|v| v.point.sub(best).length())
            .fold(0.0, f64::max)
    }

    /// Transform every non-best vertex through the best one:
    /// `b + coeff * (b - v_i)`.
    fn transform_face(&self, coeff: f64) -> Vec<Point> {
        let best = &self.vertices[0].point;
        self.vertices[1..]
            .iter()
            .map(|v| best.add(&best.sub(&v.point).scale(coeff)))
            .collect()
    }

    /// Replace the non-best face with `points`/`values` and restore order.
    fn replace_face(&mut self, points: Vec<Point>, values: Vec<f64>) {
        debug_assert_eq!(points.len(), self.vertices.len() - 1);
        for (vertex, (point, value)) in self.vertices[1..]
            .iter_mut()
            .zip(points.into_iter().zip(values))
        {
            *vertex = Vertex { point, value };
        }
        self.order();
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Optimizer
// ──────────────────────────────────────────────────────────────────────────────

/// Derivative-free simplex optimizer over a [`ParallelEvaluationCache`].
///
/// One instance drives one run at a time from a single control thread; the
/// parallelism lives entirely in the cache's worker pool. The instance may
/// be reused for further runs of the same function, carrying its cache (and
/// cumulative statistics) over.
pub struct MultidirectionalSearchOptimizer<F: Function + 'static> {
    cache: ParallelEvaluationCache<F>,
    options: OptimizerOptions,
    iterations: usize,
    reflections: usize,
    expansions: usize,
    reductions: usize,
    stall_warnings: usize,
}

impl<F: Function + 'static> MultidirectionalSearchOptimizer<F> {
    /// Create an optimizer over `cache`.
    pub fn new(cache: ParallelEvaluationCache<F>, options: OptimizerOptions) -> Self {
        Self {
            cache,
            options,
            iterations: 0,
            reflections: 0,
            expansions: 0,
            reductions: 0,
            stall_warnings: 0,
        }
    }

    /// Run the search from `initial`, reporting each accepted step to
    /// `controller` until it stops the run or a guard triggers.
    ///
    /// Returns the best point and value found together with the termination
    /// reason and the run's statistics.
    ///
    /// # Errors
    /// Propagates evaluation failures and cancellation from the cache.
    pub fn optimize<C>(&mut self, initial: Point, controller: &mut C) -> Result<OptimizationResult>
    where
        C: OptimizationController + ?Sized,
    {
        let n = initial.dim();

        // Initial simplex: the starting point plus one perturbation along
        // each coordinate axis, scored as a single batch.
        let mut points = Vec::with_capacity(n + 1);
        points.push(initial.clone());
        for i in 0..n {
            points.push(initial.add(&Point::axis(n, i, self.options.initial_step)));
        }
        let values = self.cache.evaluate_all(&points)?;
        let mut simplex = Simplex::new(points, values);

        let mut accepted_steps = 0usize;
        let mut run_iterations = 0usize;

        let reason = loop {
            if simplex.size() < self.options.simplex_floor {
                break TerminationReason::SimplexCollapsed;
            }
            if run_iterations >= self.options.max_iterations {
                log::warn!(
                    "iteration limit {} reached at best={} value={}",
                    self.options.max_iterations,
                    simplex.best().point,
                    simplex.best().value
                );
                break TerminationReason::IterationLimit;
            }
            run_iterations += 1;
            self.iterations += 1;

            let old_best = simplex.best().clone();

            let reflected = simplex.transform_face(REFLECTION_COEFF);
            let reflected_values = self.cache.evaluate_all(&reflected)?;

            let improved = if face_min(&reflected_values) < old_best.value {
                // The reflected face improves; see whether doubling the step
                // does better still.
                let expanded = simplex.transform_face(EXPANSION_COEFF);
                let expanded_values = self.cache.evaluate_all(&expanded)?;
                if face_min(&expanded_values) < face_min(&reflected_values) {
                    self.expansions += 1;
                    simplex.replace_face(expanded, expanded_values);
                } else {
                    self.reflections += 1;
                    simplex.replace_face(reflected, reflected_values);
                }
                true
            } else {
                let shrunk = simplex.transform_face(SHRINK_COEFF);
                let shrunk_values = self.cache.evaluate_all(&shrunk)?;
                self.reductions += 1;
                let improved = face_min(&shrunk_values) < old_best.value;
                simplex.replace_face(shrunk, shrunk_values);
                improved
            };

            if improved {
                accepted_steps += 1;
                let interval = self.options.stall_warning_interval;
                if interval > 0 && accepted_steps % interval == 0 {
                    self.stall_warnings += 1;
                    log::warn!(
                        "{} steps taken without the controller stopping; best={} value={}",
                        accepted_steps,
                        simplex.best().point,
                        simplex.best().value
                    );
                }

                let new_best = simplex.best().clone();
                let step_size = simplex.size();
                log::debug!(
                    "step {}: {} -> {} (value {} -> {}, step size {})",
                    accepted_steps,
                    old_best.point,
                    new_best.point,
                    old_best.value,
                    new_best.value,
                    step_size
                );
                if !controller.step_taken(
                    &old_best.point,
                    old_best.value,
                    &new_best.point,
                    new_best.value,
                    step_size,
                ) {
                    break TerminationReason::ControllerStop;
                }
            }
        };

        let best = simplex.best();
        Ok(OptimizationResult {
            point: best.point.clone(),
            value: best.value,
            reason,
            statistics: self.statistics(),
        })
    }

    /// Counters accumulated so far, merged from the optimizer and its
    /// cache.
    pub fn statistics(&self) -> Statistics {
        Statistics {
            iterations: self.iterations,
            evaluations_requested: self.cache.evaluations_requested(),
            evaluations_computed: self.cache.evaluations_computed(),
            cache_hits: self.cache.cache_hits(),
            reflections: self.reflections,
            expansions: self.expansions,
            reductions: self.reductions,
            stall_warnings: self.stall_warnings,
        }
    }
}

fn face_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}
