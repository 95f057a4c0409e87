//! Convergence of the optimizer on strictly convex quadratics.
//!
//! Mirrors the crate's benchmark driver: random optima inside `[0,1]^n`,
//! objective `f(p) = ||p - optimum||²` with box constraints applied via
//! `pre_computed`, precision 0.01, repeated random restarts per dimension.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;

use mdsearch::{
    Function, MultidirectionalSearchOptimizer, OptimizerOptions, ParallelEvaluationCache, Point,
    Result, TerminationReason, WorkerPool,
};

const PRECISION: f64 = 0.01;

/// `||p - optimum||²` on `[0,1]^n`, `f64::MAX` outside the box.
struct BoxedQuadratic {
    optimum: Point,
    expensive_calls: Arc<AtomicUsize>,
}

impl Function for BoxedQuadratic {
    fn evaluate(&self, point: &Point) -> Result<f64> {
        self.expensive_calls.fetch_add(1, Ordering::SeqCst);
        Ok(point.sub(&self.optimum).length2())
    }

    fn pre_computed(&self, point: &Point) -> f64 {
        for &c in point.as_slice() {
            if !(0.0..=1.0).contains(&c) {
                return f64::MAX;
            }
        }
        f64::NAN
    }
}

/// Run one optimization toward `optimum`, returning the result and the
/// number of accepted steps.
fn run(optimum: Point) -> (mdsearch::OptimizationResult, usize) {
    let dim = optimum.dim();
    let cache = ParallelEvaluationCache::new(
        BoxedQuadratic {
            optimum: optimum.clone(),
            expensive_calls: Arc::new(AtomicUsize::new(0)),
        },
        Arc::new(WorkerPool::new(2, 100).unwrap()),
    );
    let mut optimizer =
        MultidirectionalSearchOptimizer::new(cache, OptimizerOptions::default());

    let mut steps = 0usize;
    let mut controller = |_: &Point, _: f64, new: &Point, _: f64, _: f64| {
        steps += 1;
        new.sub(&optimum).length() >= PRECISION
    };
    let result = optimizer
        .optimize(Point::uniform(dim, 0.5), &mut controller)
        .unwrap();
    (result, steps)
}

#[test]
fn converges_across_dimensions_with_random_restarts() {
    let mut rng = rand::thread_rng();

    for dim in 1..=5 {
        for _ in 0..20 {
            let optimum = Point::from(
                (0..dim).map(|_| rng.gen::<f64>()).collect::<Vec<_>>(),
            );
            let (result, steps) = run(optimum.clone());

            assert_eq!(
                result.reason,
                TerminationReason::ControllerStop,
                "dim={dim} optimum={optimum}: expected controller-driven stop"
            );
            assert!(
                result.point.sub(&optimum).length() < PRECISION,
                "dim={dim} optimum={optimum}: final point {} too far",
                result.point
            );
            assert!(
                steps < 500,
                "dim={dim} optimum={optimum}: {steps} steps is not bounded convergence"
            );
        }
    }
}

#[test]
fn reported_statistics_are_consistent() {
    let (result, steps) = run(Point::from(vec![0.25, 0.85, 0.4]));
    let stats = result.statistics;

    assert!(stats.evaluations_computed <= stats.evaluations_requested);
    assert!(stats.iterations >= steps, "every accepted step is an iteration");
    assert_eq!(
        stats.iterations,
        stats.reflections + stats.expansions + stats.reductions,
        "every iteration is exactly one of reflect/expand/reduce"
    );
}

#[test]
fn out_of_box_candidates_never_hit_the_expensive_path() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ParallelEvaluationCache::new(
        BoxedQuadratic {
            optimum: Point::from(vec![0.05, 0.05]),
            expensive_calls: Arc::clone(&calls),
        },
        Arc::new(WorkerPool::new(2, 100).unwrap()),
    );

    // Probe one out-of-domain point directly.
    let penalty = cache.evaluate(&Point::from(vec![-0.2, 0.5])).unwrap();
    assert_eq!(penalty, f64::MAX);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.evaluations_computed(), 0);

    // An optimum near the corner forces the search to brush the boundary;
    // the run still converges, and the result stays inside the box.
    let optimum = Point::from(vec![0.05, 0.05]);
    let mut optimizer =
        MultidirectionalSearchOptimizer::new(cache, OptimizerOptions::default());
    let mut controller = |_: &Point, _: f64, new: &Point, _: f64, _: f64| {
        new.sub(&optimum).length() >= PRECISION
    };
    let result = optimizer
        .optimize(Point::uniform(2, 0.5), &mut controller)
        .unwrap();

    assert!(result.point.sub(&optimum).length() < PRECISION);
    assert!(result
        .point
        .as_slice()
        .iter()
        .all(|&c| (0.0..=1.0).contains(&c)));
}
