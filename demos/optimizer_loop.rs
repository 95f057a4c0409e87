//! Benchmark driver: repeated optimization runs against random optima.
//!
//! For each dimension 1 through 10, runs 200 random restarts of the
//! box-constrained quadratic `f(p) = ||p - optimum||²` on `[0,1]^n` from
//! the center point, stopping each run when the distance to the optimum
//! drops below the precision, and prints per-dimension statistics of the
//! step and evaluation counts plus the accumulated run counters.
//!
//! Run with: `cargo run --example optimizer_loop --release`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;

use mdsearch::{
    Function, MultidirectionalSearchOptimizer, OptimizerOptions, ParallelEvaluationCache, Point,
    Result, Statistics, WorkerPool,
};

const PRECISION: f64 = 0.01;
const RESTARTS: usize = 200;
const MAX_DIM: usize = 10;

struct BoxedQuadratic {
    optimum: Point,
    evaluations: Arc<AtomicUsize>,
}

impl Function for BoxedQuadratic {
    fn evaluate(&self, point: &Point) -> Result<f64> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
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

/// One run; returns (accepted steps, expensive evaluations, run counters).
fn run_once(pool: &Arc<WorkerPool>, optimum: Point) -> (usize, usize, Statistics) {
    let dim = optimum.dim();
    let evaluations = Arc::new(AtomicUsize::new(0));
    let cache = ParallelEvaluationCache::new(
        BoxedQuadratic {
            optimum: optimum.clone(),
            evaluations: Arc::clone(&evaluations),
        },
        Arc::clone(pool),
    );
    let mut optimizer = MultidirectionalSearchOptimizer::new(cache, OptimizerOptions::default());

    let mut steps = 0usize;
    let mut controller = |_: &Point, _: f64, new: &Point, _: f64, _: f64| {
        steps += 1;
        new.sub(&optimum).length() >= PRECISION
    };
    let result = optimizer
        .optimize(Point::uniform(dim, 0.5), &mut controller)
        .expect("optimization failed");
    (steps, evaluations.load(Ordering::Relaxed), result.statistics)
}

fn accumulate(total: &mut Statistics, run: &Statistics) {
    total.iterations += run.iterations;
    total.evaluations_requested += run.evaluations_requested;
    total.evaluations_computed += run.evaluations_computed;
    total.cache_hits += run.cache_hits;
    total.reflections += run.reflections;
    total.expansions += run.expansions;
    total.reductions += run.reductions;
    total.stall_warnings += run.stall_warnings;
}

fn average(values: &[usize]) -> f64 {
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

fn stddev(values: &[usize]) -> f64 {
    let avg = average(values);
    let var = values
        .iter()
        .map(|&v| (v as f64 - avg).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    var.sqrt()
}

fn median(values: &[usize]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    } else {
        sorted[n / 2] as f64
    }
}

fn main() {
    eprintln!("PRECISION = {PRECISION}");

    let pool = Arc::new(WorkerPool::new(2, 100).expect("failed to create worker pool"));
    let mut rng = rand::thread_rng();

    for dim in 1..=MAX_DIM {
        let mut step_counts = Vec::with_capacity(RESTARTS);
        let mut eval_counts = Vec::with_capacity(RESTARTS);
        let mut totals = Statistics::default();

        for _ in 0..RESTARTS {
            let optimum =
                Point::from((0..dim).map(|_| rng.gen::<f64>()).collect::<Vec<_>>());
            let (steps, evals, stats) = run_once(&pool, optimum);
            step_counts.push(steps);
            eval_counts.push(evals);
            accumulate(&mut totals, &stats);
        }

        println!(
            "dim={}  Steps avg={:5.2} dev={:5.2} median={:.1}  \
             Evaluations avg={:5.2} dev={:5.2} median={:.1}",
            dim,
            average(&step_counts),
            stddev(&step_counts),
            median(&step_counts),
            average(&eval_counts),
            stddev(&eval_counts),
            median(&eval_counts),
        );
        println!("stat: {totals}");
    }

    pool.shutdown();
}
