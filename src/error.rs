//! Error types for mdsearch.
//!
//! Evaluation failures and cancellations are propagated to every task
//! waiting on the affected point; they are never cached, so a later request
//! for the same point starts a fresh computation.

use thiserror::Error;

/// Errors surfaced by the evaluation cache, the worker pool, or the
/// optimizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimError {
    /// The underlying objective function failed at a point. The cache entry
    /// for that point is invalidated, so the point may be retried later.
    #[error("function evaluation failed: {0}")]
    EvaluationFailed(String),

    /// An evaluation or a wait on one was cancelled, typically because the
    /// worker pool was shut down while the task was still queued. Not
    /// retried automatically.
    #[error("evaluation cancelled")]
    Cancelled,

    /// A batch mixed points of different dimensions. This is a programming
    /// error in the caller; nothing is truncated or padded.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first point in the batch.
        expected: usize,
        /// Offending dimension.
        actual: usize,
    },

    /// Invalid construction arguments (zero dimension, empty batch, ...).
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Result type alias for mdsearch operations.
pub type Result<T> = std::result::Result<T, OptimError>;
