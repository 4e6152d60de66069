//! Error types for the polygon area estimator.
//!
//! Errors fall into three groups:
//!
//! - [`InputError`]: the polygon or the run parameters are unusable. Always
//!   raised before any worker is spawned.
//! - [`WorkerError`]: a single worker could not complete or publish.
//! - [`EstimateError`]: what the driver reports. Worker failures and
//!   aggregation timeouts both abort the run without an estimate.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Invalid polygon input or run parameters.
#[derive(Debug, Error)]
pub enum InputError {
    /// The polygon file could not be read.
    #[error("failed to read polygon file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line of polygon input is not a pair of finite `x,y` decimals.
    #[error("malformed vertex on line {line}: {content:?}")]
    Parse { line: usize, content: String },

    /// Fewer than three vertices cannot form a polygon.
    #[error("a polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// A vertex lies at or beyond the ray-casting extreme point.
    #[error("vertex {index} has x = {x}, which is not below the ray bound {bound}")]
    VertexOutOfRange { index: usize, x: f64, bound: f64 },

    /// Zero workers requested.
    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    /// Not every worker would receive at least one sample.
    #[error("total sample count {total} is smaller than the worker count {workers}")]
    TooFewSamples { total: u64, workers: usize },

    /// Any other out-of-range parameter.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter { name: &'static str, value: String },
}

/// Failure of a single worker.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// The OS refused to start the worker.
    #[error("worker {worker_id} could not be started: {reason}")]
    SpawnFailed { worker_id: usize, reason: String },

    /// The result channel or shared tally was gone when the worker finished.
    #[error("worker {worker_id} could not publish its result")]
    PublishFailed { worker_id: usize },

    /// The worker panicked before publishing.
    #[error("worker {worker_id} panicked")]
    Panicked { worker_id: usize },

    /// The aggregator refused the worker's contribution.
    #[error("result from worker {worker_id} rejected: {reason}")]
    Rejected { worker_id: usize, reason: String },
}

impl WorkerError {
    /// Id of the worker this error belongs to.
    pub fn worker_id(&self) -> usize {
        match self {
            Self::SpawnFailed { worker_id, .. }
            | Self::PublishFailed { worker_id }
            | Self::Panicked { worker_id }
            | Self::Rejected { worker_id, .. } => *worker_id,
        }
    }
}

/// Error reported by an estimator run.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error(transparent)]
    Input(#[from] InputError),

    /// One or more workers failed, or their results never arrived.
    #[error(
        "{} worker(s) failed and {} result(s) are missing{}",
        .failed.len(),
        .missing.len(),
        describe_failures(.failed)
    )]
    WorkerFailure {
        failed: Vec<WorkerError>,
        missing: Vec<usize>,
    },

    /// The driver gave up waiting for worker results.
    #[error("timed out after {waited:?} with {received} of {expected} worker results")]
    AggregationTimeout {
        waited: Duration,
        received: usize,
        expected: usize,
    },
}

impl EstimateError {
    /// True for errors that mean the worker pool did not deliver.
    ///
    /// A timeout counts as a worker failure.
    pub fn is_worker_failure(&self) -> bool {
        matches!(
            self,
            Self::WorkerFailure { .. } | Self::AggregationTimeout { .. }
        )
    }
}

fn describe_failures(failed: &[WorkerError]) -> String {
    if failed.is_empty() {
        return String::new();
    }
    let details: Vec<String> = failed.iter().map(ToString::to_string).collect();
    format!(": {}", details.join("; "))
}

/// Result alias used by the estimator.
pub type Result<T, E = EstimateError> = std::result::Result<T, E>;
