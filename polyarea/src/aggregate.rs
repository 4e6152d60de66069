//! Exactly-once collection of worker results.
//!
//! [`ResultAggregator`] is the bookkeeping shared by both collection
//! strategies. It refuses anything that would make the final sum wrong: a
//! result from an unknown worker, a second result from the same worker, or a
//! sample count that does not match the worker's assignment. A worker that
//! never reports is a failure, not a zero.

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{EstimateError, InputError, WorkerError};
use crate::partition::WorkAssignment;
use crate::worker::{PartialResult, Publish};

/// How worker results reach the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AggregationStrategy {
    /// Each worker sends its result over a channel; the driver receives
    /// exactly one message per worker.
    #[default]
    Channel,
    /// Each worker records its result into a mutex-guarded shared tally.
    SharedTotal,
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::SharedTotal => write!(f, "shared"),
        }
    }
}

impl FromStr for AggregationStrategy {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" => Ok(Self::Channel),
            "shared" | "shared-total" => Ok(Self::SharedTotal),
            other => Err(InputError::InvalidParameter {
                name: "strategy",
                value: format!("unknown strategy '{other}', expected 'channel' or 'shared'"),
            }),
        }
    }
}

/// Sums over all workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub sampled: u64,
    pub inside: u64,
}

/// Collects one [`PartialResult`] per assigned worker.
#[derive(Debug)]
pub struct ResultAggregator {
    assigned: Vec<u64>,
    received: Vec<bool>,
    count: usize,
    totals: Totals,
}

impl ResultAggregator {
    /// Expects one result for every assignment.
    ///
    /// Worker ids must be `0..assignments.len()`, as produced by
    /// [`partition`](crate::partition::partition).
    pub fn new(assignments: &[WorkAssignment]) -> Self {
        let mut assigned = vec![0; assignments.len()];
        for a in assignments {
            if let Some(slot) = assigned.get_mut(a.worker_id) {
                *slot = a.sample_count;
            }
        }
        Self {
            received: vec![false; assigned.len()],
            assigned,
            count: 0,
            totals: Totals::default(),
        }
    }

    /// Adds one worker's result.
    pub fn record(&mut self, result: PartialResult) -> Result<(), WorkerError> {
        let worker_id = result.worker_id;
        let reject = |reason: String| WorkerError::Rejected { worker_id, reason };

        let Some(&assigned) = self.assigned.get(worker_id) else {
            return Err(reject(format!(
                "unknown worker, expected ids below {}",
                self.assigned.len()
            )));
        };
        if self.received[worker_id] {
            return Err(reject("duplicate result".to_string()));
        }
        if result.sampled != assigned {
            return Err(reject(format!(
                "sampled {} points but was assigned {assigned}",
                result.sampled
            )));
        }
        if result.inside > result.sampled {
            return Err(reject(format!(
                "{} inside out of {} sampled",
                result.inside, result.sampled
            )));
        }

        self.received[worker_id] = true;
        self.count += 1;
        self.totals.sampled += result.sampled;
        self.totals.inside += result.inside;
        debug!(
            worker = worker_id,
            received = self.count,
            expected = self.expected(),
            "recorded result"
        );
        Ok(())
    }

    #[inline]
    pub fn expected(&self) -> usize {
        self.assigned.len()
    }

    #[inline]
    pub fn received(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.count == self.expected()
    }

    /// Ids of workers that have not reported yet.
    pub fn missing(&self) -> Vec<usize> {
        self.received
            .iter()
            .enumerate()
            .filter(|&(_, &seen)| !seen)
            .map(|(id, _)| id)
            .collect()
    }

    /// Final sums, available only once every worker has reported.
    pub fn totals(&self) -> Result<Totals, EstimateError> {
        if !self.is_complete() {
            return Err(EstimateError::WorkerFailure {
                failed: Vec::new(),
                missing: self.missing(),
            });
        }
        Ok(self.totals)
    }
}

/// A [`ResultAggregator`] workers write into directly.
#[derive(Debug)]
pub struct SharedTally {
    inner: Mutex<ResultAggregator>,
}

impl SharedTally {
    pub fn new(assignments: &[WorkAssignment]) -> Self {
        Self {
            inner: Mutex::new(ResultAggregator::new(assignments)),
        }
    }

    pub fn record(&self, result: PartialResult) -> Result<(), WorkerError> {
        self.inner
            .lock()
            .map_err(|_| WorkerError::PublishFailed {
                worker_id: result.worker_id,
            })?
            .record(result)
    }

    pub fn received(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .received()
    }

    pub fn totals(&self) -> Result<Totals, EstimateError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .totals()
    }
}

impl Publish for SharedTally {
    fn publish(&self, result: PartialResult) -> Result<(), WorkerError> {
        self.record(result)
    }
}

/// Bounds on how long the driver waits for workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    /// How often worker liveness is re-checked.
    pub poll_interval: Duration,
    /// Total time allowed for all results to arrive.
    pub timeout: Duration,
}

/// A running worker and its id.
pub type WorkerHandle = (usize, JoinHandle<Result<PartialResult, WorkerError>>);

/// Receives results until every worker has reported or no more can arrive.
///
/// Returns the contributions the aggregator rejected. Stops early once every
/// worker thread has finished, so a worker that died without sending does not
/// hold the driver until the deadline.
pub fn collect_from_channel(
    aggregator: &mut ResultAggregator,
    rx: &Receiver<PartialResult>,
    handles: &[WorkerHandle],
    wait: WaitPolicy,
) -> Result<Vec<WorkerError>, EstimateError> {
    let started = Instant::now();
    let deadline = started + wait.timeout;
    let mut rejected = Vec::new();

    let mut record = |aggregator: &mut ResultAggregator, result: PartialResult| {
        if let Err(err) = aggregator.record(result) {
            warn!(error = %err, "dropped worker result");
            rejected.push(err);
        }
    };

    while !aggregator.is_complete() {
        let now = Instant::now();
        if now >= deadline {
            return Err(EstimateError::AggregationTimeout {
                waited: now - started,
                received: aggregator.received(),
                expected: aggregator.expected(),
            });
        }

        match rx.recv_timeout(wait.poll_interval.min(deadline - now)) {
            Ok(result) => record(aggregator, result),
            Err(RecvTimeoutError::Timeout) => {
                if handles.iter().all(|(_, h)| h.is_finished()) {
                    while let Ok(result) = rx.try_recv() {
                        record(aggregator, result);
                    }
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(rejected)
}

/// Waits until every worker thread has finished, checking on a fixed interval.
pub fn await_workers(
    handles: &[WorkerHandle],
    wait: WaitPolicy,
    received: impl Fn() -> usize,
) -> Result<(), EstimateError> {
    let started = Instant::now();
    let deadline = started + wait.timeout;

    while !handles.iter().all(|(_, h)| h.is_finished()) {
        let now = Instant::now();
        if now >= deadline {
            return Err(EstimateError::AggregationTimeout {
                waited: now - started,
                received: received(),
                expected: handles.len(),
            });
        }
        thread::sleep(wait.poll_interval.min(deadline - now));
    }
    Ok(())
}

/// Joins finished workers and returns every failure among them.
pub fn join_workers(handles: Vec<WorkerHandle>) -> Vec<WorkerError> {
    handles
        .into_iter()
        .filter_map(|(worker_id, handle)| match handle.join() {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(err),
            Err(_) => Some(WorkerError::Panicked { worker_id }),
        })
        .collect()
}
