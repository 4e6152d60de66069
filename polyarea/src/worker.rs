//! Sampling workers.
//!
//! A worker owns its random stream and its inside counter. It touches shared
//! state only to add to the progress counter and, once, to publish its
//! [`PartialResult`].

use std::sync::mpsc::Sender;
use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

use crate::error::WorkerError;
use crate::partition::WorkAssignment;
use crate::polygon::Polygon;
use crate::progress::ProgressCounter;
use crate::region::SampleRegion;
use crate::sampler::{classify, worker_rng, Sampler};

/// Lifecycle of a worker. `Completed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WorkerState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl WorkerState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Final count of one worker, published exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartialResult {
    pub worker_id: usize,
    pub sampled: u64,
    pub inside: u64,
}

/// Destination of a worker's terminal result.
pub trait Publish: Send {
    fn publish(&self, result: PartialResult) -> Result<(), WorkerError>;
}

impl Publish for Sender<PartialResult> {
    fn publish(&self, result: PartialResult) -> Result<(), WorkerError> {
        self.send(result).map_err(|_| WorkerError::PublishFailed {
            worker_id: result.worker_id,
        })
    }
}

impl<P: Publish + Sync + ?Sized> Publish for Arc<P> {
    fn publish(&self, result: PartialResult) -> Result<(), WorkerError> {
        (**self).publish(result)
    }
}

/// Samples its assigned share of points against a shared polygon.
pub struct Worker {
    assignment: WorkAssignment,
    polygon: Arc<Polygon>,
    sampler: Sampler,
    rng: StdRng,
    progress: Arc<ProgressCounter>,
    progress_batch: u64,
    state: WorkerState,
}

impl Worker {
    /// Creates an idle worker.
    ///
    /// `progress_batch` is how many samples are processed between two
    /// updates of the shared counter; it is raised to at least 1.
    pub fn new(
        assignment: WorkAssignment,
        polygon: Arc<Polygon>,
        region: &SampleRegion,
        progress: Arc<ProgressCounter>,
        base_seed: u64,
        progress_batch: u64,
    ) -> Self {
        Self {
            rng: worker_rng(base_seed, assignment.worker_id),
            sampler: Sampler::new(region),
            assignment,
            polygon,
            progress,
            progress_batch: progress_batch.max(1),
            state: WorkerState::Idle,
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.assignment.worker_id
    }

    #[inline]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    #[inline]
    pub fn assignment(&self) -> WorkAssignment {
        self.assignment
    }

    /// Samples every assigned point and returns the inside count.
    ///
    /// The shared counter receives exactly `sample_count` in total.
    fn sample_all(&mut self) -> u64 {
        let mut inside = 0u64;
        let mut pending = 0u64;

        for _ in 0..self.assignment.sample_count {
            let point = self.sampler.sample_point(&mut self.rng);
            if classify(&self.polygon, point) {
                inside += 1;
                trace!(worker = self.id(), x = point.x, y = point.y, "inside");
            }

            pending += 1;
            if pending == self.progress_batch {
                self.progress.add(pending);
                pending = 0;
            }
        }
        if pending > 0 {
            self.progress.add(pending);
        }

        inside
    }

    /// Runs the worker to a terminal state and publishes its result.
    ///
    /// A worker runs once; calling this again on a finished worker fails
    /// without sampling or publishing.
    pub fn run<P: Publish + ?Sized>(
        &mut self,
        publisher: &P,
    ) -> Result<PartialResult, WorkerError> {
        if self.state != WorkerState::Idle {
            return Err(WorkerError::Rejected {
                worker_id: self.id(),
                reason: format!("worker already ran ({:?})", self.state),
            });
        }

        self.state = WorkerState::Running;
        debug!(
            worker = self.id(),
            samples = self.assignment.sample_count,
            "worker started"
        );

        let inside = self.sample_all();
        let result = PartialResult {
            worker_id: self.id(),
            sampled: self.assignment.sample_count,
            inside,
        };

        match publisher.publish(result) {
            Ok(()) => {
                self.state = WorkerState::Completed;
                debug!(worker = self.id(), inside, "worker completed");
                Ok(result)
            }
            Err(err) => {
                self.state = WorkerState::Failed;
                warn!(worker = self.id(), error = %err, "worker failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use std::sync::mpsc;

    fn square() -> Arc<Polygon> {
        Arc::new(Polygon::parse("-1,-1\n1,-1\n1,1\n-1,1\n").unwrap())
    }

    fn worker(samples: u64, batch: u64, progress: Arc<ProgressCounter>) -> Worker {
        let polygon = square();
        let region = SampleRegion::bounding_box(&polygon);
        Worker::new(
            WorkAssignment {
                worker_id: 0,
                sample_count: samples,
            },
            polygon,
            &region,
            progress,
            99,
            batch,
        )
    }

    #[test]
    fn test_worker_completes_and_publishes_once() {
        let progress = Arc::new(ProgressCounter::new(1_000));
        let mut w = worker(1_000, 64, Arc::clone(&progress));
        let (tx, rx) = mpsc::channel::<PartialResult>();

        assert_eq!(w.state(), WorkerState::Idle);
        let result = w.run(&tx).unwrap();
        drop(tx);

        assert_eq!(w.state(), WorkerState::Completed);
        // Polygon fills its own bounding box.
        assert_eq!(result.inside, 1_000);
        assert_eq!(result.sampled, 1_000);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![result]);
    }

    #[test]
    fn test_progress_matches_assignment_for_any_batch() {
        for batch in [1, 7, 1_000, 5_000] {
            let progress = Arc::new(ProgressCounter::new(1_003));
            let mut w = worker(1_003, batch, Arc::clone(&progress));
            let (tx, _rx) = mpsc::channel::<PartialResult>();
            w.run(&tx).unwrap();
            assert_eq!(progress.get(), 1_003, "batch {batch}");
        }
    }

    #[test]
    fn test_closed_channel_fails_worker() {
        let progress = Arc::new(ProgressCounter::new(10));
        let mut w = worker(10, 1, progress);
        let (tx, rx) = mpsc::channel::<PartialResult>();
        drop(rx);

        let err = w.run(&tx).unwrap_err();
        assert_eq!(err, WorkerError::PublishFailed { worker_id: 0 });
        assert_eq!(w.state(), WorkerState::Failed);
        assert!(w.state().is_terminal());
    }

    #[test]
    fn test_worker_runs_once() {
        let progress = Arc::new(ProgressCounter::new(20));
        let mut w = worker(10, 1, Arc::clone(&progress));
        let (tx, rx) = mpsc::channel::<PartialResult>();

        w.run(&tx).unwrap();
        assert!(matches!(w.run(&tx), Err(WorkerError::Rejected { .. })));
        drop(tx);

        assert_eq!(rx.iter().count(), 1);
        assert_eq!(progress.get(), 10);
    }

    #[test]
    fn test_workers_share_polygon_across_threads() {
        let polygon = square();
        let region = SampleRegion::unit_square();
        let progress = Arc::new(ProgressCounter::new(40_000));
        let (tx, rx) = mpsc::channel::<PartialResult>();

        let handles: Vec<_> = partition(40_000, 4)
            .unwrap()
            .into_iter()
            .map(|assignment| {
                let mut w = Worker::new(
                    assignment,
                    Arc::clone(&polygon),
                    &region,
                    Arc::clone(&progress),
                    1,
                    100,
                );
                let tx = tx.clone();
                std::thread::spawn(move || w.run(&tx))
            })
            .collect();
        drop(tx);

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        let total: u64 = rx.iter().map(|r| r.sampled).sum();
        assert_eq!(total, 40_000);
        assert_eq!(progress.get(), 40_000);
    }
}
