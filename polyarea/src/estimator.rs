//! Threaded Monte Carlo area estimator.
//!
//! Each worker is an OS thread with its own share of the sample budget. The
//! polygon is shared read-only; results come back through the configured
//! [`AggregationStrategy`].

use std::io::{self, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::aggregate::{
    await_workers, collect_from_channel, join_workers, AggregationStrategy, ResultAggregator,
    SharedTally, Totals, WorkerHandle,
};
use crate::config::EstimatorConfig;
use crate::error::{EstimateError, InputError, Result, WorkerError};
use crate::geometry::EXTREME_X;
use crate::partition::{partition, WorkAssignment};
use crate::polygon::Polygon;
use crate::progress::{ProgressCounter, ProgressMonitor};
use crate::region::SampleRegion;
use crate::sampler::time_seed;
use crate::worker::{PartialResult, Publish, Worker};

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateResult {
    pub total_sampled: u64,
    pub total_inside: u64,
    pub region_area: f64,
    pub estimated_area: f64,
    pub elapsed: Duration,
}

impl EstimateResult {
    /// `region_area * inside / sampled`.
    pub fn from_totals(totals: Totals, region_area: f64, elapsed: Duration) -> Self {
        let estimated_area = if totals.sampled == 0 {
            0.0
        } else {
            region_area * totals.inside as f64 / totals.sampled as f64
        };
        Self {
            total_sampled: totals.sampled,
            total_inside: totals.inside,
            region_area,
            estimated_area,
            elapsed,
        }
    }
}

/// Everything a driver needs before starting workers.
#[derive(Clone, Debug)]
pub struct RunPlan {
    pub polygon: Arc<Polygon>,
    pub region: SampleRegion,
    pub assignments: Vec<WorkAssignment>,
    pub base_seed: u64,
}

impl RunPlan {
    /// Validates the polygon against the ray bound and splits the work.
    ///
    /// Fails before anything is spawned.
    pub fn new(config: &EstimatorConfig, polygon: Polygon) -> Result<Self, InputError> {
        config.validate()?;
        check_ray_bound(&polygon)?;

        let region = SampleRegion::for_polygon(config.region(), &polygon);
        check_region_extent(&region)?;
        let assignments = partition(config.samples(), config.workers())?;
        let base_seed = config.seed().unwrap_or_else(time_seed);

        debug!(
            region = %region.kind(),
            region_area = region.area(),
            workers = assignments.len(),
            base_seed,
            "planned run"
        );

        Ok(Self {
            polygon: Arc::new(polygon),
            region,
            assignments,
            base_seed,
        })
    }

    /// A fresh idle worker for `assignment`.
    pub fn worker(
        &self,
        assignment: WorkAssignment,
        progress: &Arc<ProgressCounter>,
        progress_batch: u64,
    ) -> Worker {
        Worker::new(
            assignment,
            Arc::clone(&self.polygon),
            &self.region,
            Arc::clone(progress),
            self.base_seed,
            progress_batch,
        )
    }
}

/// Rejects polygons the fixed extreme point cannot handle.
///
/// The ray from each sample ends at `x = EXTREME_X`, so a vertex at or beyond
/// it would make edges invisible to the crossing count.
pub fn check_ray_bound(polygon: &Polygon) -> Result<(), InputError> {
    match polygon
        .vertices()
        .iter()
        .position(|v| v.x >= EXTREME_X)
    {
        Some(index) => Err(InputError::VertexOutOfRange {
            index,
            x: polygon.vertices()[index].x,
            bound: EXTREME_X,
        }),
        None => Ok(()),
    }
}

/// Rejects regions whose width, height or area overflows `f64`.
///
/// Every vertex being finite does not bound the extent: `-1e308` and `1e308`
/// are both finite but their difference is not.
pub fn check_region_extent(region: &SampleRegion) -> Result<(), InputError> {
    let bounds = region.bounds();
    let (width, height, area) = (bounds.width(), bounds.height(), region.area());

    if width.is_finite() && height.is_finite() && area.is_finite() {
        return Ok(());
    }
    Err(InputError::InvalidParameter {
        name: "region",
        value: format!(
            "{} region of {width} x {height} has no finite area",
            region.kind()
        ),
    })
}

/// Runs workers on OS threads and aggregates their counts.
#[derive(Clone, Debug)]
pub struct Estimator {
    config: EstimatorConfig,
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates the polygon's area, drawing progress on stdout.
    pub fn run(&self, polygon: Polygon) -> Result<EstimateResult> {
        self.run_with_output(polygon, io::stdout())
    }

    /// Estimates the polygon's area, drawing progress on `out`.
    pub fn run_with_output<W>(&self, polygon: Polygon, out: W) -> Result<EstimateResult>
    where
        W: Write + Send + 'static,
    {
        let plan = RunPlan::new(&self.config, polygon)?;
        let progress = Arc::new(ProgressCounter::new(self.config.samples()));

        info!(
            workers = self.config.workers(),
            samples = self.config.samples(),
            strategy = %self.config.strategy(),
            "starting estimate"
        );

        let monitor = self.config.show_progress().then(|| {
            ProgressMonitor::spawn(Arc::clone(&progress), self.config.poll_interval(), out)
        });

        let start = Instant::now();
        let totals = match self.config.strategy() {
            AggregationStrategy::Channel => self.collect_via_channel(&plan, &progress),
            AggregationStrategy::SharedTotal => self.collect_via_shared_total(&plan, &progress),
        };
        let elapsed = start.elapsed();

        if let Some(monitor) = monitor {
            monitor.finish();
        }

        let totals = totals?;
        let result = EstimateResult::from_totals(totals, plan.region.area(), elapsed);
        info!(
            inside = result.total_inside,
            sampled = result.total_sampled,
            area = result.estimated_area,
            elapsed_ms = elapsed.as_millis() as u64,
            "estimate complete"
        );
        Ok(result)
    }

    fn collect_via_channel(
        &self,
        plan: &RunPlan,
        progress: &Arc<ProgressCounter>,
    ) -> Result<Totals> {
        let (tx, rx) = mpsc::channel::<PartialResult>();
        let (handles, mut failed) = self.spawn_all(plan, progress, |_| tx.clone());
        drop(tx);

        let mut aggregator = ResultAggregator::new(&plan.assignments);
        let rejected =
            collect_from_channel(&mut aggregator, &rx, &handles, self.config.wait_policy())?;

        failed.extend(rejected);
        failed.extend(join_workers(handles));
        finish(&aggregator, failed)
    }

    fn collect_via_shared_total(
        &self,
        plan: &RunPlan,
        progress: &Arc<ProgressCounter>,
    ) -> Result<Totals> {
        let tally = Arc::new(SharedTally::new(&plan.assignments));
        let (handles, mut failed) = self.spawn_all(plan, progress, |_| Arc::clone(&tally));

        await_workers(&handles, self.config.wait_policy(), || tally.received())?;

        failed.extend(join_workers(handles));
        if !failed.is_empty() {
            return Err(EstimateError::WorkerFailure {
                failed,
                missing: missing_after(&tally),
            });
        }
        tally.totals()
    }

    /// Starts one thread per assignment. Spawn failures are returned, not
    /// raised, so the workers already running are still accounted for.
    fn spawn_all<P, F>(
        &self,
        plan: &RunPlan,
        progress: &Arc<ProgressCounter>,
        mut make_publisher: F,
    ) -> (Vec<WorkerHandle>, Vec<WorkerError>)
    where
        P: Publish + 'static,
        F: FnMut(usize) -> P,
    {
        let mut handles = Vec::with_capacity(plan.assignments.len());
        let mut failed = Vec::new();

        for &assignment in &plan.assignments {
            let worker_id = assignment.worker_id;
            let mut worker = plan.worker(assignment, progress, self.config.progress_batch());
            let publisher = make_publisher(worker_id);

            let spawned = thread::Builder::new()
                .name(format!("polyarea-worker-{worker_id}"))
                .spawn(move || worker.run(&publisher));

            match spawned {
                Ok(handle) => handles.push((worker_id, handle)),
                Err(err) => {
                    warn!(worker = worker_id, error = %err, "failed to spawn worker");
                    failed.push(WorkerError::SpawnFailed {
                        worker_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        (handles, failed)
    }
}

fn missing_after(tally: &SharedTally) -> Vec<usize> {
    match tally.totals() {
        Err(EstimateError::WorkerFailure { missing, .. }) => missing,
        _ => Vec::new(),
    }
}

fn finish(aggregator: &ResultAggregator, failed: Vec<WorkerError>) -> Result<Totals> {
    if failed.is_empty() && aggregator.is_complete() {
        return aggregator.totals();
    }
    for err in &failed {
        warn!(worker = err.worker_id(), error = %err, "worker failed");
    }
    Err(EstimateError::WorkerFailure {
        failed,
        missing: aggregator.missing(),
    })
}
