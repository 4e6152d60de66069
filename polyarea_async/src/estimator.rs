//! Tokio driver for the polygon area estimator.
//!
//! Workers run on the blocking pool, send their result over a bounded mpsc
//! channel and the progress bar is redrawn by an ordinary task.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{info, warn};

use polyarea::progress::{render_bar, DEFAULT_BAR_WIDTH};
use polyarea::{
    EstimateError, EstimateResult, EstimatorConfig, PartialResult, Polygon, ProgressCounter,
    Publish, ResultAggregator, RunPlan, Totals, WorkAssignment, WorkerError,
};

type TaskHandle = (usize, JoinHandle<Result<PartialResult, WorkerError>>);

/// Sends a worker's result from inside the blocking pool.
struct ChannelPublisher(mpsc::Sender<PartialResult>);

impl Publish for ChannelPublisher {
    fn publish(&self, result: PartialResult) -> Result<(), WorkerError> {
        self.0
            .blocking_send(result)
            .map_err(|_| WorkerError::PublishFailed {
                worker_id: result.worker_id,
            })
    }
}

/// Interval that delays missed ticks, so a stalled redraw never bursts.
fn progress_ticker(period: Duration) -> Interval {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Redraws the progress bar every `period` until `stop` fires.
async fn run_monitor(
    counter: Arc<ProgressCounter>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = progress_ticker(period);
    let draw = |counter: &ProgressCounter| {
        let mut out = io::stdout().lock();
        let _ = write!(
            out,
            "\r{}",
            render_bar(counter.get(), counter.total(), DEFAULT_BAR_WIDTH)
        );
        let _ = out.flush();
    };

    loop {
        tokio::select! {
            _ = ticker.tick() => draw(&counter),
            _ = &mut stop => break,
        }
    }
    draw(&counter);
    println!();
}

/// Estimates the polygon's area with workers on tokio's blocking pool.
///
/// On [`EstimateError::AggregationTimeout`] the blocking workers are left
/// running. Callers that own the runtime should shut it down in the
/// background rather than wait for them.
pub async fn estimate(
    config: &EstimatorConfig,
    polygon: Polygon,
) -> Result<EstimateResult, EstimateError> {
    let plan = RunPlan::new(config, polygon)?;
    let progress = Arc::new(ProgressCounter::new(config.samples()));

    info!(
        workers = config.workers(),
        samples = config.samples(),
        "starting async estimate"
    );

    let (stop_tx, stop_rx) = oneshot::channel();
    let monitor = config.show_progress().then(|| {
        tokio::spawn(run_monitor(
            Arc::clone(&progress),
            config.poll_interval(),
            stop_rx,
        ))
    });

    let start = Instant::now();
    let totals = collect(config, &plan, &progress).await;
    let elapsed = start.elapsed();

    let _ = stop_tx.send(());
    if let Some(monitor) = monitor {
        let _ = monitor.await;
    }

    let result = EstimateResult::from_totals(totals?, plan.region.area(), elapsed);
    info!(
        inside = result.total_inside,
        sampled = result.total_sampled,
        area = result.estimated_area,
        "estimate complete"
    );
    Ok(result)
}

async fn collect(
    config: &EstimatorConfig,
    plan: &RunPlan,
    progress: &Arc<ProgressCounter>,
) -> Result<Totals, EstimateError> {
    let (tx, rx) = mpsc::channel::<PartialResult>(plan.assignments.len());

    let handles: Vec<TaskHandle> = plan
        .assignments
        .iter()
        .map(|&assignment| {
            let mut worker = plan.worker(assignment, progress, config.progress_batch());
            let publisher = ChannelPublisher(tx.clone());
            let handle = task::spawn_blocking(move || worker.run(&publisher));
            (assignment.worker_id, handle)
        })
        .collect();
    drop(tx);

    gather(&plan.assignments, rx, handles, config.aggregation_timeout()).await
}

/// Receives every worker's result, then awaits every task.
///
/// `rx` must close once all senders are gone, so no sender may outlive the
/// tasks in `handles`.
async fn gather(
    assignments: &[WorkAssignment],
    mut rx: mpsc::Receiver<PartialResult>,
    handles: Vec<TaskHandle>,
    timeout: Duration,
) -> Result<Totals, EstimateError> {
    let mut aggregator = ResultAggregator::new(assignments);
    let mut failed = Vec::new();
    let started = Instant::now();

    // The channel closes once every worker has returned or unwound.
    let received = time::timeout(timeout, async {
        while !aggregator.is_complete() {
            match rx.recv().await {
                Some(result) => {
                    if let Err(err) = aggregator.record(result) {
                        failed.push(err);
                    }
                }
                None => break,
            }
        }
    })
    .await;

    if received.is_err() {
        let still_running = handles.iter().filter(|(_, h)| !h.is_finished()).count();
        warn!(still_running, "gave up waiting for worker results");
        return Err(EstimateError::AggregationTimeout {
            waited: started.elapsed(),
            received: aggregator.received(),
            expected: aggregator.expected(),
        });
    }

    for (worker_id, handle) in handles {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => failed.push(err),
            Err(join_err) => {
                warn!(worker = worker_id, error = %join_err, "worker task died");
                failed.push(WorkerError::Panicked { worker_id });
            }
        }
    }

    if failed.is_empty() && aggregator.is_complete() {
        return aggregator.totals();
    }
    Err(EstimateError::WorkerFailure {
        failed,
        missing: aggregator.missing(),
    })
}
