//! Estimator run configuration.

use std::time::Duration;

use crate::aggregate::{AggregationStrategy, WaitPolicy};
use crate::error::InputError;
use crate::region::RegionKind;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_SAMPLES: u64 = 1_000_000;
pub const DEFAULT_PROGRESS_BATCH: u64 = 1_000;

/// Fastest allowed progress refresh (10 Hz).
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_AGGREGATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Validated parameters of one estimator run.
///
/// Use [`EstimatorConfig::builder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use polyarea::config::EstimatorConfig;
/// use polyarea::region::RegionKind;
///
/// let config = EstimatorConfig::builder()
///     .workers(8)
///     .samples(80_000)
///     .region(RegionKind::UnitSquare)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.workers(), 8);
/// assert_eq!(config.seed(), Some(42));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorConfig {
    workers: usize,
    samples: u64,
    region: RegionKind,
    strategy: AggregationStrategy,
    progress_batch: u64,
    seed: Option<u64>,
    poll_interval: Duration,
    aggregation_timeout: Duration,
    show_progress: bool,
}

impl EstimatorConfig {
    #[inline]
    pub fn builder() -> EstimatorConfigBuilder {
        EstimatorConfigBuilder::default()
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[inline]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    #[inline]
    pub fn region(&self) -> RegionKind {
        self.region
    }

    #[inline]
    pub fn strategy(&self) -> AggregationStrategy {
        self.strategy
    }

    /// Samples a worker processes between two progress updates.
    #[inline]
    pub fn progress_batch(&self) -> u64 {
        self.progress_batch
    }

    /// Fixed base seed, or `None` to seed from the clock.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Interval of progress redraws and worker liveness checks.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[inline]
    pub fn aggregation_timeout(&self) -> Duration {
        self.aggregation_timeout
    }

    #[inline]
    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: self.poll_interval,
            timeout: self.aggregation_timeout,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if:
    /// - `workers` is 0
    /// - `samples` is smaller than `workers`
    /// - `progress_batch` is 0
    /// - `aggregation_timeout` is zero
    pub fn validate(&self) -> Result<(), InputError> {
        if self.workers == 0 {
            return Err(InputError::InvalidWorkerCount(self.workers));
        }
        if self.samples < self.workers as u64 {
            return Err(InputError::TooFewSamples {
                total: self.samples,
                workers: self.workers,
            });
        }
        if self.progress_batch == 0 {
            return Err(InputError::InvalidParameter {
                name: "progress_batch",
                value: "must be at least 1".to_string(),
            });
        }
        if self.aggregation_timeout.is_zero() {
            return Err(InputError::InvalidParameter {
                name: "aggregation_timeout",
                value: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`EstimatorConfig`].
#[derive(Clone, Debug)]
pub struct EstimatorConfigBuilder {
    workers: usize,
    samples: u64,
    region: RegionKind,
    strategy: AggregationStrategy,
    progress_batch: u64,
    seed: Option<u64>,
    poll_interval: Duration,
    aggregation_timeout: Duration,
    show_progress: bool,
}

impl Default for EstimatorConfigBuilder {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            samples: DEFAULT_SAMPLES,
            region: RegionKind::default(),
            strategy: AggregationStrategy::default(),
            progress_batch: DEFAULT_PROGRESS_BATCH,
            seed: None,
            poll_interval: MIN_POLL_INTERVAL,
            aggregation_timeout: DEFAULT_AGGREGATION_TIMEOUT,
            show_progress: true,
        }
    }
}

impl EstimatorConfigBuilder {
    #[inline]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[inline]
    pub fn samples(mut self, samples: u64) -> Self {
        self.samples = samples;
        self
    }

    #[inline]
    pub fn region(mut self, region: RegionKind) -> Self {
        self.region = region;
        self
    }

    #[inline]
    pub fn strategy(mut self, strategy: AggregationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[inline]
    pub fn progress_batch(mut self, batch: u64) -> Self {
        self.progress_batch = batch;
        self
    }

    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[inline]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Clamped to at least [`MIN_POLL_INTERVAL`].
    #[inline]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    #[inline]
    pub fn aggregation_timeout(mut self, timeout: Duration) -> Self {
        self.aggregation_timeout = timeout;
        self
    }

    #[inline]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<EstimatorConfig, InputError> {
        let config = EstimatorConfig {
            workers: self.workers,
            samples: self.samples,
            region: self.region,
            strategy: self.strategy,
            progress_batch: self.progress_batch,
            seed: self.seed,
            poll_interval: self.poll_interval,
            aggregation_timeout: self.aggregation_timeout,
            show_progress: self.show_progress,
        };
        config.validate()?;
        Ok(config)
    }
}
