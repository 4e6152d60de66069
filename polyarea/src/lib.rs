//! Parallel Monte Carlo estimation of polygon areas.
//!
//! Points are drawn uniformly from a sampling region, classified with a
//! ray-casting point-in-polygon test, and the inside ratio is scaled by the
//! region's area. The sample budget is split across independent workers whose
//! counts are aggregated exactly once each.
//!
//! ```rust,no_run
//! use polyarea::{Estimator, EstimatorConfig, Polygon};
//!
//! let polygon = Polygon::load("square.txt")?;
//! let config = EstimatorConfig::builder().workers(4).samples(40_000).build()?;
//! let result = Estimator::new(config).run(polygon)?;
//! println!("area ~ {:.4}", result.estimated_area);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod estimator;
pub mod geometry;
pub mod partition;
pub mod polygon;
pub mod progress;
pub mod region;
pub mod sampler;
pub mod worker;

pub use aggregate::{AggregationStrategy, ResultAggregator, SharedTally, Totals};
pub use config::EstimatorConfig;
pub use error::{EstimateError, InputError, WorkerError};
pub use estimator::{EstimateResult, Estimator, RunPlan};
pub use geometry::{point_in_polygon, Point};
pub use partition::{partition, WorkAssignment};
pub use polygon::Polygon;
pub use progress::{ProgressCounter, ProgressMonitor};
pub use region::{RegionKind, SampleRegion};
pub use worker::{PartialResult, Publish, Worker, WorkerState};
