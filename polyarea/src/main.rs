use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use polyarea::config::{DEFAULT_PROGRESS_BATCH, DEFAULT_SAMPLES, DEFAULT_WORKERS};
use polyarea::{AggregationStrategy, Estimator, EstimatorConfig, Polygon, RegionKind};

/// Estimate the area of a polygon by parallel Monte Carlo sampling.
#[derive(Parser)]
#[command(name = "polyarea")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Polygon file, one `x,y` vertex per line
    polygon: PathBuf,

    /// Number of worker threads
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Total number of sample points
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES)]
    samples: u64,

    /// Sampling region: 'square' ([-1,1]x[-1,1]) or 'bbox' (polygon bounding box)
    #[arg(short, long, default_value = "bbox")]
    region: RegionKind,

    /// How results are collected: 'channel' or 'shared'
    #[arg(long, default_value = "channel")]
    strategy: AggregationStrategy,

    /// Samples between two progress updates of a worker
    #[arg(long, default_value_t = DEFAULT_PROGRESS_BATCH)]
    batch: u64,

    /// Base seed for reproducible runs (default: current time)
    #[arg(long)]
    seed: Option<u64>,

    /// Give up waiting for workers after this many seconds
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,

    /// Do not draw the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv every inside point)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Log level used when `RUST_LOG` is unset.
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let start = Instant::now();
    let polygon = Polygon::load(&cli.polygon)
        .with_context(|| format!("cannot use polygon file {}", cli.polygon.display()))?;
    let load_time = start.elapsed();

    println!("Polygon loaded: {} vertices", polygon.vertex_count());
    println!("Load time: {}ms", load_time.as_millis());

    let config = EstimatorConfig::builder()
        .workers(cli.workers)
        .samples(cli.samples)
        .region(cli.region)
        .strategy(cli.strategy)
        .progress_batch(cli.batch)
        .maybe_seed(cli.seed)
        .aggregation_timeout(Duration::from_secs(cli.timeout_secs))
        .show_progress(!cli.quiet)
        .build()
        .context("invalid run parameters")?;

    println!(
        "Sampling {} points with {} workers over the {} region",
        config.samples(),
        config.workers(),
        config.region()
    );

    let result = Estimator::new(config)
        .run(polygon)
        .context("estimation failed")?;

    println!("Total sampled: {}", result.total_sampled);
    println!("Total inside: {}", result.total_inside);
    println!("Region area: {:.6}", result.region_area);
    println!("Estimated area: {:.6}", result.estimated_area);
    println!("Sampling time: {}ms", result.elapsed.as_millis());
    println!("Total time: {}ms", start.elapsed().as_millis());

    Ok(())
}
