//! Uniform point sampling and per-worker random streams.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::Point;
use crate::polygon::Polygon;
use crate::region::SampleRegion;

/// Draws points uniformly from a [`SampleRegion`].
#[derive(Clone, Debug)]
pub struct Sampler {
    x: Uniform<f64>,
    y: Uniform<f64>,
}

impl Sampler {
    pub fn new(region: &SampleRegion) -> Self {
        let b = region.bounds();
        Self {
            x: Uniform::new_inclusive(b.min_x, b.max_x),
            y: Uniform::new_inclusive(b.min_y, b.max_y),
        }
    }

    #[inline]
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(self.x.sample(rng), self.y.sample(rng))
    }
}

/// Whether a sampled point counts as a hit.
#[inline]
pub fn classify(polygon: &Polygon, point: Point) -> bool {
    polygon.contains(point)
}

/// Seed for runs that did not ask for a fixed one.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Seed of worker `worker_id` in a run seeded with `base_seed`.
///
/// SplitMix64 finaliser over the base seed offset by the worker id, so
/// neighbouring workers get unrelated streams.
pub fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    let mut z = base_seed.wrapping_add((worker_id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Random stream of worker `worker_id`.
pub fn worker_rng(base_seed: u64, worker_id: usize) -> StdRng {
    StdRng::seed_from_u64(worker_seed(base_seed, worker_id))
}
