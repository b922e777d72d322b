//! Deterministic synthetic data generation helpers.
//!
//! Building blocks for synthetic lidar control plane scenes used in tests and
//! demos:
//! - perfect gable-roof targets sampled on regular grids ([`gable`]),
//! - seeded uniform noise and gross outliers.
//!
//! Everything here is deterministic given explicit seeds and stable point
//! ordering.
//!
//! # Example
//!
//! ```
//! use lcp_core::synthetic::gable::GableRoof;
//! use lcp_core::Pt3;
//!
//! let roof = GableRoof::from_width(1.10, 0.65, 1.22, Pt3::new(1000.0, 2000.0, 5.0), 30.0);
//! let points = roof.sample_grid(20, 50);
//! assert_eq!(points.len(), 2000);
//! ```

pub mod gable;

use crate::{PointRecord, Pt2, Real};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Perturb every coordinate by uniform noise in `[-amplitude, amplitude]`.
pub fn jitter(points: &mut [PointRecord], amplitude: Real, seed: u64) {
    if amplitude <= 0.0 {
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    for p in points.iter_mut() {
        p.x += rng.random_range(-amplitude..=amplitude);
        p.y += rng.random_range(-amplitude..=amplitude);
        p.z += rng.random_range(-amplitude..=amplitude);
    }
}

/// `n` gross outliers scattered uniformly over a horizontal disc-bounding
/// square around `center`, with heights in `z_range`.
pub fn scatter_outliers(
    center: Pt2,
    half_extent: Real,
    z_range: (Real, Real),
    n: usize,
    seed: u64,
) -> Vec<PointRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            PointRecord::new(
                center.x + rng.random_range(-half_extent..=half_extent),
                center.y + rng.random_range(-half_extent..=half_extent),
                rng.random_range(z_range.0..=z_range.1),
            )
        })
        .collect()
}
