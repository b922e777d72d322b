//! Synthetic gable-roof (two-panel) targets.
//!
//! The roof is described in a local frame where `u` runs across the ridge
//! (negative = left panel, positive = right panel, looking along the ridge
//! azimuth), `v` runs along the ridge and `w` is up. The eaves sit at
//! `u = ±base/2` on the base height, the ridge at `u = 0` sits `height` above
//! it.

use crate::{heading_from_azimuth, rotate_clockwise, PointRecord, Pt3, Real, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GableRoof {
    /// Horizontal separation of the two eave lines.
    pub base: Real,
    /// Ridge length.
    pub length: Real,
    /// Ridge height above the eave lines.
    pub height: Real,
    /// Center of the footprint at eave height.
    pub base_center: Pt3,
    /// Ridge azimuth, degrees clockwise from north.
    pub azimuth_deg: Real,
}

impl GableRoof {
    /// Roof with a given slanted panel width (`height = sqrt(width² - (base/2)²)`).
    pub fn from_width(
        base: Real,
        width: Real,
        length: Real,
        base_center: Pt3,
        azimuth_deg: Real,
    ) -> Self {
        let half = base / 2.0;
        Self {
            base,
            length,
            height: (width * width - half * half).max(0.0).sqrt(),
            base_center,
            azimuth_deg,
        }
    }

    /// Roof with a given panel pitch in degrees. The dihedral angle between
    /// the two panel normals is `2 * pitch_deg`.
    pub fn from_pitch_deg(
        base: Real,
        length: Real,
        pitch_deg: Real,
        base_center: Pt3,
        azimuth_deg: Real,
    ) -> Self {
        Self {
            base,
            length,
            height: base / 2.0 * pitch_deg.to_radians().tan(),
            base_center,
            azimuth_deg,
        }
    }

    /// Midpoint of the ridge line, the reference position of the target.
    pub fn ridge_center(&self) -> Pt3 {
        Pt3::new(
            self.base_center.x,
            self.base_center.y,
            self.base_center.z + self.height,
        )
    }

    /// Unit horizontal direction of the ridge.
    pub fn ridge_heading(&self) -> Vec2 {
        heading_from_azimuth(self.azimuth_deg.to_radians())
    }

    /// Point on the roof surface at local coordinates `(u, v)`.
    pub fn surface_point(&self, u: Real, v: Real) -> Pt3 {
        let half = self.base / 2.0;
        let w = self.height * (1.0 - (u.abs() / half).min(1.0));
        let d = rotate_clockwise(&Vec2::new(u, v), self.azimuth_deg.to_radians());
        Pt3::new(
            self.base_center.x + d.x,
            self.base_center.y + d.y,
            self.base_center.z + w,
        )
    }

    /// Sample both panels at mirrored across-offsets.
    ///
    /// `across` holds unsigned distances from the ridge (each is used on the
    /// left as `-u` and on the right as `+u`); `along` holds ridge
    /// coordinates. Left-panel points come first.
    pub fn sample(&self, across: &[Real], along: &[Real]) -> Vec<PointRecord> {
        let mut out = Vec::with_capacity(2 * across.len() * along.len());
        for sign in [-1.0, 1.0] {
            for &u in across {
                for &v in along {
                    out.push(self.surface_point(sign * u, v).into());
                }
            }
        }
        out
    }

    /// Regular grid covering the whole roof: `n_across` columns per panel at
    /// cell centers of `(0, base/2]`, `n_along` rows spanning the full ridge
    /// length including both ends. Yields `2 * n_across * n_along` points.
    pub fn sample_grid(&self, n_across: usize, n_along: usize) -> Vec<PointRecord> {
        let half = self.base / 2.0;
        let across: Vec<Real> = (0..n_across)
            .map(|i| (i as Real + 0.5) / n_across as Real * half)
            .collect();
        let along: Vec<Real> = match n_along {
            0 => Vec::new(),
            1 => vec![0.0],
            n => (0..n)
                .map(|j| -self.length / 2.0 + j as Real * self.length / (n - 1) as Real)
                .collect(),
        };
        self.sample(&across, &along)
    }
}
