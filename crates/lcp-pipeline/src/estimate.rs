//! Single-target estimation: panels, plane fits and ridge.

use lcp_core::{Pt3, Real};
use lcp_geom::{
    FittedPlane, PanelPartitioner, Plane, RidgeResult, RidgeSolver, RobustPlaneFitter, Side,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{TargetApproxPose, TargetConfig};
use crate::error::{EstimationError, Result};
use crate::window::{PointCloudWindow, WindowSummary};

/// Plane-fit diagnostics of one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelReport {
    pub side: Side,
    /// Points assigned to the panel.
    pub points: usize,
    pub inliers: usize,
    /// `100 * (points - inliers) / points`.
    pub outlier_percent: Real,
    /// Plane used to classify inliers.
    pub ransac_plane: Plane,
    /// Least-squares plane on the inliers, used for the ridge.
    pub refit_plane: Plane,
    /// Angle between the two planes, degrees.
    pub divergence_deg: Real,
    pub refit_rms: Real,
}

impl PanelReport {
    fn new(side: Side, fit: &FittedPlane) -> Self {
        Self {
            side,
            points: fit.n_points,
            inliers: fit.inlier_count(),
            outlier_percent: fit.outlier_percent(),
            ransac_plane: fit.ransac,
            refit_plane: fit.refit,
            divergence_deg: fit.divergence_deg(),
            refit_rms: fit.refit_rms,
        }
    }
}

/// Everything estimated for one target on one flight line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEstimate {
    pub pose: TargetApproxPose,
    pub window: WindowSummary,
    pub left: PanelReport,
    pub right: PanelReport,
    pub ridge: RidgeResult,
    /// Midpoint of the combined ridge segment.
    pub center: Pt3,
    /// `center.z - HAE` when the pose carries an approximate height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dz_hae: Option<Real>,
}

impl TargetEstimate {
    pub fn name(&self) -> &str {
        &self.pose.name
    }

    pub fn source(&self) -> &str {
        &self.pose.source
    }

    pub fn panel(&self, side: Side) -> &PanelReport {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Length of the combined ridge segment, meters.
    pub fn length(&self) -> Real {
        self.ridge.combined.length()
    }

    pub fn azimuth_deg(&self) -> Real {
        self.ridge.combined.azimuth_deg()
    }

    pub fn slope(&self) -> Real {
        self.ridge.combined.slope()
    }
}

/// Gable-roof estimator for a fixed [`TargetConfig`].
#[derive(Debug, Clone)]
pub struct GableRoofEstimator {
    partitioner: PanelPartitioner,
    fitter: RobustPlaneFitter,
    solver: RidgeSolver,
    seed: u64,
}

impl GableRoofEstimator {
    pub fn new(config: &TargetConfig) -> Self {
        Self {
            partitioner: PanelPartitioner::new(config.panel_dims()),
            fitter: RobustPlaneFitter::new(config.min_points, config.thresh, config.max_iter),
            solver: RidgeSolver::new(config.min_dihedral_deg),
            seed: config.seed,
        }
    }

    /// Estimate with a fresh random source seeded from `SEED`.
    pub fn estimate(
        &self,
        pose: &TargetApproxPose,
        window: &PointCloudWindow,
    ) -> Result<TargetEstimate> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.estimate_with_rng(pose, window, &mut rng)
    }

    /// Split the window into panels, fit both planes (left first) drawing
    /// from `rng`, and intersect them.
    pub fn estimate_with_rng<R: Rng + ?Sized>(
        &self,
        pose: &TargetApproxPose,
        window: &PointCloudWindow,
        rng: &mut R,
    ) -> Result<TargetEstimate> {
        let summary = window.summary();
        log::debug!(
            "{}: window {:.1} x {:.1} m, {} points, {:.1} pts/m2",
            pose.name,
            summary.extent[0],
            summary.extent[1],
            summary.count,
            summary.density
        );

        let layout = self.partitioner.layout(pose.center(), pose.azimuth_deg);
        let panels = self.partitioner.partition(&layout, &window.cloud.points);

        let mut fits = Vec::with_capacity(2);
        for side in Side::BOTH {
            let pts: Vec<Pt3> = panels.side(side).iter().map(|p| p.position()).collect();
            let fit = self
                .fitter
                .fit(&pts, rng)
                .map_err(|e| EstimationError::from_plane_fit(side, e))?;
            log::info!(
                "{}: fit plane {side} outliers {:.1}% ({}/{})",
                pose.name,
                fit.outlier_percent(),
                fit.outlier_count(),
                fit.n_points
            );
            log::debug!(
                "{}: plane {side} {:?}, ransac/refit divergence {:.4} deg",
                pose.name,
                fit.refit.coefficients(),
                fit.divergence_deg()
            );
            fits.push((pts, fit));
        }
        let (right_pts, right_fit) = fits.pop().ok_or_else(|| missing(Side::Right))?;
        let (left_pts, left_fit) = fits.pop().ok_or_else(|| missing(Side::Left))?;

        let ridge = self.solver.solve(
            &left_fit.refit,
            &left_fit.inlier_points(&left_pts),
            &right_fit.refit,
            &right_fit.inlier_points(&right_pts),
            Some(pose.heading()),
        )?;

        for (label, seg) in [
            ("L", &ridge.left),
            ("R", &ridge.right),
            ("LR", &ridge.combined),
        ] {
            log::info!(
                "{}: {label:2} ridge length = {:.3} m, az = {:.1} deg, slope = {:+.2} m",
                pose.name,
                seg.length(),
                seg.azimuth_deg(),
                seg.slope()
            );
        }

        let center = ridge.center();
        Ok(TargetEstimate {
            dz_hae: pose.hae.map(|hae| center.z - hae),
            pose: pose.clone(),
            window: summary,
            left: PanelReport::new(Side::Left, &left_fit),
            right: PanelReport::new(Side::Right, &right_fit),
            ridge,
            center,
        })
    }
}

fn missing(side: Side) -> EstimationError {
    EstimationError::DegenerateGeometry(format!("{side} panel was not fitted"))
}
