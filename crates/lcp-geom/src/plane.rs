//! Plane model, RANSAC plane estimator and least-squares plane refit.
//!
//! A panel plane is fitted in two stages: RANSAC on the panel's points
//! selects the consensus set, then a total-least-squares fit on the inliers
//! gives the plane used for the ridge. Both planes are kept so that their
//! divergence can be reported.

use lcp_core::{
    angle_between, ransac_with_rng, undirected_angle_between, Estimator, Pt3, RansacOptions, Real,
    Vec3,
};
use nalgebra::UnitVector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from plane fitting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaneFitError {
    #[error("need at least {need} points to fit a plane, got {got}")]
    InsufficientPoints { got: usize, need: usize },
    #[error("no plane reached a consensus of {min_inliers} inliers")]
    NoConsensus { min_inliers: usize },
    #[error("points are collinear or coincident")]
    Degenerate,
}

/// Plane through `origin` with unit `normal`.
///
/// The normal is oriented upward (`normal.z >= 0`). Storing a point on the
/// plane rather than the offset `d` keeps distances accurate when
/// coordinates are large (projected map coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// A point on the plane.
    pub origin: Pt3,
    /// Unit normal with `z >= 0`.
    pub normal: UnitVector3<Real>,
}

impl Plane {
    /// Build a plane from a point and a (not necessarily unit) normal.
    ///
    /// Returns `None` for a zero or non-finite normal.
    pub fn from_point_normal(origin: Pt3, normal: Vec3) -> Option<Self> {
        if !normal.iter().all(|v| v.is_finite()) {
            return None;
        }
        let normal = if normal.z < 0.0 { -normal } else { normal };
        let normal = UnitVector3::try_new(normal, 1e-300)?;
        Some(Self { origin, normal })
    }

    /// Plane through three points, anchored at their centroid.
    ///
    /// Returns `None` when the points are (numerically) collinear.
    pub fn through_points(a: &Pt3, b: &Pt3, c: &Pt3) -> Option<Self> {
        let ab = b - a;
        let ac = c - a;
        let n = ab.cross(&ac);
        let scale = ab.norm() * ac.norm();
        if scale <= 0.0 || n.norm() <= 1e-9 * scale {
            return None;
        }
        let centroid = Pt3::from((a.coords + b.coords + c.coords) / 3.0);
        Self::from_point_normal(centroid, n)
    }

    /// Signed distance of `p` from the plane, positive above it.
    pub fn signed_distance(&self, p: &Pt3) -> Real {
        self.normal.dot(&(p - self.origin))
    }

    pub fn distance(&self, p: &Pt3) -> Real {
        self.signed_distance(p).abs()
    }

    /// Orthogonal projection of `p` onto the plane.
    pub fn project(&self, p: &Pt3) -> Pt3 {
        p - self.normal.into_inner() * self.signed_distance(p)
    }

    /// Coefficients `[a, b, c, d]` of `a x + b y + c z + d = 0`.
    pub fn coefficients(&self) -> [Real; 4] {
        let n = self.normal.into_inner();
        [n.x, n.y, n.z, -n.dot(&self.origin.coords)]
    }

    /// Angle between the two planes in radians, in `[0, pi/2]`.
    pub fn angle_to(&self, other: &Plane) -> Real {
        undirected_angle_between(&self.normal, &other.normal)
    }

    /// Angle between the upward normals in radians, in `[0, pi]`. For the
    /// two panels of a roof this is twice the pitch when both pitches match.
    pub fn normal_angle_to(&self, other: &Plane) -> Real {
        angle_between(&self.normal, &other.normal)
    }

    /// Inclination of the plane from horizontal, in degrees.
    pub fn slope_deg(&self) -> Real {
        self.angle_to(&Plane {
            origin: self.origin,
            normal: Vec3::z_axis(),
        })
        .to_degrees()
    }
}

/// Least-squares plane with its RMS orthogonal residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LstsqPlane {
    pub plane: Plane,
    pub rms: Real,
}

/// Total-least-squares plane through `points`.
///
/// The normal is the eigenvector of the centered scatter matrix with the
/// smallest eigenvalue; the plane passes through the centroid.
pub fn fit_plane_lstsq(points: &[Pt3]) -> Result<LstsqPlane, PlaneFitError> {
    if points.len() < 3 {
        return Err(PlaneFitError::InsufficientPoints {
            got: points.len(),
            need: 3,
        });
    }

    let n = points.len() as Real;
    let centroid = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords) / n;

    let mut cov = nalgebra::Matrix3::zeros();
    for p in points {
        let d = p.coords - centroid;
        cov += d * d.transpose();
    }

    let eigen = cov.symmetric_eigen();
    let mut order: Vec<(usize, Real)> = eigen.eigenvalues.iter().copied().enumerate().collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (min_idx, _) = order[0];
    let (_, second) = order[1];
    let (_, largest) = order[2];

    // rank < 2 means the points span at most a line
    const RANK_THRESHOLD: Real = 1e-12;
    if largest <= 0.0 || second <= RANK_THRESHOLD * largest {
        return Err(PlaneFitError::Degenerate);
    }

    let normal: Vec3 = eigen.eigenvectors.column(min_idx).into_owned();
    let plane =
        Plane::from_point_normal(Pt3::from(centroid), normal).ok_or(PlaneFitError::Degenerate)?;

    let sum_sq: Real = points
        .iter()
        .map(|p| {
            let d = plane.signed_distance(p);
            d * d
        })
        .sum();

    Ok(LstsqPlane {
        plane,
        rms: (sum_sq / n).sqrt(),
    })
}

/// RANSAC estimator for a plane from three 3-D points.
pub struct PlaneEstimator;

impl Estimator for PlaneEstimator {
    type Datum = Pt3;
    type Model = Plane;

    const MIN_SAMPLES: usize = 3;

    fn fit(data: &[Pt3], sample_indices: &[usize]) -> Option<Plane> {
        Plane::through_points(
            &data[sample_indices[0]],
            &data[sample_indices[1]],
            &data[sample_indices[2]],
        )
    }

    fn residual(model: &Plane, datum: &Pt3) -> f64 {
        model.distance(datum)
    }

    fn refit(data: &[Pt3], inliers: &[usize]) -> Option<Plane> {
        let pts: Vec<Pt3> = inliers.iter().map(|&i| data[i]).collect();
        fit_plane_lstsq(&pts).ok().map(|fit| fit.plane)
    }
}

/// Result of fitting one panel: the RANSAC plane, its inliers and the
/// least-squares plane refitted on those inliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPlane {
    pub ransac: Plane,
    pub refit: Plane,
    /// Indices into the fitted point slice, ascending.
    pub inliers: Vec<usize>,
    pub n_points: usize,
    /// RMS distance of the inliers from the refitted plane.
    pub refit_rms: Real,
}

impl FittedPlane {
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }

    pub fn outlier_count(&self) -> usize {
        self.n_points - self.inliers.len()
    }

    /// Share of points rejected by RANSAC, in percent.
    pub fn outlier_percent(&self) -> Real {
        if self.n_points == 0 {
            return 0.0;
        }
        100.0 * self.outlier_count() as Real / self.n_points as Real
    }

    /// Angle between the RANSAC plane and the refitted plane, in degrees.
    pub fn divergence_deg(&self) -> Real {
        self.ransac.angle_to(&self.refit).to_degrees()
    }

    pub fn inlier_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.n_points];
        for &i in &self.inliers {
            mask[i] = true;
        }
        mask
    }

    pub fn inlier_points(&self, points: &[Pt3]) -> Vec<Pt3> {
        self.inliers.iter().map(|&i| points[i]).collect()
    }
}

/// Robust panel plane fitter: RANSAC followed by a least-squares refit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustPlaneFitter {
    /// Minimum number of panel points required to attempt a fit.
    pub min_points: usize,
    /// Inlier distance threshold, in coordinate units.
    pub thresh: Real,
    pub max_iters: usize,
}

impl RobustPlaneFitter {
    pub fn new(min_points: usize, thresh: Real, max_iters: usize) -> Self {
        Self {
            min_points,
            thresh,
            max_iters,
        }
    }

    /// RANSAC options used by [`fit`](Self::fit).
    ///
    /// Every iteration is drawn and the sampled model is scored as is, so
    /// for a fixed random source the inlier count never grows when
    /// `thresh` shrinks.
    pub fn ransac_options(&self) -> RansacOptions {
        RansacOptions {
            max_iters: self.max_iters,
            thresh: self.thresh,
            min_inliers: PlaneEstimator::MIN_SAMPLES,
            confidence: 0.0,
            refit_on_inliers: false,
            ..RansacOptions::default()
        }
    }

    pub fn fit<R: Rng + ?Sized>(
        &self,
        points: &[Pt3],
        rng: &mut R,
    ) -> Result<FittedPlane, PlaneFitError> {
        let need = self.min_points.max(PlaneEstimator::MIN_SAMPLES);
        if points.len() < need {
            return Err(PlaneFitError::InsufficientPoints {
                got: points.len(),
                need,
            });
        }

        let opts = self.ransac_options();
        let res = ransac_with_rng::<PlaneEstimator, _>(points, &opts, rng);
        let ransac = match res.model {
            Some(model) if res.success => model,
            _ => {
                return Err(PlaneFitError::NoConsensus {
                    min_inliers: opts.min_inliers,
                })
            }
        };

        let inlier_pts: Vec<Pt3> = res.inliers.iter().map(|&i| points[i]).collect();
        let refit = fit_plane_lstsq(&inlier_pts)?;

        log::debug!(
            "plane fit: {}/{} inliers after {} iterations, refit rms {:.4}",
            res.inliers.len(),
            points.len(),
            res.iters,
            refit.rms
        );

        Ok(FittedPlane {
            ransac,
            refit: refit.plane,
            inliers: res.inliers,
            n_points: points.len(),
            refit_rms: refit.rms,
        })
    }
}
