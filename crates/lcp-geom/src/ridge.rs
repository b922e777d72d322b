//! Ridge line from two panel planes.
//!
//! The ridge is the intersection line of the left and right panel planes.
//! Inliers of each panel are projected onto it; the extreme projections
//! give one segment per side and one for both sides together. The combined
//! segment's midpoint is the target position.

use std::cmp::Ordering;

use lcp_core::{azimuth_deg, Pt3, Real, Vec2, Vec3};
use nalgebra::UnitVector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Plane, Side};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RidgeError {
    #[error(
        "panel planes are nearly parallel: {angle_deg:.4} deg between normals, need {min_deg} deg"
    )]
    NearParallel { angle_deg: Real, min_deg: Real },
    #[error("no inlier points on the {0} panel")]
    EmptySide(Side),
}

/// Infinite 3-D line through `point` along unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RidgeLine {
    pub point: Pt3,
    pub direction: UnitVector3<Real>,
}

impl RidgeLine {
    /// Line parameter of the orthogonal projection of `p`.
    pub fn parameter(&self, p: &Pt3) -> Real {
        self.direction.dot(&(p - self.point))
    }

    pub fn at(&self, t: Real) -> Pt3 {
        self.point + self.direction.into_inner() * t
    }

    pub fn project(&self, p: &Pt3) -> Pt3 {
        self.at(self.parameter(p))
    }

    pub fn distance(&self, p: &Pt3) -> Real {
        (p - self.project(p)).norm()
    }

    /// Azimuth of the line direction in degrees, `[0, 360)`.
    pub fn azimuth_deg(&self) -> Real {
        azimuth_deg(self.direction.x, self.direction.y)
    }
}

/// Intersection line of two planes.
///
/// The line point is the point of the line closest to `anchor`; choosing an
/// anchor near the data keeps the solve well conditioned at map coordinates.
/// The direction is `a.normal x b.normal`, normalized, with no orientation
/// applied. Fails when the planes are closer than `min_angle_rad` to
/// parallel.
pub fn intersect_planes(
    a: &Plane,
    b: &Plane,
    anchor: &Pt3,
    min_angle_rad: Real,
) -> Result<RidgeLine, RidgeError> {
    let angle = a.angle_to(b);
    if angle < min_angle_rad {
        return Err(RidgeError::NearParallel {
            angle_deg: angle.to_degrees(),
            min_deg: min_angle_rad.to_degrees(),
        });
    }

    let n1 = a.normal.into_inner();
    let n2 = b.normal.into_inner();
    let u = n1.cross(&n2);
    let h1 = n1.dot(&(a.origin - anchor));
    let h2 = n2.dot(&(b.origin - anchor));
    let offset = (n2.cross(&u) * h1 + u.cross(&n1) * h2) / u.norm_squared();

    Ok(RidgeLine {
        point: anchor + offset,
        direction: UnitVector3::new_normalize(u),
    })
}

/// Segment between the two extreme projections of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RidgeSegment {
    pub start: Pt3,
    pub end: Pt3,
}

impl RidgeSegment {
    /// Project `points` onto `line` and keep the first and last projection
    /// along the line direction. Ties on the line parameter are broken by
    /// lexicographic `(x, y, z)`, so the result does not depend on the input
    /// order.
    pub fn from_projection(line: &RidgeLine, points: &[Pt3]) -> Option<Self> {
        let keyed: Vec<(Real, Pt3)> = points
            .iter()
            .map(|p| {
                let t = line.parameter(p);
                (t, line.at(t))
            })
            .collect();
        let start = keyed.iter().min_by(|a, b| along_line(a, b))?;
        let end = keyed.iter().max_by(|a, b| along_line(a, b))?;
        Some(Self {
            start: start.1,
            end: end.1,
        })
    }

    pub fn delta(&self) -> Vec3 {
        self.end - self.start
    }

    /// Euclidean 3-D length.
    pub fn length(&self) -> Real {
        self.delta().norm()
    }

    pub fn azimuth_deg(&self) -> Real {
        let d = self.delta();
        azimuth_deg(d.x, d.y)
    }

    /// Height change from start to end.
    pub fn slope(&self) -> Real {
        self.end.z - self.start.z
    }

    pub fn midpoint(&self) -> Pt3 {
        nalgebra::center(&self.start, &self.end)
    }
}

fn along_line(a: &(Real, Pt3), b: &(Real, Pt3)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.x.total_cmp(&b.1.x))
        .then(a.1.y.total_cmp(&b.1.y))
        .then(a.1.z.total_cmp(&b.1.z))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeResult {
    pub line: RidgeLine,
    /// Angle between the two panel normals, degrees.
    pub dihedral_deg: Real,
    pub left: RidgeSegment,
    pub right: RidgeSegment,
    pub combined: RidgeSegment,
    pub left_projected: Vec<Pt3>,
    pub right_projected: Vec<Pt3>,
}

impl RidgeResult {
    /// Estimated target position: midpoint of the combined segment.
    pub fn center(&self) -> Pt3 {
        self.combined.midpoint()
    }

    pub fn segment(&self, side: Side) -> &RidgeSegment {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn projected(&self, side: Side) -> &[Pt3] {
        match side {
            Side::Left => &self.left_projected,
            Side::Right => &self.right_projected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeSolver {
    /// Minimum angle between the panel normals, degrees.
    pub min_dihedral_deg: Real,
}

impl Default for RidgeSolver {
    fn default() -> Self {
        Self {
            min_dihedral_deg: 1.0,
        }
    }
}

impl RidgeSolver {
    pub fn new(min_dihedral_deg: Real) -> Self {
        Self { min_dihedral_deg }
    }

    /// Intersect the panel planes and bound the ridge by the panels' inliers.
    ///
    /// `heading` is the approximate horizontal ridge direction; the line
    /// direction is flipped to agree with it. Without a heading the first
    /// non-zero component of the direction is made positive.
    pub fn solve(
        &self,
        left_plane: &Plane,
        left_inliers: &[Pt3],
        right_plane: &Plane,
        right_inliers: &[Pt3],
        heading: Option<Vec2>,
    ) -> Result<RidgeResult, RidgeError> {
        if left_inliers.is_empty() {
            return Err(RidgeError::EmptySide(Side::Left));
        }
        if right_inliers.is_empty() {
            return Err(RidgeError::EmptySide(Side::Right));
        }

        let all = left_inliers.iter().chain(right_inliers);
        let count = (left_inliers.len() + right_inliers.len()) as Real;
        let anchor = Pt3::from(all.fold(Vec3::zeros(), |acc, p| acc + p.coords) / count);

        let mut line = intersect_planes(
            left_plane,
            right_plane,
            &anchor,
            self.min_dihedral_deg.to_radians(),
        )?;
        line.direction = oriented(line.direction, heading);

        let project_all =
            |pts: &[Pt3]| -> Vec<Pt3> { pts.iter().map(|p| line.project(p)).collect() };
        let left_projected = project_all(left_inliers);
        let right_projected = project_all(right_inliers);

        let left = RidgeSegment::from_projection(&line, left_inliers)
            .ok_or(RidgeError::EmptySide(Side::Left))?;
        let right = RidgeSegment::from_projection(&line, right_inliers)
            .ok_or(RidgeError::EmptySide(Side::Right))?;
        let both: Vec<Pt3> = left_inliers.iter().chain(right_inliers).copied().collect();
        let combined = RidgeSegment::from_projection(&line, &both)
            .ok_or(RidgeError::EmptySide(Side::Left))?;

        let dihedral_deg = left_plane.normal_angle_to(right_plane).to_degrees();
        log::debug!(
            "ridge: dihedral {:.3} deg, direction ({:.5}, {:.5}, {:.5}), combined length {:.4}",
            dihedral_deg,
            line.direction.x,
            line.direction.y,
            line.direction.z,
            combined.length()
        );

        Ok(RidgeResult {
            line,
            dihedral_deg,
            left,
            right,
            combined,
            left_projected,
            right_projected,
        })
    }
}

fn oriented(direction: UnitVector3<Real>, heading: Option<Vec2>) -> UnitVector3<Real> {
    let flip = match heading {
        Some(h) => direction.x * h.x + direction.y * h.y < 0.0,
        None => {
            let first = [direction.x, direction.y, direction.z]
                .into_iter()
                .find(|c| *c != 0.0)
                .unwrap_or(0.0);
            first < 0.0
        }
    };
    if flip {
        UnitVector3::new_unchecked(-direction.into_inner())
    } else {
        direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lcp_core::{heading_from_azimuth, undirected_angle_between};

    /// Two planes through `p0` whose intersection runs along `d`, with
    /// normals `alpha` either side of the bisector normal.
    fn planes_through_line(p0: Pt3, d: Vec3, alpha: Real) -> (Plane, Plane) {
        let d = d.normalize();
        let e1 = d.cross(&Vec3::z()).normalize();
        let e2 = d.cross(&e1);
        let (s, c) = alpha.sin_cos();
        let a = Plane::from_point_normal(p0, e2 * c + e1 * s).unwrap();
        let b = Plane::from_point_normal(p0, e2 * c - e1 * s).unwrap();
        (a, b)
    }

    #[test]
    fn intersection_matches_analytic_direction() {
        let p0 = Pt3::new(500_010.0, 4_200_020.0, 103.0);
        let d = Vec3::new(0.3, 0.8, 0.05);
        for alpha_deg in [1.0, 10.0, 32.0, 60.0] {
            let (a, b) = planes_through_line(p0, d, Real::to_radians(alpha_deg));
            let anchor = p0 + Vec3::new(0.4, -0.2, 0.1);
            let line = intersect_planes(&a, &b, &anchor, 0.5_f64.to_radians()).unwrap();

            assert!(undirected_angle_between(&line.direction, &d) < 1e-6);
            assert!(line.distance(&p0) < 1e-6);
            assert!(a.distance(&line.point) < 1e-7);
            assert!(b.distance(&line.point) < 1e-7);
        }
    }

    #[test]
    fn near_parallel_planes_are_rejected() {
        let (a, b) = planes_through_line(Pt3::origin(), Vec3::y(), 0.025_f64.to_radians());
        let err = intersect_planes(&a, &b, &Pt3::origin(), 1.0_f64.to_radians()).unwrap_err();
        match err {
            RidgeError::NearParallel { angle_deg, min_deg } => {
                assert_abs_diff_eq!(angle_deg, 0.05, epsilon = 1e-9);
                assert_abs_diff_eq!(min_deg, 1.0, epsilon = 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn roof_points(plane: &Plane, line_pt: Pt3, along: Vec3, across: Vec3) -> Vec<Pt3> {
        let mut pts = Vec::new();
        for i in 1..=5 {
            for j in -10..=10 {
                let p = line_pt + along * (0.05 * j as Real) + across * (0.05 * i as Real);
                pts.push(plane.project(&p));
            }
        }
        pts
    }

    #[test]
    fn solve_bounds_ridge_by_both_panels() {
        let center = Pt3::new(1000.0, 2000.0, 5.35);
        let heading = heading_from_azimuth(30.0_f64.to_radians());
        let along = Vec3::new(heading.x, heading.y, 0.0);
        let right_dir = Vec3::new(heading.y, -heading.x, 0.0);
        let (a, b) = planes_through_line(center, along, 32.0_f64.to_radians());
        // the left panel rises toward the ridge, so its normal leans left
        let (left, right) = if a.normal.dot(&right_dir) < 0.0 {
            (a, b)
        } else {
            (b, a)
        };

        let l_pts = roof_points(&left, center, along, -right_dir);
        let r_pts = roof_points(&right, center, along, right_dir);
        let res = RidgeSolver::default()
            .solve(&left, &l_pts, &right, &r_pts, Some(heading))
            .unwrap();

        assert_abs_diff_eq!(res.combined.azimuth_deg(), 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(res.line.azimuth_deg(), 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(res.combined.length(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(res.combined.slope(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!((res.center() - center).norm(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(res.dihedral_deg, 64.0, epsilon = 1e-9);
        assert_eq!(res.projected(Side::Left).len(), l_pts.len());
        assert_abs_diff_eq!(res.segment(Side::Right).length(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn steep_roof_reports_obtuse_dihedral() {
        let center = Pt3::new(10.0, 20.0, 3.0);
        let (a, b) = planes_through_line(center, Vec3::y(), 60.0_f64.to_radians());
        let l_pts = roof_points(&a, center, Vec3::y(), -Vec3::x());
        let r_pts = roof_points(&b, center, Vec3::y(), Vec3::x());
        let res = RidgeSolver::default()
            .solve(&a, &l_pts, &b, &r_pts, None)
            .unwrap();

        assert_abs_diff_eq!(res.dihedral_deg, 120.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a.angle_to(&b).to_degrees(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn heading_sets_direction_sign() {
        let (a, b) = planes_through_line(Pt3::origin(), Vec3::x(), 0.3);
        let pts = vec![Pt3::new(-1.0, 0.0, 0.0), Pt3::new(2.0, 0.0, 0.0)];
        let solver = RidgeSolver::default();

        let west = solver
            .solve(&a, &pts, &b, &pts, Some(Vec2::new(-1.0, 0.0)))
            .unwrap();
        assert_abs_diff_eq!(west.combined.azimuth_deg(), 270.0, epsilon = 1e-9);
        assert_abs_diff_eq!(west.combined.start.x, 2.0, epsilon = 1e-9);

        let canonical = solver.solve(&a, &pts, &b, &pts, None).unwrap();
        assert_abs_diff_eq!(canonical.combined.azimuth_deg(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn extremes_do_not_depend_on_input_order() {
        let line = RidgeLine {
            point: Pt3::new(10.0, 0.0, 1.0),
            direction: Vec3::y_axis(),
        };
        // pairs share a line parameter
        let pts = vec![
            Pt3::new(10.0, -1.0, 1.0),
            Pt3::new(10.2, -1.0, 1.0),
            Pt3::new(9.8, 3.0, 1.0),
            Pt3::new(10.0, 3.0, 0.5),
            Pt3::new(10.0, 1.0, 1.0),
        ];
        let mut reversed = pts.clone();
        reversed.reverse();

        let a = RidgeSegment::from_projection(&line, &pts).unwrap();
        let b = RidgeSegment::from_projection(&line, &reversed).unwrap();
        assert_eq!(a, b);
        assert_abs_diff_eq!(a.length(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.azimuth_deg(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_panel_is_reported() {
        let (a, b) = planes_through_line(Pt3::origin(), Vec3::y(), 0.3);
        let pts = vec![Pt3::origin()];
        let err = RidgeSolver::default()
            .solve(&a, &pts, &b, &[], None)
            .unwrap_err();
        assert_eq!(err, RidgeError::EmptySide(Side::Right));
    }
}
