//! Left/right roof panel polygons and point assignment.
//!
//! Panels are rectangles in a target-local frame where `v` runs along the
//! ridge (toward the approximate azimuth) and `u` runs across it, positive
//! to the right. For side sign `s` (left = -1, right = +1) the panel covers
//!
//! ```text
//! u in [s * BASE/2 * BUFF_LFRT[0], s * BASE/2 * BUFF_LFRT[1]]
//! v in [-BUFF_RIDGE * LENGTH/2, +BUFF_RIDGE * LENGTH/2]
//! ```
//!
//! so a strip of half-width `BASE/2 * BUFF_LFRT[0]` around the ridge belongs
//! to neither panel.

use std::fmt;

use lcp_core::{rotate_clockwise, PointRecord, Pt2, Real, Vec2};
use serde::{Deserialize, Serialize};

/// Roof side relative to the ridge, looking along the azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// `-1` for left, `+1` for right.
    pub fn sign(self) -> Real {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Simple polygon in the horizontal plane, vertices in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon2 {
    pub vertices: Vec<Pt2>,
}

impl Polygon2 {
    pub fn new(vertices: Vec<Pt2>) -> Self {
        Self { vertices }
    }

    /// Even-odd (crossing number) point-in-polygon test.
    pub fn contains(&self, p: &Pt2) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = &self.vertices[i];
            let b = &self.vertices[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Unsigned area (shoelace formula).
    pub fn area(&self) -> Real {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let twice: Real = (0..n)
            .map(|i| {
                let a = &self.vertices[i];
                let b = &self.vertices[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        0.5 * twice.abs()
    }

    /// Separating-axis test for two convex polygons.
    ///
    /// Polygons that only touch along an edge are not disjoint.
    pub fn is_disjoint_convex(&self, other: &Polygon2) -> bool {
        self.edge_normals()
            .chain(other.edge_normals())
            .any(|axis| {
                let (a_min, a_max) = self.project_onto(&axis);
                let (b_min, b_max) = other.project_onto(&axis);
                a_max < b_min || b_max < a_min
            })
    }

    fn edge_normals(&self) -> impl Iterator<Item = Vec2> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| {
            let e = self.vertices[(i + 1) % n] - self.vertices[i];
            Vec2::new(-e.y, e.x)
        })
    }

    fn project_onto(&self, axis: &Vec2) -> (Real, Real) {
        self.vertices
            .iter()
            .map(|v| v.coords.dot(axis))
            .fold((Real::INFINITY, Real::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            })
    }
}

/// Panel sizing parameters derived from the target configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelDims {
    pub base: Real,
    pub length: Real,
    /// Fraction of `length` kept along the ridge.
    pub buff_ridge: Real,
    /// Inner and outer fractions of `base / 2` kept across the ridge.
    pub buff_lfrt: [Real; 2],
}

/// Both panel polygons around one approximate ridge, in map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelLayout {
    pub center: Pt2,
    pub azimuth_deg: Real,
    /// Approximate ridge end points, from `-LENGTH/2` to `+LENGTH/2`.
    pub ridge: [Pt2; 2],
    pub left: Polygon2,
    pub right: Polygon2,
}

impl PanelLayout {
    pub fn polygon(&self, side: Side) -> &Polygon2 {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// The panel containing `p`, if any.
    pub fn classify(&self, p: &Pt2) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|&side| self.polygon(side).contains(p))
    }
}

/// Points assigned to each panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelPartition {
    pub left: Vec<PointRecord>,
    pub right: Vec<PointRecord>,
    /// Points of the window that fell in neither panel.
    pub discarded: usize,
}

impl PanelPartition {
    pub fn side(&self, side: Side) -> &[PointRecord] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Builds panel polygons around an approximate pose and splits points
/// between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelPartitioner {
    dims: PanelDims,
}

impl PanelPartitioner {
    pub fn new(dims: PanelDims) -> Self {
        Self { dims }
    }

    pub fn layout(&self, center: Pt2, azimuth_deg: Real) -> PanelLayout {
        let az = azimuth_deg.to_radians();
        let to_map = |u: Real, v: Real| center + rotate_clockwise(&Vec2::new(u, v), az);

        let half_len = 0.5 * self.dims.length;
        let half_base = 0.5 * self.dims.base;
        let v_half = self.dims.buff_ridge * half_len;

        let panel = |side: Side| {
            let s = side.sign();
            let u0 = s * half_base * self.dims.buff_lfrt[0];
            let u1 = s * half_base * self.dims.buff_lfrt[1];
            Polygon2::new(vec![
                to_map(u0, -v_half),
                to_map(u1, -v_half),
                to_map(u1, v_half),
                to_map(u0, v_half),
            ])
        };

        PanelLayout {
            center,
            azimuth_deg,
            ridge: [to_map(0.0, -half_len), to_map(0.0, half_len)],
            left: panel(Side::Left),
            right: panel(Side::Right),
        }
    }

    /// Assign every point to the panel containing its horizontal position.
    pub fn partition(&self, layout: &PanelLayout, points: &[PointRecord]) -> PanelPartition {
        let mut out = PanelPartition::default();
        for p in points {
            match layout.classify(&p.xy()) {
                Some(Side::Left) => out.left.push(*p),
                Some(Side::Right) => out.right.push(*p),
                None => out.discarded += 1,
            }
        }
        log::debug!(
            "panel partition: {} left, {} right, {} discarded",
            out.left.len(),
            out.right.len(),
            out.discarded
        );
        out
    }
}
