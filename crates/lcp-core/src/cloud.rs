//! Lidar point records and simple 2-D spatial bounds.
//!
//! Point clouds here are small: they hold the points of one target window,
//! not a whole flight strip. An array-of-structs layout keeps per-point
//! bookkeeping (panel membership, inlier flags) trivial.

use crate::{Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// One lidar return: position in a projected metric CRS plus optional intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: Real,
    pub y: Real,
    pub z: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u16>,
}

impl PointRecord {
    pub fn new(x: Real, y: Real, z: Real) -> Self {
        Self {
            x,
            y,
            z,
            intensity: None,
        }
    }

    pub fn with_intensity(mut self, intensity: u16) -> Self {
        self.intensity = Some(intensity);
        self
    }

    #[inline]
    pub fn position(&self) -> Pt3 {
        Pt3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn xy(&self) -> Pt2 {
        Pt2::new(self.x, self.y)
    }
}

impl From<Pt3> for PointRecord {
    fn from(p: Pt3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

/// Axis-aligned horizontal bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2 {
    pub min_x: Real,
    pub min_y: Real,
    pub max_x: Real,
    pub max_y: Real,
}

impl Bounds2 {
    /// Square box enclosing a circle of `radius` around `center`.
    pub fn around(center: Pt2, radius: Real) -> Self {
        Self {
            min_x: center.x - radius,
            min_y: center.y - radius,
            max_x: center.x + radius,
            max_y: center.y + radius,
        }
    }

    /// Tight bounds of a set of points, `None` when the set is empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a PointRecord>,
    {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut b = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in it {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        Some(b)
    }

    /// Strict interior test (points on the border are outside).
    #[inline]
    pub fn contains(&self, x: Real, y: Real) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }

    pub fn width(&self) -> Real {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> Real {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> Real {
        self.width() * self.height()
    }

    pub fn center(&self) -> Pt2 {
        Pt2::new(
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }
}

/// An owned set of lidar points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<PointRecord>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<PointRecord>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, p: PointRecord) {
        self.points.push(p);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointRecord> {
        self.points.iter()
    }

    /// Points strictly inside `bounds`, in their original order.
    pub fn window(&self, bounds: &Bounds2) -> PointCloud {
        self.points
            .iter()
            .filter(|p| bounds.contains(p.x, p.y))
            .copied()
            .collect()
    }

    pub fn bounds(&self) -> Option<Bounds2> {
        Bounds2::from_points(&self.points)
    }

    pub fn positions(&self) -> Vec<Pt3> {
        self.points.iter().map(PointRecord::position).collect()
    }

    pub fn max_z(&self) -> Option<Real> {
        self.points.iter().map(|p| p.z).reduce(Real::max)
    }
}

impl FromIterator<PointRecord> for PointCloud {
    fn from_iter<I: IntoIterator<Item = PointRecord>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl Extend<PointRecord> for PointCloud {
    fn extend<I: IntoIterator<Item = PointRecord>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a PointRecord;
    type IntoIter = std::slice::Iter<'a, PointRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_cloud() -> PointCloud {
        let mut c = PointCloud::new();
        for i in 0..5 {
            for j in 0..5 {
                c.push(PointRecord::new(i as Real, j as Real, (i + j) as Real));
            }
        }
        c
    }

    #[test]
    fn window_excludes_border_points() {
        let cloud = square_cloud();
        let b = Bounds2::around(Pt2::new(2.0, 2.0), 1.0);
        let w = cloud.window(&b);
        // Only (2,2) is strictly inside (1,3)x(1,3).
        assert_eq!(w.len(), 1);
        assert_eq!(w.points[0].position(), Pt3::new(2.0, 2.0, 4.0));
    }

    #[test]
    fn bounds_of_empty_cloud_is_none() {
        assert!(PointCloud::new().bounds().is_none());
        assert!(PointCloud::new().max_z().is_none());
    }

    #[test]
    fn bounds_and_area() {
        let b = square_cloud().bounds().unwrap();
        assert_eq!(b.width(), 4.0);
        assert_eq!(b.height(), 4.0);
        assert_eq!(b.area(), 16.0);
        assert_eq!(b.center(), Pt2::new(2.0, 2.0));
    }

    #[test]
    fn intensity_is_optional_in_json() {
        let p = PointRecord::new(1.0, 2.0, 3.0);
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("intensity"), "{json}");
        let q: PointRecord = serde_json::from_str(r#"{"x":1,"y":2,"z":3,"intensity":17}"#).unwrap();
        assert_eq!(q.intensity, Some(17));
    }
}
