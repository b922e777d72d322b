//! Point window around an approximate target position.

use lcp_core::{Bounds2, PointCloud, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

use crate::config::TargetConfig;
use crate::error::{EstimationError, Result};
use crate::source::PointSource;

/// Diagnostics of one extracted window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub count: usize,
    /// The query box.
    pub query: Bounds2,
    /// Width and height of the bounding box of the returned points.
    pub extent: [Real; 2],
    /// Points per square meter of the query box.
    pub density: Real,
    pub max_z: Real,
}

/// The points of one source inside the square enclosing the circle of
/// radius `BUFF_CIRC * RADIUS` around an approximate target center.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudWindow {
    pub bounds: Bounds2,
    pub cloud: PointCloud,
}

impl PointCloudWindow {
    pub fn bounds_for(center: Pt2, config: &TargetConfig) -> Bounds2 {
        Bounds2::around(center, config.window_radius())
    }

    pub fn extract(source: &dyn PointSource, center: Pt2, config: &TargetConfig) -> Result<Self> {
        let bounds = Self::bounds_for(center, config);
        let cloud = source.read_window(&bounds)?;
        Self::from_cloud(bounds, cloud)
    }

    /// Wrap an already-read cloud. An empty cloud is a "no data" failure.
    pub fn from_cloud(bounds: Bounds2, cloud: PointCloud) -> Result<Self> {
        if cloud.is_empty() {
            return Err(EstimationError::DegenerateGeometry(format!(
                "no points in the {:.1} x {:.1} m target window",
                bounds.width(),
                bounds.height()
            )));
        }
        Ok(Self { bounds, cloud })
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    pub fn positions(&self) -> Vec<Pt3> {
        self.cloud.positions()
    }

    pub fn summary(&self) -> WindowSummary {
        let extent = self
            .cloud
            .bounds()
            .map(|b| [b.width(), b.height()])
            .unwrap_or([0.0, 0.0]);
        let area = self.bounds.area();
        WindowSummary {
            count: self.cloud.len(),
            query: self.bounds,
            extent,
            density: if area > 0.0 {
                self.cloud.len() as Real / area
            } else {
                0.0
            },
            max_z: self.cloud.max_z().unwrap_or(Real::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use approx::assert_abs_diff_eq;
    use lcp_core::PointRecord;

    fn source() -> InMemorySource {
        let pts = (0..100)
            .map(|i| PointRecord::new(i as Real * 0.1, 0.0, i as Real * 0.01))
            .collect();
        InMemorySource::new("line", pts)
    }

    #[test]
    fn window_box_encloses_the_buffered_circle() {
        let cfg = TargetConfig::new(1.10, 0.65, 1.22);
        let b = PointCloudWindow::bounds_for(Pt2::new(10.0, 20.0), &cfg);
        let r = 2.0 * cfg.radius();
        assert_abs_diff_eq!(b.min_x, 10.0 - r, epsilon = 1e-12);
        assert_abs_diff_eq!(b.max_y, 20.0 + r, epsilon = 1e-12);
    }

    #[test]
    fn extract_reports_density_and_extent() {
        let cfg = TargetConfig::new(1.10, 0.65, 1.22);
        let win = PointCloudWindow::extract(&source(), Pt2::new(5.0, 0.0), &cfg).unwrap();
        let r = cfg.window_radius();
        let s = win.summary();

        // x = 0.0 .. 9.9 step 0.1, strictly inside (5 - r, 5 + r)
        let expected = (0..100)
            .filter(|i| (*i as Real * 0.1 - 5.0).abs() < r)
            .count();
        assert_eq!(s.count, expected);
        assert_abs_diff_eq!(s.density, expected as Real / (4.0 * r * r), epsilon = 1e-9);
        assert_eq!(s.extent[1], 0.0);
        assert!(s.extent[0] > 0.0 && s.extent[0] < 2.0 * r);
    }

    #[test]
    fn empty_window_is_degenerate() {
        let cfg = TargetConfig::new(1.10, 0.65, 1.22);
        let err = PointCloudWindow::extract(&source(), Pt2::new(500.0, 500.0), &cfg).unwrap_err();
        assert_eq!(err.kind(), "DegenerateGeometry");
        assert!(err.to_string().contains("no points"));
    }
}
