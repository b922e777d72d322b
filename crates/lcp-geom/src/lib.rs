//! Geometry estimators for gable-roof lidar control planes.
//!
//! - [`plane`]: plane model, RANSAC plane estimator and least-squares refit,
//! - [`panel`]: left/right panel polygons around an approximate ridge and
//!   point-to-panel assignment,
//! - [`ridge`]: intersection of the two panel planes, projection of inliers
//!   onto the ridge and derived length / azimuth / slope.

pub mod panel;
pub mod plane;
pub mod ridge;

pub use panel::*;
pub use plane::*;
pub use ridge::*;
