//! Core math and data primitives for `lcp-estimate`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Pt3`, ...) and survey
//!   angle helpers (azimuth clockwise from north),
//! - the lidar point data model (`PointRecord`, `PointCloud`, `Bounds2`),
//! - a generic RANSAC engine (`ransac`, [`Estimator`]),
//! - deterministic synthetic gable-roof targets for tests ([`synthetic`]).
//!
//! Coordinates are expected in a projected metric CRS (e.g. UTM): `x` east,
//! `y` north, `z` up.

/// Point records, clouds and 2-D bounds.
pub mod cloud;
/// Linear algebra type aliases and angle helpers.
pub mod math;
/// Generic RANSAC engine and traits.
pub mod ransac;
/// Synthetic gable-roof point clouds.
pub mod synthetic;

pub use cloud::*;
pub use math::*;
pub use ransac::*;
