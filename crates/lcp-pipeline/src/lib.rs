//! Batch estimation of gable-roof lidar control plane (LCP) positions.
//!
//! A run is described by a versioned YAML [`LcpConfig`]: the target
//! geometry and RANSAC settings plus, per flight line, the approximate pose
//! of each target. For every pose the [`EstimationOrchestrator`]
//!
//! 1. reads the point window around the pose ([`PointCloudWindow`]),
//! 2. splits it into left/right panels and fits a plane to each with RANSAC
//!    and a least-squares refit ([`GableRoofEstimator`]),
//! 3. intersects the planes and bounds the ridge by the projected inliers.
//!
//! The midpoint of the ridge is the target position. Results are exported
//! as a delimited table or GeoJSON ([`report`]).
//!
//! # Example
//!
//! ```no_run
//! use lcp_pipeline::{run_batch, BatchOptions, FileCatalog, LcpConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), lcp_pipeline::EstimationError> {
//! let config = LcpConfig::load(Path::new("survey/lcp.yaml"))?;
//! let report = run_batch(config, FileCatalog::new(), &BatchOptions::default())?;
//! for e in &report.estimates {
//!     println!("{} {:.3} {:.3} {:.3}", e.name(), e.center.x, e.center.y, e.center.z);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod estimate;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod window;

pub use cache::WindowCache;
pub use config::{LcpConfig, TargetApproxPose, TargetConfig, SUPPORTED_VERSION};
pub use error::{EstimationError, Result};
pub use estimate::{GableRoofEstimator, PanelReport, TargetEstimate};
pub use orchestrator::{
    run_batch, BatchOptions, BatchReport, EstimationOrchestrator, TargetFailure,
};
pub use source::{
    FileCatalog, InMemorySource, LasFileSource, MemoryCatalog, PointSource, SourceCatalog,
    XyzFileSource,
};
pub use window::{PointCloudWindow, WindowSummary};
