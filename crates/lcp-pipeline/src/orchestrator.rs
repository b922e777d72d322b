//! Batch estimation over every approximate pose of a configuration.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::WindowCache;
use crate::config::{LcpConfig, TargetApproxPose};
use crate::error::Result;
use crate::estimate::{GableRoofEstimator, TargetEstimate};
use crate::source::SourceCatalog;
use crate::window::PointCloudWindow;

/// Options of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Only process targets with this name.
    pub target_filter: Option<String>,
    /// Process targets on the rayon thread pool.
    pub parallel: bool,
    /// Read and write target windows through this cache.
    pub cache: Option<WindowCache>,
}

/// A target that could not be estimated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFailure {
    pub name: String,
    pub source: String,
    /// [`kind`](crate::EstimationError::kind) of the error.
    pub kind: String,
    pub message: String,
}

/// Estimates and failures of one batch, each sorted by `(name, source)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub estimates: Vec<TargetEstimate>,
    pub failures: Vec<TargetFailure>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty() && self.failures.is_empty()
    }

    pub fn estimate(&self, name: &str) -> Option<&TargetEstimate> {
        self.estimates.iter().find(|e| e.name() == name)
    }

    pub fn failure(&self, name: &str) -> Option<&TargetFailure> {
        self.failures.iter().find(|f| f.name == name)
    }
}

/// Runs [`GableRoofEstimator`] over the targets of an [`LcpConfig`].
///
/// Per-target failures are logged and collected in
/// [`BatchReport::failures`]; only fatal errors (see
/// [`is_fatal`](crate::EstimationError::is_fatal)) are returned from
/// [`run`](Self::run).
pub struct EstimationOrchestrator<C> {
    config: LcpConfig,
    catalog: C,
    estimator: GableRoofEstimator,
}

impl<C: SourceCatalog> EstimationOrchestrator<C> {
    /// Refuses a configuration of another version before any other check.
    pub fn new(config: LcpConfig, catalog: C) -> Result<Self> {
        config.check_version()?;
        config.target.validate()?;
        let estimator = GableRoofEstimator::new(&config.target);
        Ok(Self {
            config,
            catalog,
            estimator,
        })
    }

    pub fn run(&self, options: &BatchOptions) -> Result<BatchReport> {
        let targets = self.config.select(options.target_filter.as_deref())?;
        log::info!(
            "estimating {} target(s){}",
            targets.len(),
            if options.parallel { " in parallel" } else { "" }
        );

        let cache = options.cache.as_ref();
        let outcomes: Vec<(&TargetApproxPose, Result<TargetEstimate>)> = if options.parallel {
            targets
                .par_iter()
                .map(|pose| (*pose, self.estimate_target(pose, cache)))
                .collect()
        } else {
            targets
                .iter()
                .map(|pose| (*pose, self.estimate_target(pose, cache)))
                .collect()
        };

        let mut report = BatchReport::default();
        for (pose, outcome) in outcomes {
            match outcome {
                Ok(estimate) => report.estimates.push(estimate),
                Err(err) => {
                    log::warn!(
                        "{} on {}: {} ({})",
                        pose.name,
                        pose.source,
                        err,
                        err.kind()
                    );
                    report.failures.push(TargetFailure {
                        name: pose.name.clone(),
                        source: pose.source.clone(),
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        report
            .estimates
            .sort_by(|a, b| (a.name(), a.source()).cmp(&(b.name(), b.source())));
        report
            .failures
            .sort_by(|a, b| (&a.name, &a.source).cmp(&(&b.name, &b.source)));

        log::info!(
            "{} target(s) estimated, {} failed",
            report.estimates.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Read the window of one pose (through `cache` when given) and estimate
    /// it with a random source seeded from `SEED`.
    pub fn estimate_target(
        &self,
        pose: &TargetApproxPose,
        cache: Option<&WindowCache>,
    ) -> Result<TargetEstimate> {
        log::info!(
            "{}: reading {} around ({:.3}, {:.3})",
            pose.name,
            pose.source,
            pose.x,
            pose.y
        );
        let bounds = PointCloudWindow::bounds_for(pose.center(), &self.config.target);
        let read = || self.catalog.open(&pose.source)?.read_window(&bounds);
        let cloud = match cache {
            Some(cache) => cache.fetch_or_read(&pose.source, &pose.name, &bounds, read)?,
            None => read()?,
        };
        let window = PointCloudWindow::from_cloud(bounds, cloud)?;
        log::info!("{}: {} points in target window", pose.name, window.len());

        let estimate = self.estimator.estimate(pose, &window)?;
        log::info!(
            "{}: estimate {:.3}, {:.3}, {:.3} (approx {:.3}, {:.3}, az {:.1})",
            pose.name,
            estimate.center.x,
            estimate.center.y,
            estimate.center.z,
            pose.x,
            pose.y,
            pose.azimuth_deg
        );
        Ok(estimate)
    }
}

impl<C> std::fmt::Debug for EstimationOrchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run every selected target of `config` against `catalog`.
pub fn run_batch<C: SourceCatalog>(
    config: LcpConfig,
    catalog: C,
    options: &BatchOptions,
) -> Result<BatchReport> {
    EstimationOrchestrator::new(config, catalog)?.run(options)
}
