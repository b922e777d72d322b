use std::path::PathBuf;

use lcp_geom::{PlaneFitError, RidgeError, Side};
use thiserror::Error;

/// Errors raised while loading a run or estimating one target.
///
/// Configuration and target-selection errors abort the whole run (see
/// [`is_fatal`](Self::is_fatal)); everything else aborts only the target
/// being processed.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("{side} panel has {got} points, need at least {need}")]
    InsufficientPoints { side: Side, got: usize, need: usize },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("configuration VERSION {found:?} is not supported, expected {expected:?}")]
    ConfigVersionMismatch { found: String, expected: String },
    #[error("target {0:?} is not listed in FLIGHT_LINE")]
    MissingApproxPose(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("point source {source_id}: {message}")]
    PointSource { source_id: String, message: String },
}

pub type Result<T, E = EstimationError> = std::result::Result<T, E>;

impl EstimationError {
    /// Whether the error aborts the whole run rather than one target.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigVersionMismatch { .. }
                | Self::MissingApproxPose(_)
                | Self::InvalidConfig(_)
                | Self::ConfigParse(_)
        )
    }

    /// Stable short name of the variant, used in failure tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientPoints { .. } => "InsufficientPoints",
            Self::DegenerateGeometry(_) => "DegenerateGeometry",
            Self::ConfigVersionMismatch { .. } => "ConfigVersionMismatch",
            Self::MissingApproxPose(_) => "MissingApproxPose",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::ConfigParse(_) => "ConfigParse",
            Self::Io { .. } => "Io",
            Self::PointSource { .. } => "PointSource",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn point_source(source_id: impl Into<String>, message: impl ToString) -> Self {
        Self::PointSource {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }

    /// Attribute a plane-fit failure to a panel.
    pub fn from_plane_fit(side: Side, err: PlaneFitError) -> Self {
        match err {
            PlaneFitError::InsufficientPoints { got, need } => {
                Self::InsufficientPoints { side, got, need }
            }
            other => Self::DegenerateGeometry(format!("{side} panel: {other}")),
        }
    }
}

impl From<RidgeError> for EstimationError {
    fn from(err: RidgeError) -> Self {
        Self::DegenerateGeometry(err.to_string())
    }
}
