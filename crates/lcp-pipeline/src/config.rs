//! Versioned YAML run configuration.
//!
//! ```yaml
//! VERSION: "0.3"
//! BASE: 1.10
//! WIDTH: 0.65
//! LENGTH: 1.22
//! BUFF_RIDGE: 0.9
//! BUFF_LFRT: [0.1, 0.9]
//! MINPOINTS: 30
//! THRESH: 0.02
//! MAXITER: 1000
//! FLIGHT_LINE:
//!   strips/line_01.las:
//!     - [LCP-01, 661234.50, 1523456.70, 30.0]
//!     - [LCP-02, 661301.20, 1523498.10, 12.8, 120.0]
//! ```
//!
//! Target tuples are `[name, X, Y, AZ]` or `[name, X, Y, HAE, AZ, ...]`.
//! `SEED`, `BUFF_CIRC` and `MIN_DIHEDRAL_DEG` are optional.

use std::collections::BTreeMap;
use std::path::Path;

use lcp_core::{heading_from_azimuth, Pt2, Real, Vec2};
use lcp_geom::PanelDims;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{EstimationError, Result};

/// Configuration format version understood by this crate.
pub const SUPPORTED_VERSION: &str = "0.3";
pub const DEFAULT_SEED: u64 = 1_234_567;
pub const DEFAULT_BUFF_CIRC: Real = 2.0;
pub const DEFAULT_MIN_DIHEDRAL_DEG: Real = 1.0;

/// Geometric and algorithmic constants shared by every target of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Horizontal distance between the eave lines, meters.
    pub base: Real,
    /// Slanted width of one panel, meters.
    pub width: Real,
    /// Ridge length, meters.
    pub length: Real,
    pub buff_ridge: Real,
    pub buff_lfrt: [Real; 2],
    /// Minimum number of points a panel needs before a plane is fitted.
    pub min_points: usize,
    /// RANSAC inlier distance, meters.
    pub thresh: Real,
    pub max_iter: usize,
    pub seed: u64,
    /// Window half-size as a multiple of [`radius`](Self::radius).
    pub buff_circ: Real,
    pub min_dihedral_deg: Real,
}

impl TargetConfig {
    /// Target of the given size with the buffer and RANSAC settings used by
    /// the field configurations: `BUFF_RIDGE = 0.9`, `BUFF_LFRT = [0.1, 0.9]`,
    /// `MINPOINTS = 30`, `THRESH = 0.02`, `MAXITER = 1000`.
    pub fn new(base: Real, width: Real, length: Real) -> Self {
        Self {
            base,
            width,
            length,
            buff_ridge: 0.9,
            buff_lfrt: [0.1, 0.9],
            min_points: 30,
            thresh: 0.02,
            max_iter: 1000,
            seed: DEFAULT_SEED,
            buff_circ: DEFAULT_BUFF_CIRC,
            min_dihedral_deg: DEFAULT_MIN_DIHEDRAL_DEG,
        }
    }

    /// Ridge height above the eaves, `sqrt(WIDTH² - (BASE/2)²)`.
    pub fn height(&self) -> Real {
        let half = 0.5 * self.base;
        (self.width * self.width - half * half).sqrt()
    }

    /// Radius of the target footprint, `sqrt((BASE/2)² + (LENGTH/2)²)`.
    pub fn radius(&self) -> Real {
        (0.5 * self.base).hypot(0.5 * self.length)
    }

    /// Half-size of the square point window around an approximate center.
    pub fn window_radius(&self) -> Real {
        self.buff_circ * self.radius()
    }

    pub fn panel_dims(&self) -> PanelDims {
        PanelDims {
            base: self.base,
            length: self.length,
            buff_ridge: self.buff_ridge,
            buff_lfrt: self.buff_lfrt,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &str); 11] = [
            (self.base > 0.0, "BASE must be positive"),
            (self.length > 0.0, "LENGTH must be positive"),
            (self.width > 0.5 * self.base, "WIDTH must exceed BASE/2"),
            (self.buff_ridge > 0.0, "BUFF_RIDGE must be positive"),
            (self.buff_lfrt[0] > 0.0, "BUFF_LFRT[0] must be positive"),
            (
                self.buff_lfrt[0] < self.buff_lfrt[1] && self.buff_lfrt[1] <= 1.0,
                "BUFF_LFRT must satisfy BUFF_LFRT[0] < BUFF_LFRT[1] <= 1",
            ),
            (self.min_points >= 3, "MINPOINTS must be at least 3"),
            (self.thresh > 0.0, "THRESH must be positive"),
            (self.max_iter >= 1, "MAXITER must be at least 1"),
            (self.buff_circ > 0.0, "BUFF_CIRC must be positive"),
            (
                self.min_dihedral_deg > 0.0 && self.min_dihedral_deg < 90.0,
                "MIN_DIHEDRAL_DEG must lie in (0, 90)",
            ),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(EstimationError::InvalidConfig((*msg).to_string())),
            None => Ok(()),
        }
    }
}

/// Approximate pose of one target on one flight line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetApproxPose {
    pub name: String,
    pub x: Real,
    pub y: Real,
    /// Ridge azimuth, degrees clockwise from north.
    pub azimuth_deg: Real,
    /// Approximate ellipsoidal height, when the strip preparation provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hae: Option<Real>,
    /// Point-cloud source identifier (the `FLIGHT_LINE` key).
    pub source: String,
}

impl TargetApproxPose {
    pub fn center(&self) -> Pt2 {
        Pt2::new(self.x, self.y)
    }

    pub fn heading(&self) -> Vec2 {
        heading_from_azimuth(self.azimuth_deg.to_radians())
    }
}

/// A loaded run: target constants plus every approximate pose, grouped by
/// flight line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LcpConfig {
    pub version: String,
    pub target: TargetConfig,
    pub flight_lines: BTreeMap<String, Vec<TargetApproxPose>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawConfig {
    base: Real,
    width: Real,
    length: Real,
    buff_ridge: Real,
    buff_lfrt: [Real; 2],
    minpoints: usize,
    thresh: Real,
    maxiter: usize,
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default = "default_buff_circ")]
    buff_circ: Real,
    #[serde(default = "default_min_dihedral")]
    min_dihedral_deg: Real,
    #[serde(default)]
    flight_line: BTreeMap<String, Vec<Vec<Value>>>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_buff_circ() -> Real {
    DEFAULT_BUFF_CIRC
}

fn default_min_dihedral() -> Real {
    DEFAULT_MIN_DIHEDRAL_DEG
}

impl LcpConfig {
    /// Build a run from already-parsed parts; validates `target`.
    pub fn new(
        target: TargetConfig,
        flight_lines: BTreeMap<String, Vec<TargetApproxPose>>,
    ) -> Result<Self> {
        target.validate()?;
        Ok(Self {
            version: SUPPORTED_VERSION.to_string(),
            target,
            flight_lines,
        })
    }

    /// Fail with [`ConfigVersionMismatch`](EstimationError::ConfigVersionMismatch)
    /// unless `version` is [`SUPPORTED_VERSION`]. Covers configurations built
    /// in code or deserialized without going through [`from_yaml`](Self::from_yaml).
    pub fn check_version(&self) -> Result<()> {
        ensure_supported(self.version.trim().to_string()).map(|_| ())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EstimationError::io(path, e))?;
        Self::from_yaml(&text)
    }

    /// Parse and validate a configuration document.
    ///
    /// `VERSION` is checked before anything else, so a document written for
    /// another version fails with
    /// [`ConfigVersionMismatch`](EstimationError::ConfigVersionMismatch) even
    /// if its other keys differ.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(yaml)?;
        let version = check_version(&doc)?;
        let raw: RawConfig = serde_yaml::from_value(doc)?;

        let target = TargetConfig {
            base: raw.base,
            width: raw.width,
            length: raw.length,
            buff_ridge: raw.buff_ridge,
            buff_lfrt: raw.buff_lfrt,
            min_points: raw.minpoints,
            thresh: raw.thresh,
            max_iter: raw.maxiter,
            seed: raw.seed,
            buff_circ: raw.buff_circ,
            min_dihedral_deg: raw.min_dihedral_deg,
        };
        target.validate()?;

        let mut flight_lines = BTreeMap::new();
        for (source, rows) in raw.flight_line {
            let poses = rows
                .iter()
                .enumerate()
                .map(|(i, row)| parse_pose(&source, i, row))
                .collect::<Result<Vec<_>>>()?;
            flight_lines.insert(source, poses);
        }

        let config = Self {
            version,
            target,
            flight_lines,
        };
        log::debug!(
            "configuration: {} targets on {} flight lines, HEIGHT {:.4} RADIUS {:.4}",
            config.targets().count(),
            config.flight_lines.len(),
            config.target.height(),
            config.target.radius()
        );
        Ok(config)
    }

    /// Every approximate pose, by flight line then in listed order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetApproxPose> {
        self.flight_lines.values().flatten()
    }

    /// Poses to process: all of them, or those named `filter` (one per
    /// flight line that lists it). A filter that matches nothing is
    /// [`MissingApproxPose`](EstimationError::MissingApproxPose).
    pub fn select(&self, filter: Option<&str>) -> Result<Vec<&TargetApproxPose>> {
        match filter {
            None => Ok(self.targets().collect()),
            Some(name) => {
                let picked: Vec<_> = self.targets().filter(|p| p.name == name).collect();
                if picked.is_empty() {
                    Err(EstimationError::MissingApproxPose(name.to_string()))
                } else {
                    Ok(picked)
                }
            }
        }
    }
}

fn check_version(doc: &Value) -> Result<String> {
    let found = match doc.get("VERSION") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => format!("{other:?}"),
        None => String::from("<missing>"),
    };
    ensure_supported(found)
}

fn ensure_supported(found: String) -> Result<String> {
    if found == SUPPORTED_VERSION {
        Ok(found)
    } else {
        Err(EstimationError::ConfigVersionMismatch {
            found,
            expected: SUPPORTED_VERSION.to_string(),
        })
    }
}

fn parse_pose(source: &str, index: usize, row: &[Value]) -> Result<TargetApproxPose> {
    let invalid = |what: &str| {
        EstimationError::InvalidConfig(format!("FLIGHT_LINE {source:?} entry {index}: {what}"))
    };

    let name = match row.first() {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(invalid("target name must be a string or a number")),
    };
    let num = |i: usize, field: &str| -> Result<Real> {
        row.get(i)
            .and_then(Value::as_f64)
            .ok_or_else(|| invalid(&format!("{field} of {name:?} must be a number")))
    };

    let (hae, azimuth_deg) = match row.len() {
        4 => (None, num(3, "AZ")?),
        n if n >= 5 => {
            if n > 5 {
                log::debug!("{name}: ignoring {} extra fields on {source}", n - 5);
            }
            (Some(num(3, "HAE")?), num(4, "AZ")?)
        }
        n => return Err(invalid(&format!("expected 4 or 5 fields, got {n}"))),
    };

    Ok(TargetApproxPose {
        x: num(1, "X")?,
        y: num(2, "Y")?,
        azimuth_deg,
        hae,
        source: source.to_string(),
        name,
    })
}
