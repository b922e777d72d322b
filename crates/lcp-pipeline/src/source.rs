//! Point-cloud sources.
//!
//! A [`PointSource`] answers window queries; a [`SourceCatalog`] resolves the
//! `FLIGHT_LINE` identifiers of a configuration to sources.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use lcp_core::{Bounds2, PointCloud, PointRecord, Real};

use crate::error::{EstimationError, Result};

/// Something that can return the points falling in a horizontal window.
pub trait PointSource: Send + Sync {
    /// Human-readable identifier for logs and errors.
    fn describe(&self) -> String;

    /// Points strictly inside `bounds`, in source order.
    fn read_window(&self, bounds: &Bounds2) -> Result<PointCloud>;
}

/// LAS file read with the `las` crate. Scale and offset are applied by the
/// reader; intensity is kept.
#[derive(Debug, Clone)]
pub struct LasFileSource {
    path: PathBuf,
}

impl LasFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PointSource for LasFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_window(&self, bounds: &Bounds2) -> Result<PointCloud> {
        let mut reader = las::Reader::from_path(&self.path)
            .map_err(|e| EstimationError::point_source(self.describe(), e))?;
        let total = reader.header().number_of_points();

        let mut cloud = PointCloud::new();
        for rec in reader.points() {
            let p = rec.map_err(|e| EstimationError::point_source(self.describe(), e))?;
            if bounds.contains(p.x, p.y) {
                cloud.push(PointRecord::new(p.x, p.y, p.z).with_intensity(p.intensity));
            }
        }
        log::debug!(
            "{}: kept {} of {} points",
            self.describe(),
            cloud.len(),
            total
        );
        Ok(cloud)
    }
}

/// Delimited ASCII points, one `x y z [intensity]` record per line.
///
/// Fields may be separated by whitespace or commas. Blank lines and lines
/// starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct XyzFileSource {
    path: PathBuf,
}

impl XyzFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PointSource for XyzFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_window(&self, bounds: &Bounds2) -> Result<PointCloud> {
        let file = File::open(&self.path).map_err(|e| EstimationError::io(&self.path, e))?;
        let mut cloud = PointCloud::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| EstimationError::io(&self.path, e))?;
            let parsed = parse_xyz_line(&line).map_err(|msg| {
                let msg = format!("line {}: {msg}", lineno + 1);
                EstimationError::point_source(self.describe(), msg)
            })?;
            let Some(p) = parsed else {
                continue;
            };
            if bounds.contains(p.x, p.y) {
                cloud.push(p);
            }
        }
        Ok(cloud)
    }
}

fn parse_xyz_line(line: &str) -> std::result::Result<Option<PointRecord>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() < 3 {
        return Err(format!("expected at least 3 fields, got {}", fields.len()));
    }
    let coord = |i: usize| -> std::result::Result<Real, String> {
        fields[i]
            .parse::<Real>()
            .map_err(|e| format!("field {}: {e}", i + 1))
    };
    let mut p = PointRecord::new(coord(0)?, coord(1)?, coord(2)?);
    if let Some(raw) = fields.get(3) {
        let intensity = raw
            .parse::<u16>()
            .map_err(|e| format!("intensity {raw:?}: {e}"))?;
        p = p.with_intensity(intensity);
    }
    Ok(Some(p))
}

/// A point cloud held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    label: String,
    cloud: PointCloud,
}

impl InMemorySource {
    pub fn new(label: impl Into<String>, cloud: PointCloud) -> Self {
        Self {
            label: label.into(),
            cloud,
        }
    }
}

impl PointSource for InMemorySource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn read_window(&self, bounds: &Bounds2) -> Result<PointCloud> {
        Ok(self.cloud.window(bounds))
    }
}

/// Resolves a flight-line identifier to a point source.
pub trait SourceCatalog: Send + Sync {
    fn open(&self, id: &str) -> Result<Arc<dyn PointSource>>;
}

/// Opens flight lines as files, choosing the reader by extension: `.las` and
/// `.laz` are read as LAS, anything else as ASCII XYZ.
///
/// Relative identifiers are looked up under the base directory first and
/// fall back to the path as written.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    base_dir: Option<PathBuf>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    pub fn resolve(&self, id: &str) -> PathBuf {
        let path = PathBuf::from(id);
        match &self.base_dir {
            Some(base) if path.is_relative() => {
                let joined = base.join(&path);
                if joined.exists() {
                    joined
                } else {
                    path
                }
            }
            _ => path,
        }
    }
}

impl SourceCatalog for FileCatalog {
    fn open(&self, id: &str) -> Result<Arc<dyn PointSource>> {
        let path = self.resolve(id);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let source: Arc<dyn PointSource> = match ext.as_deref() {
            Some("las") | Some("laz") => Arc::new(LasFileSource::new(path)),
            _ => Arc::new(XyzFileSource::new(path)),
        };
        Ok(source)
    }
}

/// In-memory clouds keyed by flight-line identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    sources: BTreeMap<String, Arc<InMemorySource>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, cloud: PointCloud) {
        let id = id.into();
        self.sources
            .insert(id.clone(), Arc::new(InMemorySource::new(id, cloud)));
    }

    pub fn with(mut self, id: impl Into<String>, cloud: PointCloud) -> Self {
        self.insert(id, cloud);
        self
    }
}

impl SourceCatalog for MemoryCatalog {
    fn open(&self, id: &str) -> Result<Arc<dyn PointSource>> {
        match self.sources.get(id) {
            Some(src) => {
                let src: Arc<dyn PointSource> = src.clone();
                Ok(src)
            }
            None => Err(EstimationError::point_source(id, "unknown flight line")),
        }
    }
}
