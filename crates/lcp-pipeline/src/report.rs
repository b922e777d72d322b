//! Result export: delimited table and GeoJSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use lcp_core::Real;
use serde_json::{json, Value};

use crate::error::{EstimationError, Result};
use crate::estimate::TargetEstimate;
use crate::orchestrator::BatchReport;

pub const TABLE_HEADER: &str = "name,x,y,z,source";

/// Write one `name,x,y,z,source` row per estimate, coordinates in meters
/// with three decimals.
pub fn write_table<W: Write>(report: &BatchReport, mut w: W) -> std::io::Result<()> {
    writeln!(w, "{TABLE_HEADER}")?;
    for e in &report.estimates {
        writeln!(
            w,
            "{},{:.3},{:.3},{:.3},{}",
            quote(e.name()),
            e.center.x,
            e.center.y,
            e.center.z,
            quote(e.source())
        )?;
    }
    w.flush()
}

pub fn write_table_file(path: &Path, report: &BatchReport) -> Result<()> {
    let file = File::create(path).map_err(|e| EstimationError::io(path, e))?;
    write_table(report, BufWriter::new(file)).map_err(|e| EstimationError::io(path, e))
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// GeoJSON `FeatureCollection` of 3-D points, one feature per estimate.
pub fn to_geojson(report: &BatchReport) -> Value {
    let features: Vec<Value> = report.estimates.iter().map(feature).collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn feature(e: &TargetEstimate) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [e.center.x, e.center.y, e.center.z],
        },
        "properties": {
            "name": e.name(),
            "source": e.source(),
            "length": e.length(),
            "azimuth": e.azimuth_deg(),
            "slope": e.slope(),
        },
    })
}

pub fn write_geojson_file(path: &Path, report: &BatchReport) -> Result<()> {
    let file = File::create(path).map_err(|e| EstimationError::io(path, e))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, &to_geojson(report))
        .map_err(|e| EstimationError::io(path, e.into()))?;
    w.flush().map_err(|e| EstimationError::io(path, e))
}

/// Human-readable lines for one estimate: the three ridge segments, the
/// input pose and the estimated center.
pub fn summary_lines(e: &TargetEstimate, nominal_length: Real) -> Vec<String> {
    let mut lines: Vec<String> = [
        ("L", &e.ridge.left),
        ("R", &e.ridge.right),
        ("LR", &e.ridge.combined),
    ]
    .iter()
    .map(|(label, seg)| {
        format!(
            "{} : {label:2} ridge length = {:.3} m, az = {:.1} deg, slope = {:+.2} m",
            e.name(),
            seg.length(),
            seg.azimuth_deg(),
            seg.slope()
        )
    })
    .collect();
    lines.push(format!(
        "Input {} L={nominal_length} : {:.3}, {:.3} m AZ: {:.1} deg",
        e.name(),
        e.pose.x,
        e.pose.y,
        e.pose.azimuth_deg
    ));
    lines.push(format!(
        "Estimate {} : {:.3}, {:.3}, {:.3} m",
        e.name(),
        e.center.x,
        e.center.y,
        e.center.z
    ));
    if let Some(dz) = e.dz_hae {
        lines.push(format!("{} : estimate - HAE = {dz:+.3} m", e.name()));
    }
    lines
}
