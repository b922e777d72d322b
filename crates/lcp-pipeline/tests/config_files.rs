//! Runs driven by YAML configurations and point files on disk.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use lcp_core::synthetic::gable::GableRoof;
use lcp_core::Pt3;
use lcp_pipeline::report::{write_geojson_file, write_table_file, TABLE_HEADER};
use lcp_pipeline::{run_batch, BatchOptions, EstimationError, FileCatalog, LcpConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const CONFIG: &str = r#"
VERSION: "0.3"
BASE: 1.10
WIDTH: 0.65
LENGTH: 1.22
BUFF_RIDGE: 0.92
BUFF_LFRT: [0.1, 0.9]
MINPOINTS: 30
THRESH: 0.02
MAXITER: 500
FLIGHT_LINE:
  strip_a.xyz:
    - [LCP-01, 1000.0, 2000.0, 49.5, 30.0]
  strip_b.xyz:
    - [LCP-01, 1000.0, 2000.0, 30.0]
"#;

fn write_xyz(path: &Path, roof: &GableRoof) {
    let mut text = String::from("# x y z intensity\n");
    for p in roof.sample_grid(20, 50) {
        writeln!(text, "{:.6} {:.6} {:.6} 100", p.x, p.y, p.z).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn scene(dir: &Path) -> LcpConfig {
    let roof = GableRoof::from_width(1.10, 0.65, 1.22, Pt3::new(1000.0, 2000.0, 50.0), 30.0);
    write_xyz(&dir.join("strip_a.xyz"), &roof);
    write_xyz(&dir.join("strip_b.xyz"), &roof);
    let cfg_path = dir.join("lcp.yaml");
    fs::write(&cfg_path, CONFIG).unwrap();
    LcpConfig::load(&cfg_path).unwrap()
}

#[test]
fn same_target_on_two_flight_lines() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = scene(dir.path());
    assert_eq!(config.targets().count(), 2);

    let report = run_batch(
        config,
        FileCatalog::with_base_dir(dir.path()),
        &BatchOptions::default(),
    )
    .unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let sources: Vec<&str> = report.estimates.iter().map(|e| e.source()).collect();
    assert_eq!(sources, ["strip_a.xyz", "strip_b.xyz"]);

    let [a, b] = [&report.estimates[0], &report.estimates[1]];
    assert!((a.center - b.center).norm() < 1e-9);
    assert!((a.dz_hae.unwrap() - (a.center.z - 49.5)).abs() < 1e-12);
    assert!(b.dz_hae.is_none());
    let height = (0.65f64.powi(2) - 0.55f64.powi(2)).sqrt();
    assert!((a.center.z - (50.0 + height)).abs() < 1e-3);
}

#[test]
fn results_are_exported_as_table_and_geojson() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = scene(dir.path());
    let report = run_batch(
        config,
        FileCatalog::with_base_dir(dir.path()),
        &BatchOptions {
            target_filter: Some("LCP-01".into()),
            ..BatchOptions::default()
        },
    )
    .unwrap();

    let csv = dir.path().join("out.csv");
    write_table_file(&csv, &report).unwrap();
    let text = fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], TABLE_HEADER);
    assert!(lines[1].starts_with("LCP-01,1000.000,2000.000,"), "{}", lines[1]);
    assert!(lines[1].ends_with(",strip_a.xyz"));

    let gj_path = dir.path().join("out.geojson");
    write_geojson_file(&gj_path, &report).unwrap();
    let gj: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&gj_path).unwrap()).unwrap();
    let features = gj["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[1]["properties"]["source"], "strip_b.xyz");
    let coords = features[0]["geometry"]["coordinates"].as_array().unwrap();
    assert_eq!(coords.len(), 3);
    assert!((coords[0].as_f64().unwrap() - 1000.0).abs() < 1e-3);
}

#[test]
fn unsupported_version_stops_before_any_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.yaml");
    fs::write(&path, CONFIG.replace("VERSION: \"0.3\"", "VERSION: \"0.2\"")).unwrap();

    let err = LcpConfig::load(&path).unwrap_err();
    match &err {
        EstimationError::ConfigVersionMismatch { found, expected } => {
            assert_eq!(found, "0.2");
            assert_eq!(expected, "0.3");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.is_fatal());
}

#[test]
fn missing_point_file_fails_only_that_line() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = scene(dir.path());
    fs::remove_file(dir.path().join("strip_b.xyz")).unwrap();

    let report = run_batch(
        config,
        FileCatalog::with_base_dir(dir.path()),
        &BatchOptions::default(),
    )
    .unwrap();
    assert_eq!(report.estimates.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "strip_b.xyz");
    assert_eq!(report.failures[0].kind, "Io");
}
