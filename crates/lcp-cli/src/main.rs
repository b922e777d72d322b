use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lcp_pipeline::report::{summary_lines, write_geojson_file, write_table_file};
use lcp_pipeline::{run_batch, BatchOptions, BatchReport, FileCatalog, LcpConfig, WindowCache};

/// Estimate lidar control plane centers from airborne lidar strips.
#[derive(Debug, Parser)]
#[command(author, version, about = "Gable-roof lidar control plane estimation")]
struct Args {
    /// YAML run configuration.
    config: PathBuf,

    /// Only process the target with this name.
    #[arg(short = 'l', long = "lcp", value_name = "NAME")]
    target: Option<String>,

    /// Cache target windows on disk and reuse them on later runs.
    #[arg(short, long)]
    cache: bool,

    /// Cache directory (implies --cache). Defaults to `.lcp_cache` next to
    /// the configuration.
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Write the `name,x,y,z,source` table to this file.
    #[arg(short, long, value_name = "CSV")]
    output: Option<PathBuf>,

    /// Write the estimates as a GeoJSON feature collection.
    #[arg(long, value_name = "FILE")]
    geojson: Option<PathBuf>,

    /// Process targets in parallel.
    #[arg(long)]
    parallel: bool,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes
    /// precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn cache_dir(&self, config_dir: &Path) -> Option<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Some(dir.clone()),
            None if self.cache => Some(config_dir.join(".lcp_cache")),
            None => None,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Load the configuration, run every selected target and write the requested
/// outputs. Point files are resolved relative to the configuration first.
fn run_from_args(args: &Args) -> Result<BatchReport> {
    let config = LcpConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let config_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let nominal_length = config.target.length;

    let options = BatchOptions {
        target_filter: args.target.clone(),
        parallel: args.parallel,
        cache: args.cache_dir(&config_dir).map(WindowCache::new),
    };
    if let Some(cache) = &options.cache {
        log::info!("window cache at {}", cache.dir().display());
    }

    let report = run_batch(config, FileCatalog::with_base_dir(&config_dir), &options)?;

    if let Some(path) = &args.output {
        write_table_file(path, &report)
            .with_context(|| format!("writing table {}", path.display()))?;
        log::info!("table written to {}", path.display());
    }
    if let Some(path) = &args.geojson {
        write_geojson_file(path, &report)
            .with_context(|| format!("writing GeoJSON {}", path.display()))?;
        log::info!("GeoJSON written to {}", path.display());
    }

    for estimate in &report.estimates {
        for line in summary_lines(estimate, nominal_length) {
            println!("{line}");
        }
    }
    for failure in &report.failures {
        println!(
            "{} on {}: not estimated ({}: {})",
            failure.name, failure.source, failure.kind, failure.message
        );
    }
    Ok(report)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run_from_args(&args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lcp_core::synthetic::gable::GableRoof;
    use lcp_core::Pt3;
    use std::fmt::Write as _;
    use std::fs;

    const CONFIG: &str = r#"
VERSION: "0.3"
BASE: 1.10
WIDTH: 0.65
LENGTH: 1.22
BUFF_RIDGE: 0.9
BUFF_LFRT: [0.1, 0.9]
MINPOINTS: 30
THRESH: 0.02
MAXITER: 300
FLIGHT_LINE:
  line_01.xyz:
    - [LCP-07, 500.0, 800.0, 15.0]
"#;

    fn write_scene(dir: &Path) -> PathBuf {
        let roof = GableRoof::from_width(1.10, 0.65, 1.22, Pt3::new(500.0, 800.0, 3.0), 15.0);
        let mut text = String::new();
        for p in roof.sample_grid(16, 40) {
            writeln!(text, "{:.5},{:.5},{:.5}", p.x, p.y, p.z).unwrap();
        }
        fs::write(dir.join("line_01.xyz"), text).unwrap();
        let config = dir.join("lcp.yaml");
        fs::write(&config, CONFIG).unwrap();
        config
    }

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("lcp-estimate").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn cache_dir_defaults_next_to_config() {
        let args = parse(&["cfg/lcp.yaml", "-c", "-l", "LCP-07"]);
        assert_eq!(args.target.as_deref(), Some("LCP-07"));
        assert_eq!(
            args.cache_dir(Path::new("cfg")),
            Some(PathBuf::from("cfg/.lcp_cache"))
        );
        assert_eq!(parse(&["lcp.yaml"]).cache_dir(Path::new("")), None);
        let explicit = parse(&["lcp.yaml", "--cache-dir", "/tmp/w"]);
        assert_eq!(explicit.cache_dir(Path::new("")), Some(PathBuf::from("/tmp/w")));
    }

    #[test]
    fn helper_smoke_test() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_scene(dir.path());
        let csv = dir.path().join("lcp.csv");
        let geojson = dir.path().join("lcp.geojson");

        let args = parse(&[
            config.to_str().unwrap(),
            "-c",
            "-o",
            csv.to_str().unwrap(),
            "--geojson",
            geojson.to_str().unwrap(),
        ]);
        let report = run_from_args(&args).expect("cli helper should succeed");

        assert_eq!(report.estimates.len(), 1, "{:?}", report.failures);
        let center = report.estimates[0].center;
        assert!((center.x - 500.0).abs() < 1e-3 && (center.y - 800.0).abs() < 1e-3);

        let table = fs::read_to_string(&csv).unwrap();
        assert!(table.lines().nth(1).unwrap().starts_with("LCP-07,500.000,800.000,"));
        assert!(geojson.is_file());
        assert!(dir.path().join(".lcp_cache").is_dir());
    }

    #[test]
    fn unknown_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_scene(dir.path());
        let args = parse(&[config.to_str().unwrap(), "--lcp", "LCP-99"]);
        let err = run_from_args(&args).unwrap_err();
        assert!(format!("{err:#}").contains("LCP-99"), "{err:#}");
    }
}
