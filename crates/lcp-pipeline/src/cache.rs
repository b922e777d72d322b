//! Optional on-disk cache of target windows, for repeated debugging runs
//! against large flight lines.

use std::fs;
use std::path::{Path, PathBuf};

use lcp_core::{Bounds2, PointCloud};
use serde::{Deserialize, Serialize};

use crate::error::{EstimationError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct CachedWindow {
    flight_line: String,
    target: String,
    bounds: Bounds2,
    cloud: PointCloud,
}

/// Directory of JSON window files keyed by flight line and target name.
///
/// An entry is only reused when it was written for the same flight line,
/// target and query box.
#[derive(Debug, Clone)]
pub struct WindowCache {
    dir: PathBuf,
}

impl WindowCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, flight_line: &str, target: &str) -> PathBuf {
        self.dir
            .join(format!("{}@{}.json", sanitize(target), sanitize(flight_line)))
    }

    pub fn load(
        &self,
        flight_line: &str,
        target: &str,
        bounds: &Bounds2,
    ) -> Result<Option<PointCloud>> {
        let path = self.entry_path(flight_line, target);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| EstimationError::io(&path, e))?;
        let entry: CachedWindow = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("ignoring unreadable cache entry {}: {err}", path.display());
                return Ok(None);
            }
        };
        if entry.flight_line != flight_line || entry.target != target || entry.bounds != *bounds {
            log::debug!("stale cache entry {}", path.display());
            return Ok(None);
        }
        Ok(Some(entry.cloud))
    }

    pub fn store(
        &self,
        flight_line: &str,
        target: &str,
        bounds: &Bounds2,
        cloud: &PointCloud,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| EstimationError::io(&self.dir, e))?;
        let path = self.entry_path(flight_line, target);
        let entry = CachedWindow {
            flight_line: flight_line.to_string(),
            target: target.to_string(),
            bounds: *bounds,
            cloud: cloud.clone(),
        };
        let text = serde_json::to_string(&entry)
            .map_err(|e| EstimationError::point_source(flight_line, e))?;
        fs::write(&path, text).map_err(|e| EstimationError::io(&path, e))
    }

    /// Cached window if present, otherwise the result of `read`, which is
    /// stored for the next run. A failed store is logged and the freshly read
    /// window is still returned.
    pub fn fetch_or_read<F>(
        &self,
        flight_line: &str,
        target: &str,
        bounds: &Bounds2,
        read: F,
    ) -> Result<PointCloud>
    where
        F: FnOnce() -> Result<PointCloud>,
    {
        if let Some(cloud) = self.load(flight_line, target, bounds)? {
            log::info!("{target}: {} points from cache", cloud.len());
            return Ok(cloud);
        }
        let cloud = read()?;
        match self.store(flight_line, target, bounds, &cloud) {
            Ok(()) => log::debug!(
                "{target}: cached {} points at {}",
                cloud.len(),
                self.entry_path(flight_line, target).display()
            ),
            Err(err) => log::warn!("{target}: window not cached: {err}"),
        }
        Ok(cloud)
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcp_core::{PointRecord, Pt2};

    fn cloud() -> PointCloud {
        PointCloud::from_points(vec![
            PointRecord::new(1.0, 2.0, 3.0).with_intensity(9),
            PointRecord::new(1.5, 2.5, 3.5),
        ])
    }

    #[test]
    fn second_fetch_is_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WindowCache::new(dir.path().join("cache"));
        let bounds = Bounds2::around(Pt2::new(1.0, 2.0), 5.0);
        let first = cache
            .fetch_or_read("strips/line 1.las", "LCP-1", &bounds, || Ok(cloud()))
            .unwrap();
        assert!(cache.entry_path("strips/line 1.las", "LCP-1").is_file());

        let second = cache
            .fetch_or_read("strips/line 1.las", "LCP-1", &bounds, || {
                Err(EstimationError::point_source("line", "source must not be read"))
            })
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn entry_for_another_window_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WindowCache::new(dir.path());
        let bounds = Bounds2::around(Pt2::new(1.0, 2.0), 5.0);
        cache.store("line", "LCP-1", &bounds, &cloud()).unwrap();

        let moved = Bounds2::around(Pt2::new(1.0, 2.5), 5.0);
        assert!(cache.load("line", "LCP-1", &moved).unwrap().is_none());
        assert!(cache.load("line", "LCP-2", &bounds).unwrap().is_none());
        assert_eq!(cache.load("line", "LCP-1", &bounds).unwrap(), Some(cloud()));
    }

    #[test]
    fn corrupt_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WindowCache::new(dir.path());
        fs::write(cache.entry_path("line", "LCP-1"), "{not json").unwrap();
        let bounds = Bounds2::around(Pt2::new(1.0, 2.0), 5.0);
        assert!(cache.load("line", "LCP-1", &bounds).unwrap().is_none());
    }

    #[test]
    fn unwritable_cache_still_returns_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("cache");
        fs::write(&blocker, "a file where the cache directory should be").unwrap();
        let cache = WindowCache::new(&blocker);
        let bounds = Bounds2::around(Pt2::new(1.0, 2.0), 5.0);

        assert!(cache.store("line", "LCP-1", &bounds, &cloud()).is_err());
        let fetched = cache
            .fetch_or_read("line", "LCP-1", &bounds, || Ok(cloud()))
            .unwrap();
        assert_eq!(fetched, cloud());
        assert!(blocker.is_file());
    }
}
