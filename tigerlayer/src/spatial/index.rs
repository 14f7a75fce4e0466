//! Lazily loaded, process-wide boundary index.
//!
//! # Thread Safety
//!
//! The boundary map lives in a `tokio::sync::OnceCell`: the first caller
//! performs the load while concurrent callers wait on the same
//! initialization, and every later call reads the populated value. A failed
//! load leaves the cell empty so the next query retries.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, instrument};

use super::Viewport;
use crate::boundary::{parse_boundaries, BoundaryError, BoundaryMap};

/// In-memory bounding-box index over one boundary description file.
#[derive(Debug)]
pub struct SpatialIndex {
    source: PathBuf,
    boundaries: OnceCell<Arc<BoundaryMap>>,
    loads: AtomicUsize,
}

impl SpatialIndex {
    /// Create an index that will load `source` on first use.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            boundaries: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Create an index over an already-built map (no file is ever read).
    pub fn preloaded(map: BoundaryMap) -> Self {
        Self {
            source: PathBuf::new(),
            boundaries: OnceCell::new_with(Some(Arc::new(map))),
            loads: AtomicUsize::new(0),
        }
    }

    /// Path of the boundary description.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Load the boundary map, reading the source only on the first success.
    pub async fn load(&self) -> Result<Arc<BoundaryMap>, BoundaryError> {
        self.boundaries
            .get_or_try_init(|| async {
                self.loads.fetch_add(1, Ordering::Relaxed);

                let label = self.source.display().to_string();
                let data = tokio::fs::read(&self.source)
                    .await
                    .map_err(|source| BoundaryError::Io {
                        path: label.clone(),
                        source,
                    })?;
                let map = parse_boundaries(&data, &label)?;

                info!(source = %label, tiles = map.len(), "Loaded tile boundaries");
                Ok::<_, BoundaryError>(Arc::new(map))
            })
            .await
            .cloned()
    }

    /// Bucket codes whose bounds intersect the viewport.
    #[instrument(skip(self), level = "debug")]
    pub async fn query(&self, viewport: &Viewport) -> Result<BTreeSet<String>, BoundaryError> {
        let map = self.load().await?;
        Ok(map.intersecting(viewport).map(str::to_string).collect())
    }

    /// Number of times the source file has been read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Whether the map has been populated.
    pub fn is_loaded(&self) -> bool {
        self.boundaries.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryCollection, BoundaryFeature, TileBoundary};
    use crate::spatial::Bounds;
    use tempfile::TempDir;

    fn write_boundaries(dir: &Path, tiles: &[(&str, [f64; 4])]) -> PathBuf {
        let features = tiles
            .iter()
            .map(|(code, b)| {
                BoundaryFeature::from_boundary(&TileBoundary {
                    code: code.to_string(),
                    bounds: Bounds::from_array(*b),
                })
            })
            .collect();
        let path = dir.join("tile_boundaries.geojson");
        std::fs::write(
            &path,
            serde_json::to_vec(&BoundaryCollection::new(features)).unwrap(),
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_query_includes_overlapping_and_excludes_disjoint() {
        let dir = TempDir::new().unwrap();
        let path = write_boundaries(
            dir.path(),
            &[("s0000", [5.0, 5.0, 15.0, 15.0]), ("s1111", [20.0, 20.0, 30.0, 30.0])],
        );
        let index = SpatialIndex::new(path);

        let codes = index
            .query(&Bounds::new(-10.0, -10.0, 10.0, 10.0))
            .await
            .unwrap();

        assert!(codes.contains("s0000"));
        assert!(!codes.contains("s1111"));
    }

    #[tokio::test]
    async fn test_source_is_read_once() {
        let dir = TempDir::new().unwrap();
        let path = write_boundaries(dir.path(), &[("s0000", [0.0, 0.0, 1.0, 1.0])]);
        let index = SpatialIndex::new(&path);

        index.load().await.unwrap();
        // Changes on disk are not observed after the first load
        std::fs::remove_file(&path).unwrap();
        let map = index.load().await.unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(index.load_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_share_one_read() {
        let dir = TempDir::new().unwrap();
        let path = write_boundaries(dir.path(), &[("s0000", [0.0, 0.0, 1.0, 1.0])]);
        let index = Arc::new(SpatialIndex::new(path));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move { index.load().await.map(|m| m.len()) }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }

        assert_eq!(index.load_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tile_boundaries.geojson");
        let index = SpatialIndex::new(&path);

        assert!(index.load().await.is_err());
        assert!(!index.is_loaded());

        write_boundaries(dir.path(), &[("s0000", [0.0, 0.0, 1.0, 1.0])]);
        assert_eq!(index.load().await.unwrap().len(), 1);
        assert_eq!(index.load_count(), 2);
    }

    #[tokio::test]
    async fn test_preloaded_never_reads() {
        let map: BoundaryMap = vec![TileBoundary {
            code: "s0000".to_string(),
            bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
        }]
        .into_iter()
        .collect();
        let index = SpatialIndex::preloaded(map);

        let codes = index.query(&Bounds::new(0.5, 0.5, 2.0, 2.0)).await.unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(index.load_count(), 0);
    }
}
