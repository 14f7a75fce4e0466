//! Viewport queries and artifact reads over one layer directory.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use super::error::ServiceError;
use super::io_limiter::IoLimiter;
use super::query_cache::{QueryCache, ViewportKey};
use super::rate_limiter::RateLimiter;
use crate::artifact::ArtifactName;
use crate::config::ConfigFile;
use crate::spatial::{SpatialIndex, Viewport};

/// Query surface shared by every request handler.
///
/// The index, cache, limiter and I/O gate are owned by whoever builds the
/// service; handlers only see them through this type.
#[derive(Debug, Clone)]
pub struct TileService {
    layer_dir: PathBuf,
    index: Arc<SpatialIndex>,
    cache: Arc<QueryCache>,
    limiter: Arc<RateLimiter>,
    io: Arc<IoLimiter>,
}

impl TileService {
    pub fn new(
        layer_dir: impl Into<PathBuf>,
        index: Arc<SpatialIndex>,
        cache: Arc<QueryCache>,
        limiter: Arc<RateLimiter>,
        io: Arc<IoLimiter>,
    ) -> Self {
        Self {
            layer_dir: layer_dir.into(),
            index,
            cache,
            limiter,
            io,
        }
    }

    /// Build the service for the configured layer.
    pub fn from_config(config: &ConfigFile) -> Self {
        let settings = &config.tile_server;
        let layer_dir = config.processing.layer_dir(&settings.layer);

        Self::new(
            layer_dir.clone(),
            Arc::new(SpatialIndex::new(layer_dir.join(&settings.boundary_file))),
            Arc::new(QueryCache::new(
                settings.cache_ttl(),
                settings.cache_max_entries,
            )),
            Arc::new(RateLimiter::new(settings.requests_per_second)),
            Arc::new(IoLimiter::new(settings.max_file_operations, "artifact_io")),
        )
    }

    pub fn layer_dir(&self) -> &Path {
        &self.layer_dir
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn io_limiter(&self) -> &IoLimiter {
        &self.io
    }

    /// Artifact filenames whose bucket intersects the viewport, sorted.
    ///
    /// The rate limit is applied before anything else, then the cache; only a
    /// cache miss touches the index and the layer directory.
    #[instrument(skip(self), level = "debug")]
    pub async fn find_tiles(
        &self,
        client: IpAddr,
        viewport: Viewport,
    ) -> Result<Arc<Vec<String>>, ServiceError> {
        self.limiter
            .check(client)
            .map_err(|t| ServiceError::RateLimited {
                client,
                retry_after: t.retry_after,
            })?;

        validate(&viewport)?;

        let key = ViewportKey::new(&viewport);
        if let Some(tiles) = self.cache.get(&key) {
            debug!(tiles = tiles.len(), "Query cache hit");
            return Ok(tiles);
        }

        let codes = self.index.query(&viewport).await?;
        let tiles = if codes.is_empty() {
            Vec::new()
        } else {
            self.scan(&codes).await?
        };

        debug!(codes = codes.len(), tiles = tiles.len(), "Query computed");
        Ok(self.cache.put(key, tiles))
    }

    /// Lists artifacts in the layer directory whose code is in `codes`.
    async fn scan(&self, codes: &BTreeSet<String>) -> Result<Vec<String>, ServiceError> {
        let _permit = self.io.acquire().await.map_err(|_| ServiceError::Unavailable)?;

        let label = self.layer_dir.display().to_string();
        let io_err = |source: std::io::Error| ServiceError::Io {
            path: label.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.layer_dir).await.map_err(io_err)?;
        let mut tiles = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name().to_string_lossy().to_string();
            let matches = ArtifactName::parse(&name)
                .map(|artifact| codes.contains(artifact.code))
                .unwrap_or(false);
            if matches {
                tiles.push(name);
            }
        }

        tiles.sort();
        Ok(tiles)
    }

    /// Read one file from the layer directory.
    ///
    /// Names containing a path separator or parent reference, and names of
    /// directories, are reported as not found.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_artifact(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        if !is_plain_filename(filename) {
            return Err(ServiceError::NotFound(filename.to_string()));
        }

        let _permit = self.io.acquire().await.map_err(|_| ServiceError::Unavailable)?;
        let path = self.layer_dir.join(filename);
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ServiceError::io(filename, e))?;
        if !metadata.is_file() {
            return Err(ServiceError::NotFound(filename.to_string()));
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| ServiceError::io(filename, e))
    }
}

fn validate(viewport: &Viewport) -> Result<(), ServiceError> {
    if viewport.is_valid() {
        return Ok(());
    }
    Err(ServiceError::InvalidViewport(format!(
        "expected finite west <= east and south <= north, got {:?}",
        viewport.to_array()
    )))
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
