//! Geometry engine boundary.
//!
//! The pipeline hands an extracted source directory to a [`GeometryEngine`]
//! and receives a simplified, encoded artifact plus its extent. Engines are
//! synchronous and run on the blocking pool.

mod geojson;
mod shapefile;
mod shp;

pub use self::shapefile::ShapefileEngine;

use std::path::PathBuf;

use thiserror::Error;

use crate::layer::GeometryKind;
use crate::spatial::Bounds;

/// Input of one transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    /// Directory holding the extracted source files.
    pub source_dir: PathBuf,
    /// Source filename without its archive extension.
    pub base_name: String,
    pub layer: String,
    pub geometry: Option<GeometryKind>,
    /// Simplification tolerance in coordinate units.
    pub tolerance: f64,
}

/// Encoded artifact and the extent of everything it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedArtifact {
    pub bytes: Vec<u8>,
    pub bounds: Bounds,
    pub feature_count: usize,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("No {extension} input found in {dir}")]
    MissingInput { dir: PathBuf, extension: String },

    #[error("Failed to read source geometry: {0}")]
    Read(String),

    #[error("Source contains no geometry")]
    Empty,

    #[error("Failed to encode artifact: {0}")]
    Encode(String),
}

/// Converts extracted source files into an artifact.
pub trait GeometryEngine: Send + Sync {
    /// Artifact file extension, without the dot.
    fn extension(&self) -> &str;

    fn transform(&self, request: &TransformRequest) -> Result<TransformedArtifact, TransformError>;
}
