//! Shapefile → simplified GeoJSON engine.

use std::fs;
use std::path::{Path, PathBuf};

use geo::{BoundingRect, Simplify};
use geo_types::Geometry;
use tracing::debug;

use super::{geojson, shp, GeometryEngine, TransformError, TransformRequest, TransformedArtifact};
use crate::spatial::Bounds;

const SHP_EXTENSION: &str = "shp";

/// Reads `<base>.shp`, simplifies lines and polygons, writes GeoJSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileEngine;

impl ShapefileEngine {
    pub fn new() -> Self {
        Self
    }

    /// `<base>.shp` at the top of the workspace, else the first `.shp` found.
    fn locate(&self, request: &TransformRequest) -> Result<PathBuf, TransformError> {
        let direct = request
            .source_dir
            .join(format!("{}.{}", request.base_name, SHP_EXTENSION));
        if direct.is_file() {
            return Ok(direct);
        }
        find_shp(&request.source_dir).ok_or_else(|| TransformError::MissingInput {
            dir: request.source_dir.clone(),
            extension: SHP_EXTENSION.to_string(),
        })
    }
}

fn find_shp(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in &entries {
        let is_shp = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SHP_EXTENSION));
        if path.is_file() && is_shp {
            return Some(path.clone());
        }
    }
    entries
        .iter()
        .filter(|p| p.is_dir())
        .find_map(|p| find_shp(p))
}

/// Douglas-Peucker on line and polygon geometries; points pass through.
fn simplify(geometry: Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    if tolerance <= 0.0 {
        return geometry;
    }
    match geometry {
        Geometry::LineString(g) => Geometry::LineString(g.simplify(&tolerance)),
        Geometry::MultiLineString(g) => Geometry::MultiLineString(g.simplify(&tolerance)),
        Geometry::Polygon(g) => Geometry::Polygon(g.simplify(&tolerance)),
        Geometry::MultiPolygon(g) => Geometry::MultiPolygon(g.simplify(&tolerance)),
        other => other,
    }
}

impl GeometryEngine for ShapefileEngine {
    fn extension(&self) -> &str {
        "geojson"
    }

    fn transform(&self, request: &TransformRequest) -> Result<TransformedArtifact, TransformError> {
        let path = self.locate(request)?;
        let data = fs::read(&path).map_err(|e| TransformError::Read(format!("{}: {}", path.display(), e)))?;
        let geometries: Vec<Geometry<f64>> = shp::read_geometries(&data)
            .map_err(TransformError::Read)?
            .into_iter()
            .map(|g| simplify(g, request.tolerance))
            .collect();

        let bounds = geometries
            .iter()
            .filter_map(|g| g.bounding_rect())
            .map(Bounds::from)
            .reduce(|a, b| a.union(&b))
            .ok_or(TransformError::Empty)?;

        let collection = geojson::feature_collection(&geometries, &bounds);
        let bytes = serde_json::to_vec(&collection).map_err(|e| TransformError::Encode(e.to_string()))?;

        debug!(
            layer = %request.layer,
            source = %path.display(),
            features = geometries.len(),
            tolerance = request.tolerance,
            "Transformed shapefile"
        );

        Ok(TransformedArtifact {
            bytes,
            bounds,
            feature_count: geometries.len(),
        })
    }
}
