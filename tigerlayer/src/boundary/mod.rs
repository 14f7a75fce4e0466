//! Tile boundary descriptions.
//!
//! After ingestion, each layer directory gets a `tile_boundaries.geojson`
//! feature collection: one polygon per artifact bucket carrying the bucket
//! `code`. The tile server loads this file once and intersects viewports
//! against the polygon extents.
//!
//! ```text
//! ROADS/
//! ├── tl_2023_01001_roads.djf8k.geojson
//! ├── tl_2023_01003_roads.dj3pz.geojson
//! ├── tile_boundaries.geojson   ← generate_boundaries()
//! └── manifest.json             ← generate_manifest()
//! ```

mod generate;
mod load;

pub use generate::{generate_boundaries, generate_manifest, GenerationReport};
pub use load::{load_boundaries, parse_boundaries};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spatial::Bounds;

/// Errors reading or writing boundary descriptions.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed boundary file {path}: {message}")]
    Parse { path: String, message: String },
}

/// One produced artifact bucket and its extent.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBoundary {
    pub code: String,
    pub bounds: Bounds,
}

/// Bucket code → bounds, as loaded from a boundary file.
#[derive(Debug, Clone, Default)]
pub struct BoundaryMap {
    tiles: BTreeMap<String, Bounds>,
}

impl BoundaryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a boundary. Repeated codes keep the union of their extents.
    pub fn insert(&mut self, boundary: TileBoundary) {
        self.tiles
            .entry(boundary.code)
            .and_modify(|existing| *existing = existing.union(&boundary.bounds))
            .or_insert(boundary.bounds);
    }

    pub fn get(&self, code: &str) -> Option<&Bounds> {
        self.tiles.get(code)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Codes whose bounds intersect the given rectangle, in code order.
    pub fn intersecting<'a>(&'a self, rect: &'a Bounds) -> impl Iterator<Item = &'a str> + 'a {
        self.tiles
            .iter()
            .filter(move |(_, bounds)| bounds.intersects(rect))
            .map(|(code, _)| code.as_str())
    }
}

impl FromIterator<TileBoundary> for BoundaryMap {
    fn from_iter<I: IntoIterator<Item = TileBoundary>>(iter: I) -> Self {
        let mut map = BoundaryMap::new();
        for boundary in iter {
            map.insert(boundary);
        }
        map
    }
}

/// GeoJSON feature collection as written to `tile_boundaries.geojson`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<BoundaryFeature>,
}

/// A single boundary feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BoundaryProperties,
    pub geometry: FeatureGeometry,
}

/// Properties carried by a boundary feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundaryProperties {
    #[serde(default)]
    pub code: Option<String>,
    /// `[lon, lat]` label position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
}

/// Geometry of a boundary feature.
///
/// Coordinates are kept as raw JSON so any nesting depth (Polygon,
/// MultiPolygon) contributes to the extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: serde_json::Value,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl BoundaryCollection {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }
}

impl BoundaryFeature {
    /// Rectangle polygon feature for a bucket.
    pub fn from_boundary(boundary: &TileBoundary) -> Self {
        let (lon, lat) = boundary.bounds.center();
        Self {
            kind: feature_type(),
            properties: BoundaryProperties {
                code: Some(boundary.code.clone()),
                center: Some([lon, lat]),
            },
            geometry: FeatureGeometry {
                kind: "Polygon".to_string(),
                coordinates: serde_json::json!([boundary.bounds.ring()]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary(code: &str, bounds: [f64; 4]) -> TileBoundary {
        TileBoundary {
            code: code.to_string(),
            bounds: Bounds::from_array(bounds),
        }
    }

    #[test]
    fn test_intersecting_filters_by_bounds() {
        let map: BoundaryMap = vec![
            boundary("near1", [5.0, 5.0, 15.0, 15.0]),
            boundary("far01", [20.0, 20.0, 30.0, 30.0]),
        ]
        .into_iter()
        .collect();

        let viewport = Bounds::new(-10.0, -10.0, 10.0, 10.0);
        let codes: Vec<&str> = map.intersecting(&viewport).collect();

        assert_eq!(codes, vec!["near1"]);
    }

    #[test]
    fn test_repeated_code_keeps_every_extent() {
        let map: BoundaryMap = vec![
            boundary("dup00", [0.0, 0.0, 1.0, 1.0]),
            boundary("dup00", [2.0, 2.0, 3.0, 3.0]),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("dup00"), Some(&Bounds::new(0.0, 0.0, 3.0, 3.0)));

        let first_only = Bounds::new(0.2, 0.2, 0.8, 0.8);
        let codes: Vec<&str> = map.intersecting(&first_only).collect();
        assert_eq!(codes, vec!["dup00"]);
    }

    #[test]
    fn test_feature_from_boundary() {
        let feature = BoundaryFeature::from_boundary(&boundary("djf8k", [-88.0, 30.0, -86.0, 32.0]));

        assert_eq!(feature.kind, "Feature");
        assert_eq!(feature.properties.code.as_deref(), Some("djf8k"));
        assert_eq!(feature.properties.center, Some([-87.0, 31.0]));
        assert_eq!(feature.geometry.kind, "Polygon");
    }
}
