//! Reading boundary description files.

use std::path::Path;

use geo::BoundingRect;
use geo_types::MultiPoint;
use tracing::{debug, warn};

use super::{BoundaryCollection, BoundaryError, BoundaryMap, TileBoundary};
use crate::spatial::Bounds;

/// Load a boundary file from disk.
pub fn load_boundaries(path: &Path) -> Result<BoundaryMap, BoundaryError> {
    let data = std::fs::read(path).map_err(|source| BoundaryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_boundaries(&data, &path.display().to_string())
}

/// Parse a boundary feature collection.
///
/// Features without a `code` property or without any coordinates are skipped
/// with a warning; a structurally invalid document is an error.
pub fn parse_boundaries(data: &[u8], label: &str) -> Result<BoundaryMap, BoundaryError> {
    let collection: BoundaryCollection =
        serde_json::from_slice(data).map_err(|e| BoundaryError::Parse {
            path: label.to_string(),
            message: e.to_string(),
        })?;

    let mut map = BoundaryMap::new();
    for (index, feature) in collection.features.into_iter().enumerate() {
        let Some(code) = feature.properties.code else {
            warn!(source = label, index, "Boundary feature has no code, skipping");
            continue;
        };

        let Some(bounds) = extent(&feature.geometry.coordinates) else {
            warn!(source = label, code = %code, "Boundary feature has no coordinates, skipping");
            continue;
        };

        debug!(code = %code, ?bounds, "Loaded tile boundary");
        map.insert(TileBoundary { code, bounds });
    }

    Ok(map)
}

/// Extent of every position found in a (possibly nested) coordinate array.
fn extent(coordinates: &serde_json::Value) -> Option<Bounds> {
    let mut points = Vec::new();
    collect_positions(coordinates, &mut points);
    MultiPoint::from(points).bounding_rect().map(Bounds::from)
}

fn collect_positions(value: &serde_json::Value, out: &mut Vec<(f64, f64)>) {
    let Some(items) = value.as_array() else {
        return;
    };

    if let (Some(x), Some(y)) = (
        items.first().and_then(|v| v.as_f64()),
        items.get(1).and_then(|v| v.as_f64()),
    ) {
        out.push((x, y));
        return;
    }

    for item in items {
        collect_positions(item, out);
    }
}
