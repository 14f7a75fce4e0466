//! Geohash encoding for artifact locality buckets.
//!
//! Artifacts are named after the geohash of their bounding-box center so that
//! the tile server can group them by approximate location without re-reading
//! any geometry.

use thiserror::Error;

use crate::spatial::Bounds;

/// Precision used for artifact filenames (~4.9km × 4.9km cells).
pub const ARTIFACT_PRECISION: usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeohashError {
    #[error("cannot geohash ({lat}, {lon}) at precision {precision}: {message}")]
    Encode {
        lat: f64,
        lon: f64,
        precision: usize,
        message: String,
    },
}

/// Encodes a point as a geohash of the given precision.
pub fn encode(lat: f64, lon: f64, precision: usize) -> Result<String, GeohashError> {
    ::geohash::encode(::geohash::Coord { x: lon, y: lat }, precision).map_err(|e| {
        GeohashError::Encode {
            lat,
            lon,
            precision,
            message: e.to_string(),
        }
    })
}

/// Encodes the center of a bounding box at artifact precision.
pub fn encode_center(bounds: &Bounds) -> Result<String, GeohashError> {
    let (lon, lat) = bounds.center();
    encode(lat, lon, ARTIFACT_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(encode(42.6, -5.6, 5).unwrap(), "ezs42");
        assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
    }

    #[test]
    fn test_artifact_precision_length() {
        let hash = encode(32.5, -86.6, ARTIFACT_PRECISION).unwrap();
        assert_eq!(hash.len(), 5);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            encode(91.0, 0.0, 5),
            Err(GeohashError::Encode { lat, .. }) if lat == 91.0
        ));
        assert!(encode(0.0, -181.0, 5).is_err());
    }

    #[test]
    fn test_cell_contains_encoded_point() {
        let (lat, lon) = (40.7128, -74.0060);
        let hash = encode(lat, lon, 7).unwrap();
        let cell = ::geohash::decode_bbox(&hash).unwrap();

        assert!(cell.min().x <= lon && lon <= cell.max().x);
        assert!(cell.min().y <= lat && lat <= cell.max().y);
    }

    #[test]
    fn test_encode_center_uses_box_midpoint() {
        let bounds = Bounds::new(-5.7, 42.5, -5.5, 42.7);
        assert_eq!(encode_center(&bounds).unwrap(), "ezs42");
    }
}
