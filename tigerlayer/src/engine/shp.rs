//! ESRI shapefile (`.shp`) geometry reading.
//!
//! Shapes come from the `shapefile` crate; attributes in the `.dbf` are not
//! needed to build artifacts. Z and M variants are read as 2D.

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::{PolygonRing, Shape, ShapeReader};

const HEADER_LEN: usize = 100;
const RECORD_HEADER_LEN: usize = 8;

/// Shape type, bbox and the two counts that open a multipart record.
const MULTIPART_PREFIX: u64 = 4 + 32 + 4 + 4;
/// Shape type, bbox and the point count that open a multipoint record.
const MULTIPOINT_PREFIX: u64 = 4 + 32 + 4;
const POINT_LEN: u64 = 16;
const PART_INDEX_LEN: u64 = 4;

const POLYLINE: [i32; 3] = [3, 13, 23];
const POLYGON: [i32; 3] = [5, 15, 25];
const MULTIPOINT: [i32; 3] = [8, 18, 28];

/// Read every non-null shape of a `.shp` file.
pub(super) fn read_geometries(data: &[u8]) -> Result<Vec<Geometry<f64>>, String> {
    check_record_sizes(data)?;

    let reader = ShapeReader::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    let shapes = reader.read().map_err(|e| e.to_string())?;
    Ok(shapes.into_iter().filter_map(to_geometry).collect())
}

/// Reject records whose declared part or point counts do not fit in the
/// record. The reader sizes its buffers from those counts.
fn check_record_sizes(data: &[u8]) -> Result<(), String> {
    if data.len() < HEADER_LEN {
        return Err(format!("file too short for header ({} bytes)", data.len()));
    }

    let mut offset = HEADER_LEN;
    while offset < data.len() {
        let mut header = data
            .get(offset..offset + RECORD_HEADER_LEN)
            .ok_or_else(|| format!("record header at byte {} truncated", offset))?;
        let number = header.read_i32::<BigEndian>().map_err(|e| e.to_string())?;
        let words = header.read_i32::<BigEndian>().map_err(|e| e.to_string())?;
        let len = usize::try_from(words)
            .map_err(|_| format!("record {} has negative length", number))?
            * 2;

        let start = offset + RECORD_HEADER_LEN;
        let content = data
            .get(start..start + len)
            .ok_or_else(|| format!("record {} truncated", number))?;
        check_counts(content).map_err(|e| format!("record {}: {}", number, e))?;
        offset = start + len;
    }
    Ok(())
}

fn check_counts(content: &[u8]) -> Result<(), String> {
    let available = content.len() as u64;
    let mut r = Cursor::new(content);
    let Ok(shape_type) = r.read_i32::<LittleEndian>() else {
        return Err("missing shape type".to_string());
    };

    let required = if POLYLINE.contains(&shape_type) || POLYGON.contains(&shape_type) {
        r.set_position(36);
        let parts = read_count(&mut r)?;
        let points = read_count(&mut r)?;
        MULTIPART_PREFIX + parts * PART_INDEX_LEN + points * POINT_LEN
    } else if MULTIPOINT.contains(&shape_type) {
        r.set_position(36);
        MULTIPOINT_PREFIX + read_count(&mut r)? * POINT_LEN
    } else {
        return Ok(());
    };

    if required > available {
        return Err(format!(
            "declares {} bytes of geometry but holds {}",
            required, available
        ));
    }
    Ok(())
}

fn read_count(r: &mut Cursor<&[u8]>) -> Result<u64, String> {
    let n = r
        .read_i32::<LittleEndian>()
        .map_err(|_| "record too short for counts".to_string())?;
    u64::try_from(n).map_err(|_| format!("negative count {}", n))
}

/// Planar coordinate of any shapefile point variant.
trait Planar {
    fn coord(&self) -> Coord<f64>;
}

impl Planar for shapefile::Point {
    fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl Planar for shapefile::PointM {
    fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl Planar for shapefile::PointZ {
    fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

fn to_geometry(shape: Shape) -> Option<Geometry<f64>> {
    let geometry = match shape {
        Shape::NullShape => return None,
        Shape::Point(p) => Geometry::Point(Point(p.coord())),
        Shape::PointM(p) => Geometry::Point(Point(p.coord())),
        Shape::PointZ(p) => Geometry::Point(Point(p.coord())),
        Shape::Multipoint(m) => multipoint(m.points()),
        Shape::MultipointM(m) => multipoint(m.points()),
        Shape::MultipointZ(m) => multipoint(m.points()),
        Shape::Polyline(l) => lines(l.parts()),
        Shape::PolylineM(l) => lines(l.parts()),
        Shape::PolylineZ(l) => lines(l.parts()),
        Shape::Polygon(p) => polygons(p.rings()),
        Shape::PolygonM(p) => polygons(p.rings()),
        Shape::PolygonZ(p) => polygons(p.rings()),
        Shape::Multipatch(_) => return None,
    };
    Some(geometry)
}

fn line<P: Planar>(points: &[P]) -> LineString<f64> {
    LineString::new(points.iter().map(Planar::coord).collect())
}

fn multipoint<P: Planar>(points: &[P]) -> Geometry<f64> {
    Geometry::MultiPoint(MultiPoint::new(
        points.iter().map(|p| Point(p.coord())).collect(),
    ))
}

fn lines<P: Planar>(parts: &[Vec<P>]) -> Geometry<f64> {
    Geometry::MultiLineString(MultiLineString::new(
        parts.iter().map(|part| line(part)).collect(),
    ))
}

/// Outer rings start a polygon; inner rings are holes of the preceding one.
fn polygons<P: Planar>(rings: &[PolygonRing<P>]) -> Geometry<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Inner(points) if !polygons.is_empty() => {
                if let Some((_, holes)) = polygons.last_mut() {
                    holes.push(line(points));
                }
            }
            PolygonRing::Inner(points) | PolygonRing::Outer(points) => {
                polygons.push((line(points), Vec::new()));
            }
        }
    }
    Geometry::MultiPolygon(MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    ))
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Clockwise square.
    const OUTER: &[(f64, f64)] = &[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)];
    /// Counter-clockwise square inside OUTER.
    const HOLE: &[(f64, f64)] = &[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)];

    #[test]
    fn test_polygon_with_hole() {
        let data = fixtures::polygons(&[&[OUTER, HOLE]]);

        let geometries = read_geometries(&data).unwrap();

        assert_eq!(geometries.len(), 1);
        let Geometry::MultiPolygon(mp) = &geometries[0] else {
            panic!("expected multipolygon");
        };
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_two_outer_rings_are_two_polygons() {
        let shifted: Vec<(f64, f64)> = OUTER.iter().map(|(x, y)| (x + 10.0, *y)).collect();
        let data = fixtures::polygons(&[&[OUTER, &shifted]]);

        let geometries = read_geometries(&data).unwrap();
        let Geometry::MultiPolygon(mp) = &geometries[0] else {
            panic!("expected multipolygon");
        };
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn test_polyline_parts() {
        let data = fixtures::polylines(&[&[&[(0.0, 0.0), (1.0, 1.0)], &[(2.0, 2.0), (3.0, 3.0), (4.0, 2.0)]]]);

        let geometries = read_geometries(&data).unwrap();
        let Geometry::MultiLineString(mls) = &geometries[0] else {
            panic!("expected multilinestring");
        };
        assert_eq!(mls.0.len(), 2);
        assert_eq!(mls.0[1].0.len(), 3);
    }

    #[test]
    fn test_points_skip_null() {
        let data = fixtures::points_with_null(&[(-86.5, 32.4), (-87.0, 33.0)]);

        let geometries = read_geometries(&data).unwrap();

        assert_eq!(geometries.len(), 2);
        assert_eq!(geometries[0], Geometry::Point(Point::new(-86.5, 32.4)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(read_geometries(b"short").is_err());
        assert!(read_geometries(&[0u8; 100]).is_err());
    }

    #[test]
    fn test_truncated_record() {
        let mut data = fixtures::points_with_null(&[(1.0, 2.0)]);
        data.truncate(data.len() - 6);
        assert!(read_geometries(&data).is_err());
    }

    #[test]
    fn test_oversized_point_count_is_rejected() {
        let data = fixtures::polyline_declaring(1, i32::MAX);

        let err = read_geometries(&data).unwrap_err();

        assert!(err.contains("record 1"), "{err}");
    }

    #[test]
    fn test_oversized_part_count_is_rejected() {
        let data = fixtures::polyline_declaring(i32::MAX, 1);
        assert!(read_geometries(&data).is_err());
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let data = fixtures::polyline_declaring(1, -4);
        assert!(read_geometries(&data).is_err());
    }

    #[test]
    fn test_oversized_multipoint_is_rejected() {
        let data = fixtures::multipoint_declaring(1 << 28);
        assert!(read_geometries(&data).is_err());
    }

    #[test]
    fn test_counts_matching_content_are_accepted() {
        let data = fixtures::polyline_declaring(1, 1);

        let geometries = read_geometries(&data).unwrap();

        assert_eq!(geometries.len(), 1);
    }
}
