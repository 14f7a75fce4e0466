//! Minimal GeoJSON encoding of `geo-types` geometries.

use geo_types::{Coord, Geometry, LineString, Polygon};
use serde_json::{json, Value};

use crate::spatial::Bounds;

fn position(c: &Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn line(ls: &LineString<f64>) -> Value {
    Value::Array(ls.coords().map(position).collect())
}

fn rings(p: &Polygon<f64>) -> Value {
    let mut out = vec![line(p.exterior())];
    out.extend(p.interiors().iter().map(line));
    Value::Array(out)
}

/// GeoJSON geometry object.
pub(super) fn geometry(g: &Geometry<f64>) -> Value {
    match g {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": position(&p.0)}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| position(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::Line(l) => json!({
            "type": "LineString",
            "coordinates": [position(&l.start), position(&l.end)],
        }),
        Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": line(ls)}),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.iter().map(line).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": rings(p)}),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(rings).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => geometry(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry(&Geometry::Polygon(t.to_polygon())),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.iter().map(geometry).collect::<Vec<_>>(),
        }),
    }
}

/// FeatureCollection with a top-level `bbox`.
pub(super) fn feature_collection(geometries: &[Geometry<f64>], bounds: &Bounds) -> Value {
    let features: Vec<Value> = geometries
        .iter()
        .enumerate()
        .map(|(index, g)| {
            json!({
                "type": "Feature",
                "properties": {"index": index},
                "geometry": geometry(g),
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "bbox": bounds.to_array(),
        "features": features,
    })
}
