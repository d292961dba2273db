//! Conversions between [`geo_types`] geometries and the GeoJSON model.
//!
//! `geo_types` is strictly planar, so converting to it drops every ordinate after `y`.
//! `Line`, `Rect` and `Triangle` have no GeoJSON counterpart and become a `LineString`
//! or a `Polygon`.

use geo_types::{Coord, LineString as GeoLineString, Polygon as GeoPolygon};

use crate::geometry::{Geometry, GeometryError, Position, Value};
use crate::reproject::transform_geometry;
use crate::transform::CoordinateTransform;

fn position(coord: &Coord<f64>) -> Position {
    Position::new(coord.x, coord.y)
}

fn coord(position: &Position) -> Coord<f64> {
    Coord {
        x: position.x(),
        y: position.y(),
    }
}

fn path(line: &GeoLineString<f64>) -> Vec<Position> {
    line.0.iter().map(position).collect()
}

fn rings(polygon: &GeoPolygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(path)
        .collect()
}

fn line_string(positions: &[Position]) -> GeoLineString<f64> {
    GeoLineString(positions.iter().map(coord).collect())
}

fn polygon(rings: &[Vec<Position>]) -> GeoPolygon<f64> {
    match rings.split_first() {
        Some((exterior, interiors)) => GeoPolygon::new(
            line_string(exterior),
            interiors.iter().map(|ring| line_string(ring)).collect(),
        ),
        None => GeoPolygon::new(GeoLineString(Vec::new()), Vec::new()),
    }
}

impl From<&geo_types::Geometry<f64>> for Value {
    fn from(geometry: &geo_types::Geometry<f64>) -> Self {
        use geo_types::Geometry as G;
        match geometry {
            G::Point(point) => Value::Point(position(&point.0)),
            G::Line(line) => Value::LineString(vec![position(&line.start), position(&line.end)]),
            G::LineString(line) => Value::LineString(path(line)),
            G::Polygon(p) => Value::Polygon(rings(p)),
            G::MultiPoint(points) => {
                Value::MultiPoint(points.0.iter().map(|p| position(&p.0)).collect())
            }
            G::MultiLineString(lines) => Value::MultiLineString(lines.0.iter().map(path).collect()),
            G::MultiPolygon(polygons) => {
                Value::MultiPolygon(polygons.0.iter().map(rings).collect())
            }
            G::GeometryCollection(members) => Value::GeometryCollection(
                members.0.iter().map(Geometry::from).collect(),
            ),
            G::Rect(rect) => Value::Polygon(rings(&rect.to_polygon())),
            G::Triangle(triangle) => Value::Polygon(rings(&triangle.to_polygon())),
        }
    }
}

impl From<&geo_types::Geometry<f64>> for Geometry {
    fn from(geometry: &geo_types::Geometry<f64>) -> Self {
        Geometry::new(Value::from(geometry))
    }
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(geometry: geo_types::Geometry<f64>) -> Self {
        Geometry::from(&geometry)
    }
}

impl From<&Geometry> for geo_types::Geometry<f64> {
    fn from(geometry: &Geometry) -> Self {
        use geo_types::Geometry as G;
        match &geometry.value {
            Value::Point(p) => G::Point(geo_types::Point(coord(p))),
            Value::MultiPoint(points) => G::MultiPoint(geo_types::MultiPoint(
                points.iter().map(|p| geo_types::Point(coord(p))).collect(),
            )),
            Value::LineString(line) => G::LineString(line_string(line)),
            Value::MultiLineString(lines) => G::MultiLineString(geo_types::MultiLineString(
                lines.iter().map(|line| line_string(line)).collect(),
            )),
            Value::Polygon(p) => G::Polygon(polygon(p)),
            Value::MultiPolygon(polygons) => G::MultiPolygon(geo_types::MultiPolygon(
                polygons.iter().map(|p| polygon(p)).collect(),
            )),
            Value::GeometryCollection(members) => G::GeometryCollection(
                geo_types::GeometryCollection(members.iter().map(G::from).collect()),
            ),
        }
    }
}

/// Reproject a `geo_types` geometry.
///
/// `Line`, `Rect` and `Triangle` come back as a `LineString` or a `Polygon`.
pub fn transform_geo_geometry<T>(
    transform: &T,
    geometry: &geo_types::Geometry<f64>,
) -> Result<geo_types::Geometry<f64>, GeometryError>
where
    T: CoordinateTransform + ?Sized,
{
    let projected = transform_geometry(transform, &Geometry::from(geometry))?;
    Ok(geo_types::Geometry::from(&projected))
}
