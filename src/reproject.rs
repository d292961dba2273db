use serde_json::Value as JsonValue;

use crate::geometry::{Geometry, GeometryError, GeometryKind, Position, Value};
use crate::transform::CoordinateTransform;

/// Reproject every position of `geometry`, returning a new geometry of the same kind and shape.
///
/// Only `x` and `y` come from `transform`; any further ordinates are copied from the input
/// position. The first position that fails aborts the whole geometry, and the error names the
/// kind of the geometry that held it. `bbox` and foreign members are copied unchanged.
///
/// ```no_run
/// use proj_mcp::{transform_geometry, Geometry, Position, Transformer, Value};
///
/// let transformer = Transformer::from_known_crs("EPSG:4326", "EPSG:3857").unwrap();
/// let point = Geometry::new(Value::Point(Position::new_3d(10.0, 20.0, 100.0)));
/// let projected = transform_geometry(&transformer, &point).unwrap();
/// if let Value::Point(p) = &projected.value {
///     assert!((p.x() - 1113194.9079327358).abs() < 1e-6);
///     assert_eq!(p.z(), Some(100.0));
/// }
/// ```
pub fn transform_geometry<T>(transform: &T, geometry: &Geometry) -> Result<Geometry, GeometryError>
where
    T: CoordinateTransform + ?Sized,
{
    let walker = Walker {
        transform,
        kind: geometry.kind(),
    };
    let value = match &geometry.value {
        Value::Point(p) => Value::Point(walker.position(p)?),
        Value::MultiPoint(ps) => Value::MultiPoint(walker.positions(ps)?),
        Value::LineString(ps) => Value::LineString(walker.positions(ps)?),
        Value::MultiLineString(lines) => Value::MultiLineString(walker.rings(lines)?),
        Value::Polygon(rings) => Value::Polygon(walker.rings(rings)?),
        Value::MultiPolygon(polygons) => Value::MultiPolygon(
            polygons
                .iter()
                .map(|rings| walker.rings(rings))
                .collect::<Result<_, _>>()?,
        ),
        Value::GeometryCollection(members) => Value::GeometryCollection(
            members
                .iter()
                .enumerate()
                .map(|(i, member)| {
                    transform_geometry(transform, member).map_err(|err| GeometryError::Member {
                        position: i + 1,
                        source: Box::new(err),
                    })
                })
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(geometry.with_value(value))
}

/// [`transform_geometry`] on a raw GeoJSON geometry object.
///
/// Fails with [`GeometryError::UnsupportedKind`] for a `type` outside the seven geometry
/// kinds, and with the structural errors of [`Geometry::from_json_value`].
pub fn transform_geometry_value<T>(
    transform: &T,
    geometry: &JsonValue,
) -> Result<JsonValue, GeometryError>
where
    T: CoordinateTransform + ?Sized,
{
    let geometry = Geometry::from_json_value(geometry.clone())?;
    Ok(transform_geometry(transform, &geometry)?.to_json_value())
}

struct Walker<'a, T: ?Sized> {
    transform: &'a T,
    kind: GeometryKind,
}

impl<T: CoordinateTransform + ?Sized> Walker<'_, T> {
    fn position(&self, position: &Position) -> Result<Position, GeometryError> {
        let planar = self
            .transform
            .transform_position(position)
            .map_err(|source| GeometryError::Transform {
                kind: self.kind,
                source,
            })?;
        Ok(position.with_xy_of(&planar))
    }

    fn positions(&self, positions: &[Position]) -> Result<Vec<Position>, GeometryError> {
        positions.iter().map(|p| self.position(p)).collect()
    }

    fn rings(&self, rings: &[Vec<Position>]) -> Result<Vec<Vec<Position>>, GeometryError> {
        rings.iter().map(|ring| self.positions(ring)).collect()
    }
}
