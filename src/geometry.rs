//! Typed GeoJSON geometries.
//!
//! Raw JSON is checked once, when it is turned into a [`Geometry`]: every position has at
//! least two numbers and sits at the nesting depth its geometry kind requires. Members the
//! model does not own (`bbox` and foreign members) are kept verbatim and in their original
//! order, so that serializing a geometry reproduces everything but its coordinates.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::transform::PointTransformError;

pub type JsonObject = Map<String, JsonValue>;

/// One GeoJSON position: `x`, `y` and any trailing ordinates (usually a single `z`).
#[derive(Debug, Clone, PartialEq)]
pub struct Position(Vec<f64>);

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position(vec![x, y])
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Position(vec![x, y, z])
    }

    /// `None` when fewer than two ordinates are given.
    pub fn from_ordinates(ordinates: Vec<f64>) -> Option<Self> {
        (ordinates.len() >= 2).then_some(Position(ordinates))
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    pub fn z(&self) -> Option<f64> {
        self.0.get(2).copied()
    }

    pub fn ordinates(&self) -> &[f64] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// This position with `x` and `y` taken from `planar`; ordinates from index 2 on are
    /// kept from `self`.
    pub fn with_xy_of(&self, planar: &Position) -> Position {
        let mut ordinates = Vec::with_capacity(self.0.len());
        ordinates.extend_from_slice(&[planar.x(), planar.y()]);
        ordinates.extend_from_slice(&self.0[2..]);
        Position(ordinates)
    }

    fn to_json_value(&self) -> JsonValue {
        JsonValue::Array(self.0.iter().map(|&o| JsonValue::from(o)).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 7] = [
        GeometryKind::Point,
        GeometryKind::MultiPoint,
        GeometryKind::LineString,
        GeometryKind::MultiLineString,
        GeometryKind::Polygon,
        GeometryKind::MultiPolygon,
        GeometryKind::GeometryCollection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }

    /// The kind named by a GeoJSON `type` member.
    pub fn from_type_name(name: &str) -> Option<Self> {
        GeometryKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    fn payload_member(&self) -> &'static str {
        match self {
            GeometryKind::GeometryCollection => "geometries",
            _ => "coordinates",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape of a geometry's coordinates, one variant per GeoJSON kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    /// Exterior ring first, then holes.
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Value {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Value::Point(_) => GeometryKind::Point,
            Value::MultiPoint(_) => GeometryKind::MultiPoint,
            Value::LineString(_) => GeometryKind::LineString,
            Value::MultiLineString(_) => GeometryKind::MultiLineString,
            Value::Polygon(_) => GeometryKind::Polygon,
            Value::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Value::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    fn to_json_value(&self) -> JsonValue {
        fn positions(ps: &[Position]) -> JsonValue {
            JsonValue::Array(ps.iter().map(Position::to_json_value).collect())
        }
        fn rings(rs: &[Vec<Position>]) -> JsonValue {
            JsonValue::Array(rs.iter().map(|r| positions(r)).collect())
        }
        match self {
            Value::Point(p) => p.to_json_value(),
            Value::MultiPoint(ps) | Value::LineString(ps) => positions(ps),
            Value::MultiLineString(rs) | Value::Polygon(rs) => rings(rs),
            Value::MultiPolygon(polygons) => {
                JsonValue::Array(polygons.iter().map(|p| rings(p)).collect())
            }
            Value::GeometryCollection(members) => {
                JsonValue::Array(members.iter().map(Geometry::to_json_value).collect())
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry must be a JSON object")]
    NotAnObject,
    #[error("geometry object has no string 'type' member")]
    MissingType,
    #[error("unsupported geometry type '{0}'")]
    UnsupportedKind(String),
    #[error("{kind} is missing its '{member}' member")]
    MissingMember {
        kind: GeometryKind,
        member: &'static str,
    },
    #[error("invalid {kind} coordinates: {reason}")]
    InvalidCoordinates { kind: GeometryKind, reason: String },
    #[error("failed to transform {kind}: {source}")]
    Transform {
        kind: GeometryKind,
        source: PointTransformError,
    },
    #[error("GeometryCollection member #{position}: {source}")]
    Member {
        /// 1-based position within `geometries`.
        position: usize,
        source: Box<GeometryError>,
    },
}

impl GeometryError {
    /// The innermost error, past any collection member wrappers.
    pub fn root(&self) -> &GeometryError {
        match self {
            GeometryError::Member { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub value: Value,
    /// Every member of the source object in source order. The `type` and payload members
    /// are placeholders; their live values come from `value`.
    members: JsonObject,
}

impl Geometry {
    pub fn new(value: Value) -> Self {
        Geometry {
            value,
            members: JsonObject::new(),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.value.kind()
    }

    pub fn bbox(&self) -> Option<&JsonValue> {
        self.members.get("bbox")
    }

    /// Members other than `type`, `coordinates`/`geometries` and `bbox`.
    pub fn foreign_members(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        let payload = self.kind().payload_member();
        self.members
            .iter()
            .filter(move |(key, _)| {
                !matches!(key.as_str(), "type" | "bbox") && key.as_str() != payload
            })
    }

    /// A geometry with the same non-coordinate members as `self` and a new value.
    ///
    /// The new value is expected to be of the same kind.
    pub(crate) fn with_value(&self, value: Value) -> Geometry {
        debug_assert_eq!(value.kind(), self.kind());
        Geometry {
            value,
            members: self.members.clone(),
        }
    }

    pub fn from_json_value(value: JsonValue) -> Result<Self, GeometryError> {
        match value {
            JsonValue::Object(object) => Geometry::from_json_object(object),
            _ => Err(GeometryError::NotAnObject),
        }
    }

    pub fn from_json_object(mut object: JsonObject) -> Result<Self, GeometryError> {
        let kind = match object.get("type") {
            Some(JsonValue::String(name)) => GeometryKind::from_type_name(name)
                .ok_or_else(|| GeometryError::UnsupportedKind(name.clone()))?,
            _ => return Err(GeometryError::MissingType),
        };
        let member = kind.payload_member();
        let payload = match object.get_mut(member) {
            Some(payload) => payload.take(),
            None => return Err(GeometryError::MissingMember { kind, member }),
        };
        let parser = CoordinateParser { kind };
        let value = match kind {
            GeometryKind::Point => Value::Point(parser.position(&payload, &mut Vec::new())?),
            GeometryKind::MultiPoint => {
                Value::MultiPoint(parser.positions(&payload, &mut Vec::new())?)
            }
            GeometryKind::LineString => {
                Value::LineString(parser.positions(&payload, &mut Vec::new())?)
            }
            GeometryKind::MultiLineString => {
                Value::MultiLineString(parser.rings(&payload, &mut Vec::new())?)
            }
            GeometryKind::Polygon => Value::Polygon(parser.rings(&payload, &mut Vec::new())?),
            GeometryKind::MultiPolygon => {
                Value::MultiPolygon(parser.polygons(&payload, &mut Vec::new())?)
            }
            GeometryKind::GeometryCollection => {
                Value::GeometryCollection(collection_members(payload)?)
            }
        };
        Ok(Geometry {
            value,
            members: object,
        })
    }

    pub fn to_json_value(&self) -> JsonValue {
        let mut object = self.members.clone();
        object.insert("type".to_string(), JsonValue::from(self.kind().as_str()));
        object.insert(
            self.kind().payload_member().to_string(),
            self.value.to_json_value(),
        );
        JsonValue::Object(object)
    }
}

impl From<Value> for Geometry {
    fn from(value: Value) -> Self {
        Geometry::new(value)
    }
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

fn collection_members(payload: JsonValue) -> Result<Vec<Geometry>, GeometryError> {
    let JsonValue::Array(items) = payload else {
        return Err(GeometryError::InvalidCoordinates {
            kind: GeometryKind::GeometryCollection,
            reason: "'geometries' must be an array".to_string(),
        });
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            Geometry::from_json_value(item).map_err(|err| GeometryError::Member {
                position: i + 1,
                source: Box::new(err),
            })
        })
        .collect()
}

/// Reads nested coordinate arrays, reporting the index path of the first bad element.
struct CoordinateParser {
    kind: GeometryKind,
}

impl CoordinateParser {
    fn error(&self, path: &[usize], expected: &str) -> GeometryError {
        let at: String = path.iter().map(|i| format!("[{}]", i)).collect();
        GeometryError::InvalidCoordinates {
            kind: self.kind,
            reason: format!("expected {} at coordinates{}", expected, at),
        }
    }

    fn position(
        &self,
        value: &JsonValue,
        path: &mut Vec<usize>,
    ) -> Result<Position, GeometryError> {
        let expected = "an array of at least two numbers";
        let JsonValue::Array(items) = value else {
            return Err(self.error(path, expected));
        };
        let ordinates = items
            .iter()
            .map(JsonValue::as_f64)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| self.error(path, expected))?;
        Position::from_ordinates(ordinates).ok_or_else(|| self.error(path, expected))
    }

    fn list<T>(
        &self,
        value: &JsonValue,
        path: &mut Vec<usize>,
        expected: &str,
        item: impl Fn(&Self, &JsonValue, &mut Vec<usize>) -> Result<T, GeometryError>,
    ) -> Result<Vec<T>, GeometryError> {
        let JsonValue::Array(items) = value else {
            return Err(self.error(path, expected));
        };
        let mut parsed = Vec::with_capacity(items.len());
        for (i, value) in items.iter().enumerate() {
            path.push(i);
            parsed.push(item(self, value, path)?);
            path.pop();
        }
        Ok(parsed)
    }

    fn positions(
        &self,
        value: &JsonValue,
        path: &mut Vec<usize>,
    ) -> Result<Vec<Position>, GeometryError> {
        self.list(value, path, "an array of positions", Self::position)
    }

    fn rings(
        &self,
        value: &JsonValue,
        path: &mut Vec<usize>,
    ) -> Result<Vec<Vec<Position>>, GeometryError> {
        self.list(value, path, "an array of position arrays", Self::positions)
    }

    fn polygons(
        &self,
        value: &JsonValue,
        path: &mut Vec<usize>,
    ) -> Result<Vec<Vec<Vec<Position>>>, GeometryError> {
        self.list(value, path, "an array of polygons", Self::rings)
    }
}
