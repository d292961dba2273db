//! Whole GeoJSON documents: a bare geometry, a Feature or a FeatureCollection.

use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::geometry::{Geometry, GeometryError, GeometryKind, JsonObject};
use crate::reproject::transform_geometry;
use crate::transform::CoordinateTransform;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("malformed GeoJSON: {0}")]
    MalformedInput(String),
    #[error("unsupported GeoJSON type {}", describe_type(.found))]
    UnsupportedDocumentType { found: Option<String> },
    #[error("feature #{position} of the FeatureCollection is malformed: {reason}")]
    MalformedFeature {
        /// 1-based position in the FeatureCollection.
        position: usize,
        reason: String,
    },
    #[error("{0}")]
    GeometryTransform(GeometryError),
    #[error("failed to transform the Feature's geometry: {0}")]
    FeatureTransform(GeometryError),
    #[error(
        "failed to transform the geometry of feature #{position} in the FeatureCollection: {source}"
    )]
    FeatureCollectionTransform {
        /// 1-based position in the FeatureCollection.
        position: usize,
        source: GeometryError,
    },
}

fn describe_type(found: &Option<String>) -> String {
    match found {
        Some(name) => format!("'{}'", name),
        None => "(the object has no string 'type' member)".to_string(),
    }
}

impl DocumentError {
    /// The geometry error behind a transform failure, if this is one.
    pub fn geometry_error(&self) -> Option<&GeometryError> {
        match self {
            DocumentError::GeometryTransform(err)
            | DocumentError::FeatureTransform(err)
            | DocumentError::FeatureCollectionTransform { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

/// Why a FeatureCollection entry could not be read.
enum FeatureError {
    Malformed(String),
    Geometry(GeometryError),
}

/// A GeoJSON Feature.
///
/// Everything but the geometry (properties, id, bbox, foreign members) is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    geometry: Option<Geometry>,
    /// Source members in source order; `geometry` is a placeholder.
    members: JsonObject,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Option<JsonValue>) -> Self {
        let mut members = JsonObject::new();
        members.insert("type".to_string(), JsonValue::from("Feature"));
        members.insert("geometry".to_string(), JsonValue::Null);
        members.insert(
            "properties".to_string(),
            properties.unwrap_or(JsonValue::Null),
        );
        Feature { geometry, members }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn properties(&self) -> Option<&JsonValue> {
        self.members.get("properties").filter(|p| !p.is_null())
    }

    pub fn id(&self) -> Option<&JsonValue> {
        self.members.get("id")
    }

    pub fn bbox(&self) -> Option<&JsonValue> {
        self.members.get("bbox")
    }

    /// Read a standalone Feature. A null or absent `geometry` is kept as it is.
    fn from_json_object(mut members: JsonObject) -> Result<Self, GeometryError> {
        let geometry = match members.get_mut("geometry") {
            None | Some(JsonValue::Null) => None,
            Some(geometry) => Some(Geometry::from_json_value(geometry.take())?),
        };
        Ok(Feature { geometry, members })
    }

    /// Read a FeatureCollection entry: any object with a `geometry` member. Its `type` is
    /// not checked.
    fn from_collection_entry(value: JsonValue) -> Result<Self, FeatureError> {
        let JsonValue::Object(members) = value else {
            return Err(FeatureError::Malformed("not a JSON object".to_string()));
        };
        if !members.contains_key("geometry") {
            return Err(FeatureError::Malformed("missing 'geometry' member".to_string()));
        }
        Feature::from_json_object(members).map_err(FeatureError::Geometry)
    }

    fn with_geometry(&self, geometry: Option<Geometry>) -> Feature {
        Feature {
            geometry,
            members: self.members.clone(),
        }
    }

    pub fn to_json_value(&self) -> JsonValue {
        let mut object = self.members.clone();
        if let Some(geometry) = &self.geometry {
            object.insert("geometry".to_string(), geometry.to_json_value());
        }
        JsonValue::Object(object)
    }
}

/// A GeoJSON FeatureCollection. Feature order is significant and preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    members: JsonObject,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        let mut members = JsonObject::new();
        members.insert("type".to_string(), JsonValue::from("FeatureCollection"));
        FeatureCollection { features, members }
    }

    pub fn bbox(&self) -> Option<&JsonValue> {
        self.members.get("bbox")
    }

    pub fn to_json_value(&self) -> JsonValue {
        let mut object = self.members.clone();
        object.insert(
            "features".to_string(),
            JsonValue::Array(self.features.iter().map(Feature::to_json_value).collect()),
        );
        JsonValue::Object(object)
    }

    fn from_json_object(mut members: JsonObject) -> Result<Self, DocumentError> {
        let entries = match members.get_mut("features") {
            Some(JsonValue::Array(entries)) => std::mem::take(entries),
            _ => {
                return Err(DocumentError::MalformedInput(
                    "FeatureCollection is missing a 'features' array".to_string(),
                ));
            }
        };
        let features = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                Feature::from_collection_entry(entry).map_err(|err| match err {
                    FeatureError::Malformed(reason) => DocumentError::MalformedFeature {
                        position: i + 1,
                        reason,
                    },
                    FeatureError::Geometry(source) => DocumentError::FeatureCollectionTransform {
                        position: i + 1,
                        source,
                    },
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(FeatureCollection { features, members })
    }
}

/// A top level GeoJSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJson {
    Geometry(Geometry),
    Feature(Feature),
    FeatureCollection(FeatureCollection),
}

impl GeoJson {
    pub fn from_json_value(value: JsonValue) -> Result<Self, DocumentError> {
        let JsonValue::Object(object) = value else {
            return Err(DocumentError::MalformedInput(
                "expected a JSON object".to_string(),
            ));
        };
        let type_name = match object.get("type") {
            Some(JsonValue::String(name)) => name.clone(),
            _ => return Err(DocumentError::UnsupportedDocumentType { found: None }),
        };
        match type_name.as_str() {
            "Feature" => Feature::from_json_object(object)
                .map(GeoJson::Feature)
                .map_err(DocumentError::FeatureTransform),
            "FeatureCollection" => {
                FeatureCollection::from_json_object(object).map(GeoJson::FeatureCollection)
            }
            name if GeometryKind::from_type_name(name).is_some() => {
                Geometry::from_json_object(object)
                    .map(GeoJson::Geometry)
                    .map_err(DocumentError::GeometryTransform)
            }
            _ => Err(DocumentError::UnsupportedDocumentType {
                found: Some(type_name),
            }),
        }
    }

    /// The value of the top level `type` member.
    pub fn type_name(&self) -> &'static str {
        match self {
            GeoJson::Geometry(geometry) => geometry.kind().as_str(),
            GeoJson::Feature(_) => "Feature",
            GeoJson::FeatureCollection(_) => "FeatureCollection",
        }
    }

    pub fn to_json_value(&self) -> JsonValue {
        match self {
            GeoJson::Geometry(geometry) => geometry.to_json_value(),
            GeoJson::Feature(feature) => feature.to_json_value(),
            GeoJson::FeatureCollection(collection) => collection.to_json_value(),
        }
    }
}

impl FromStr for GeoJson {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: JsonValue = serde_json::from_str(s)
            .map_err(|err| DocumentError::MalformedInput(format!("not valid JSON: {}", err)))?;
        GeoJson::from_json_value(value)
    }
}

impl Serialize for GeoJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

/// Reproject every geometry in `document`.
///
/// Features with a null or absent geometry pass through unchanged. The first failing feature
/// aborts the whole document; for a FeatureCollection the error carries its 1-based position.
pub fn transform_document<T>(transform: &T, document: &GeoJson) -> Result<GeoJson, DocumentError>
where
    T: CoordinateTransform + ?Sized,
{
    match document {
        GeoJson::Geometry(geometry) => transform_geometry(transform, geometry)
            .map(GeoJson::Geometry)
            .map_err(DocumentError::GeometryTransform),
        GeoJson::Feature(feature) => transform_feature(transform, feature)
            .map(GeoJson::Feature)
            .map_err(DocumentError::FeatureTransform),
        GeoJson::FeatureCollection(collection) => {
            let features = collection
                .features
                .iter()
                .enumerate()
                .map(|(i, feature)| {
                    transform_feature(transform, feature).map_err(|source| {
                        DocumentError::FeatureCollectionTransform {
                            position: i + 1,
                            source,
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            log::debug!("transformed FeatureCollection of {} features", features.len());
            Ok(GeoJson::FeatureCollection(FeatureCollection {
                features,
                members: collection.members.clone(),
            }))
        }
    }
}

fn transform_feature<T>(transform: &T, feature: &Feature) -> Result<Feature, GeometryError>
where
    T: CoordinateTransform + ?Sized,
{
    match feature.geometry() {
        None => Ok(feature.clone()),
        Some(geometry) => Ok(feature.with_geometry(Some(transform_geometry(transform, geometry)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Position, Value};
    use crate::transform::{PointTransformError, Transformer};
    use approx::assert_relative_eq;
    use serde_json::json;

    fn double(p: &Position) -> Result<Position, PointTransformError> {
        Ok(Position::new(p.x() * 2.0, p.y() * 2.0))
    }

    /// Refuses every LineString vertex at x = 30.
    fn fail_at_thirty(p: &Position) -> Result<Position, PointTransformError> {
        if p.x() == 30.0 {
            Err(PointTransformError::new(p, "mocked failure"))
        } else {
            double(p)
        }
    }

    fn parse(value: JsonValue) -> Result<GeoJson, DocumentError> {
        GeoJson::from_json_value(value)
    }

    fn collection() -> JsonValue {
        json!({
            "type": "FeatureCollection",
            "name": "sample",
            "features": [
                {
                    "type": "Feature",
                    "id": 1,
                    "geometry": {"type": "Point", "coordinates": [10, 20]},
                    "properties": {"name": "point1"}
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[10, 20], [30, 40]]},
                    "properties": {"name": "line1"}
                },
                {"type": "Feature", "geometry": null, "properties": {"name": "null_geom_feature"}}
            ]
        })
    }

    #[test]
    fn collection_keeps_order_and_properties() {
        let doc = parse(collection()).unwrap();
        let out = transform_document(&double, &doc).unwrap().to_json_value();
        assert_eq!(out["name"], "sample");
        let features = out["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["id"], 1);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([20.0, 40.0]));
        assert_eq!(features[0]["properties"]["name"], "point1");
        assert_eq!(features[1]["geometry"]["coordinates"][1], json!([60.0, 80.0]));
        assert_eq!(features[1]["properties"]["name"], "line1");
        assert!(features[2]["geometry"].is_null());
        assert_eq!(features[2]["properties"]["name"], "null_geom_feature");
    }

    #[test]
    fn null_geometry_feature_is_returned_as_is() {
        let source =
            json!({"type": "Feature", "geometry": null, "properties": {"a": [1, 2]}, "id": "x"});
        let doc = parse(source.clone()).unwrap();
        let out = transform_document(&fail_at_thirty, &doc).unwrap();
        assert_eq!(out.to_json_value(), source);
    }

    #[test]
    fn failing_feature_aborts_the_collection() {
        let doc = parse(collection()).unwrap();
        let err = transform_document(&fail_at_thirty, &doc).unwrap_err();
        assert!(matches!(err, DocumentError::FeatureCollectionTransform { position: 2, .. }));
        assert!(err.to_string().contains("feature #2"));
        assert!(err.to_string().contains("mocked failure"));
    }

    #[test]
    fn single_feature_failure_is_wrapped() {
        let doc = parse(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [30, 0]},
            "properties": {},
        }))
        .unwrap();
        let err = transform_document(&fail_at_thirty, &doc).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::FeatureTransform(GeometryError::Transform {
                kind: GeometryKind::Point,
                ..
            })
        ));
    }

    #[test]
    fn unsupported_geometry_in_second_feature() {
        let err = parse(json!({"type": "FeatureCollection", "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [0, 0]},
                "properties": null
            },
            {
                "type": "Feature",
                "geometry": {"type": "Ellipse", "coordinates": [0, 0]},
                "properties": null
            }
        ]}))
        .unwrap_err();
        assert_eq!(
            err,
            DocumentError::FeatureCollectionTransform {
                position: 2,
                source: GeometryError::UnsupportedKind("Ellipse".to_string()),
            }
        );
    }

    #[test]
    fn malformed_entries_carry_their_position() {
        let err = parse(json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]}},
            "not a feature dict"
        ]}))
        .unwrap_err();
        assert!(matches!(err, DocumentError::MalformedFeature { position: 2, .. }));

        let err = parse(json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}}
        ]}))
        .unwrap_err();
        assert_eq!(
            err,
            DocumentError::MalformedFeature {
                position: 1,
                reason: "missing 'geometry' member".to_string()
            }
        );
    }

    #[test]
    fn standalone_feature_without_geometry_member_passes_through() {
        let source = json!({"type": "Feature", "props": {"k": 1}});
        let doc = parse(source.clone()).unwrap();
        let out = transform_document(&fail_at_thirty, &doc).unwrap();
        assert_eq!(out.to_json_value(), source);
    }

    #[test]
    fn collection_entry_needs_a_geometry_member() {
        let err = parse(json!({"type": "FeatureCollection", "features": [
            {"type": "Point", "coordinates": [0, 0]}
        ]}))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "feature #1 of the FeatureCollection is malformed: missing 'geometry' member"
        );
    }

    #[test]
    fn entry_without_type_is_still_transformed() {
        let doc = parse(json!({"type": "FeatureCollection", "features": [
            {"geometry": {"type": "Point", "coordinates": [1, 2]}, "properties": {}}
        ]}))
        .unwrap();
        let out = transform_document(&double, &doc).unwrap().to_json_value();
        assert_eq!(
            out["features"][0],
            json!({"geometry": {"type": "Point", "coordinates": [2.0, 4.0]}, "properties": {}})
        );
    }

    #[test]
    fn collection_needs_features_array() {
        let err = parse(json!({"type": "FeatureCollection", "geoms": []})).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedInput(_)));
    }

    #[test]
    fn unknown_or_missing_top_level_type() {
        let err = parse(json!({"type": "SomeCustomType", "coordinates": [1, 2, 3]})).unwrap_err();
        assert_eq!(err.to_string(), "unsupported GeoJSON type 'SomeCustomType'");
        let err = parse(json!({"coordinates": [1, 2]})).unwrap_err();
        assert_eq!(err, DocumentError::UnsupportedDocumentType { found: None });
        assert!(matches!(parse(json!([1, 2])), Err(DocumentError::MalformedInput(_))));
    }

    #[test]
    fn text_that_is_not_json() {
        let err = "this is not json".parse::<GeoJson>().unwrap_err();
        assert!(matches!(err, DocumentError::MalformedInput(_)));
    }

    #[test]
    fn top_level_geometry_collection_is_supported() {
        let doc: GeoJson = r#"{"type": "GeometryCollection", "geometries": [
            {"type": "Point", "coordinates": [1, 2]}
        ]}"#
        .parse()
        .unwrap();
        assert_eq!(doc.type_name(), "GeometryCollection");
        let out = transform_document(&double, &doc).unwrap();
        assert_eq!(
            out.to_json_value(),
            json!({"type": "GeometryCollection", "geometries": [
                {"type": "Point", "coordinates": [2.0, 4.0]}
            ]})
        );
    }

    #[test]
    fn built_features_serialize() {
        let point = Geometry::new(Value::Point(Position::new(1.0, 2.0)));
        let collection =
            FeatureCollection::new(vec![Feature::new(Some(point), Some(json!({"k": "v"})))]);
        let doc = GeoJson::FeatureCollection(collection);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"type": "FeatureCollection", "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                    "properties": {"k": "v"}
                }
            ]})
        );
    }

    #[test]
    fn feature_collection_to_web_mercator() {
        let t = Transformer::from_known_crs("EPSG:4326", "EPSG:3857").unwrap();
        let doc = parse(collection()).unwrap();
        let GeoJson::FeatureCollection(out) = transform_document(&t, &doc).unwrap() else {
            panic!("expected a FeatureCollection");
        };
        let Some(Value::Point(p)) = out.features[0].geometry().map(|g| &g.value) else {
            panic!("expected a point");
        };
        assert_relative_eq!(p.x(), 1113194.9079327358, epsilon = 1e-4);
        assert_eq!(out.features[0].properties(), Some(&json!({"name": "point1"})));
        assert!(out.features[2].geometry().is_none());
    }
}
