//! The tools offered through `tools/list` and `tools/call`.

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::crs::{COMMON_CRS, DESCRIPTOR_FORMATS};
use crate::document::{transform_document, GeoJson};
use crate::geometry::JsonObject;
use crate::mcp::protocol::{CallToolResult, ToolDefinition};
use crate::transform::{TransformConfig, TransformerBuilder};
use crate::Error;

/// Why a tool call failed. Reported to the client as a tool result with `isError` set.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("missing arguments")]
    MissingArguments,
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("coordinate transformation failed: {0}")]
    Coordinates(#[source] Error),
    #[error("GeoJSON transformation failed: {0}")]
    GeoJson(#[source] Error),
    #[error("could not list coordinate reference systems: {0}")]
    Catalog(#[source] Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    TransformCoordinates,
    ListSupportedCrs,
    TransformGeojsonFile,
}

impl Tool {
    pub const ALL: [Tool; 3] = [
        Tool::TransformCoordinates,
        Tool::ListSupportedCrs,
        Tool::TransformGeojsonFile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::TransformCoordinates => "transform-coordinates",
            Tool::ListSupportedCrs => "list-supported-crs",
            Tool::TransformGeojsonFile => "transform-geojson-file",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            Tool::TransformCoordinates => {
                "Transform a batch of (x, y) coordinates between coordinate reference systems"
            }
            Tool::ListSupportedCrs => {
                "List the common coordinate reference systems and the accepted CRS formats"
            }
            Tool::TransformGeojsonFile => {
                "Transform every coordinate of a GeoJSON document \
                 between coordinate reference systems"
            }
        }
    }

    fn input_schema(&self) -> JsonValue {
        let crs = |role: &str| {
            json!({
                "type": "string",
                "description": format!(
                    "{} CRS: a common name such as WGS84, an authority code such as EPSG:4326, \
                     a PROJ string or WKT",
                    role
                ),
            })
        };
        match self {
            Tool::TransformCoordinates => json!({
                "type": "object",
                "properties": {
                    "source_crs": crs("Source"),
                    "target_crs": crs("Target"),
                    "coordinates": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "x": {"type": "number"},
                                "y": {"type": "number"},
                            },
                            "required": ["x", "y"],
                        },
                        "minItems": 1,
                    },
                },
                "required": ["source_crs", "target_crs", "coordinates"],
            }),
            Tool::ListSupportedCrs => json!({
                "type": "object",
                "properties": {},
            }),
            Tool::TransformGeojsonFile => json!({
                "type": "object",
                "properties": {
                    "source_crs": crs("Source"),
                    "target_crs": crs("Target"),
                    "geojson_content": {
                        "type": "string",
                        "description": "The GeoJSON document as text",
                    },
                },
                "required": ["source_crs", "target_crs", "geojson_content"],
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }

    /// Run the tool. Failures come back as an error result, never as a panic.
    pub fn call(&self, config: &TransformConfig, arguments: Option<&JsonObject>) -> CallToolResult {
        let outcome = match self {
            Tool::TransformCoordinates => transform_coordinates(config, arguments),
            Tool::ListSupportedCrs => list_supported_crs(config),
            Tool::TransformGeojsonFile => transform_geojson_file(config, arguments),
        };
        match outcome {
            Ok(text) => CallToolResult::text(text),
            Err(err) => {
                log::error!("{} failed: {}", self.name(), err);
                CallToolResult::error(err.to_string())
            }
        }
    }
}

pub fn definitions() -> Vec<ToolDefinition> {
    Tool::ALL.iter().map(Tool::definition).collect()
}

fn string_argument<'a>(
    arguments: &'a JsonObject,
    name: &'static str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(JsonValue::as_str)
        .ok_or(ToolError::MissingArgument(name))
}

#[derive(Debug, Deserialize)]
struct PointArgument {
    x: f64,
    y: f64,
}

fn transform_coordinates(
    config: &TransformConfig,
    arguments: Option<&JsonObject>,
) -> Result<String, ToolError> {
    let arguments = arguments.ok_or(ToolError::MissingArguments)?;
    let source_crs = string_argument(arguments, "source_crs")?;
    let target_crs = string_argument(arguments, "target_crs")?;
    let coordinates = arguments
        .get("coordinates")
        .ok_or(ToolError::MissingArgument("coordinates"))?;
    let points: Vec<PointArgument> =
        serde_json::from_value(coordinates.clone()).map_err(|err| ToolError::InvalidArgument {
            name: "coordinates",
            reason: err.to_string(),
        })?;
    if points.is_empty() {
        return Err(ToolError::InvalidArgument {
            name: "coordinates",
            reason: "at least one coordinate is required".to_string(),
        });
    }

    let transformer = TransformerBuilder::from_config(config)
        .and_then(|builder| builder.build_known_crs(source_crs, target_crs))
        .map_err(ToolError::Coordinates)?;

    let mut report = format!(
        "Coordinate transformation results (from {} to {}):",
        source_crs, target_crs
    );
    for point in &points {
        let _ = write!(report, "\nInput: ({}, {})\n", point.x, point.y);
        match transformer.transform_xy(point.x, point.y) {
            Ok((x, y)) => {
                let _ = write!(report, "Output: ({:.8}, {:.8})", x, y);
            }
            Err(err) => {
                log::warn!("{}", err);
                let _ = write!(report, "Error: {}", err);
            }
        }
    }
    Ok(report)
}

fn list_supported_crs(config: &TransformConfig) -> Result<String, ToolError> {
    let resolver = TransformerBuilder::from_config(config)
        .map_err(ToolError::Catalog)?
        .resolver();
    let mut report = String::from("Supported coordinate reference systems:");
    for alias in COMMON_CRS {
        let _ = write!(report, "\n{} ({}):\n  ", alias.name, alias.code);
        match resolver.resolve(alias.code) {
            Ok(crs) => {
                let _ = write!(report, "{}", crs.name().unwrap_or(alias.label));
            }
            Err(err) => {
                log::debug!("catalog entry {} unavailable: {}", alias.name, err);
                let _ = write!(report, "{} (details unavailable)", alias.label);
            }
        }
    }
    report.push_str("\n\nOther accepted formats:");
    for (format, example) in DESCRIPTOR_FORMATS {
        let _ = write!(report, "\n{}, e.g. {}", format, example);
    }
    Ok(report)
}

fn transform_geojson_file(
    config: &TransformConfig,
    arguments: Option<&JsonObject>,
) -> Result<String, ToolError> {
    let arguments = arguments.ok_or(ToolError::MissingArguments)?;
    let source_crs = string_argument(arguments, "source_crs")?;
    let target_crs = string_argument(arguments, "target_crs")?;
    let content = string_argument(arguments, "geojson_content")?;

    let document: GeoJson = content
        .parse()
        .map_err(|err| ToolError::GeoJson(Error::Document(err)))?;
    let transformer = TransformerBuilder::from_config(config)
        .and_then(|builder| builder.build_known_crs(source_crs, target_crs))
        .map_err(ToolError::GeoJson)?;
    let transformed = transform_document(&transformer, &document)
        .map_err(|err| ToolError::GeoJson(Error::Document(err)))?;
    log::debug!(
        "transformed {} from {} to {}",
        transformed.type_name(),
        source_crs,
        target_crs
    );
    let pretty = serde_json::to_string_pretty(&transformed.to_json_value()).map_err(|err| {
        ToolError::InvalidArgument {
            name: "geojson_content",
            reason: err.to_string(),
        }
    })?;
    Ok(format!(
        "GeoJSON transformed successfully (from {} to {}):\n{}",
        source_crs, target_crs, pretty
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: JsonValue) -> JsonObject {
        match value {
            JsonValue::Object(object) => object,
            _ => panic!("arguments must be an object"),
        }
    }

    fn call(tool: Tool, arguments: JsonValue) -> CallToolResult {
        tool.call(&TransformConfig::default(), Some(&args(arguments)))
    }

    #[test]
    fn names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("transform"), None);
        assert_eq!(definitions().len(), 3);
    }

    #[test]
    fn coordinates_schema_requires_at_least_one_point() {
        let schema = Tool::TransformCoordinates.definition().input_schema;
        assert_eq!(schema["properties"]["coordinates"]["minItems"], 1);
        assert_eq!(schema["required"], json!(["source_crs", "target_crs", "coordinates"]));
    }

    #[test]
    fn transform_coordinates_report() {
        let result = call(
            Tool::TransformCoordinates,
            json!({
                "source_crs": "WGS84",
                "target_crs": "EPSG:3857",
                "coordinates": [{"x": 10, "y": 20}],
            }),
        );
        assert!(!result.is_error);
        assert_eq!(
            result.text_content(),
            "Coordinate transformation results (from WGS84 to EPSG:3857):\n\
             Input: (10, 20)\n\
             Output: (1113194.90793274, 2273030.92698769)"
        );
    }

    #[test]
    fn a_failing_point_does_not_abort_the_batch() {
        let result = call(
            Tool::TransformCoordinates,
            json!({
                "source_crs": "EPSG:4326",
                "target_crs": "EPSG:3857",
                "coordinates": [{"x": 0, "y": 90}, {"x": 0, "y": 0}],
            }),
        );
        assert!(!result.is_error);
        let text = result.text_content();
        assert!(text.contains("Input: (0, 90)\nError: "));
        assert!(text.ends_with("Input: (0, 0)\nOutput: (0.00000000, 0.00000000)"));
    }

    #[test]
    fn missing_arguments_are_named() {
        let result = Tool::TransformCoordinates.call(&TransformConfig::default(), None);
        assert!(result.is_error);
        assert_eq!(result.text_content(), "missing arguments");

        let result = call(
            Tool::TransformCoordinates,
            json!({"source_crs": "EPSG:4326", "coordinates": [{"x": 0, "y": 0}]}),
        );
        assert_eq!(result.text_content(), "missing required argument: target_crs");

        let result = call(
            Tool::TransformGeojsonFile,
            json!({"source_crs": "EPSG:4326", "target_crs": "EPSG:3857", "geojson_content": 5}),
        );
        assert_eq!(result.text_content(), "missing required argument: geojson_content");
    }

    #[test]
    fn empty_coordinate_list_is_rejected() {
        let result = call(
            Tool::TransformCoordinates,
            json!({"source_crs": "EPSG:4326", "target_crs": "EPSG:3857", "coordinates": []}),
        );
        assert!(result.is_error);
        assert!(result.text_content().contains("at least one coordinate"));
    }

    #[test]
    fn invalid_crs_aborts_the_call() {
        let result = call(
            Tool::TransformCoordinates,
            json!({
                "source_crs": "EPSG:INVALID",
                "target_crs": "EPSG:3857",
                "coordinates": [{"x": 0, "y": 0}],
            }),
        );
        assert!(result.is_error);
        assert!(result.text_content().starts_with("coordinate transformation failed: "));
        assert!(result.text_content().contains("EPSG:INVALID"));
    }

    #[test]
    fn missing_pipeline_aborts_the_batch() {
        let result = call(
            Tool::TransformCoordinates,
            json!({
                "source_crs": "IAU_2015:49900",
                "target_crs": "EPSG:4326",
                "coordinates": [{"x": 0, "y": 0}, {"x": 10, "y": 20}],
            }),
        );
        assert!(result.is_error);
        let text = result.text_content();
        assert!(text.starts_with("coordinate transformation failed: "));
        assert!(text.contains("IAU_2015:49900"));
        assert!(!text.contains("Input:"));
    }

    #[test]
    fn catalog_lists_aliases_and_formats() {
        let result = Tool::ListSupportedCrs.call(&TransformConfig::default(), None);
        assert!(!result.is_error);
        let text = result.text_content();
        for alias in COMMON_CRS {
            assert!(text.contains(&format!("{} ({}):", alias.name, alias.code)));
        }
        assert!(text.contains("WGS 84 / Pseudo-Mercator"));
        assert!(text.contains("PROJ string, e.g. +proj=longlat"));
    }

    #[test]
    fn geojson_is_returned_pretty_printed() {
        let result = call(
            Tool::TransformGeojsonFile,
            json!({
                "source_crs": "EPSG:4326",
                "target_crs": "EPSG:3857",
                "geojson_content": r#"{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [0, 0]},
                    "properties": {"name": "origin"}
                }"#,
            }),
        );
        assert!(!result.is_error);
        let text = result.text_content();
        let (banner, body) = text.split_once('\n').unwrap();
        assert_eq!(banner, "GeoJSON transformed successfully (from EPSG:4326 to EPSG:3857):");
        let document: JsonValue = serde_json::from_str(body).unwrap();
        assert_eq!(document["properties"]["name"], "origin");
        assert!(document["geometry"]["coordinates"][0].as_f64().unwrap().abs() < 1e-6);
        assert!(body.contains("\n  \"geometry\""));
    }

    #[test]
    fn geojson_failures_return_no_document() {
        let result = call(
            Tool::TransformGeojsonFile,
            json!({
                "source_crs": "EPSG:4326",
                "target_crs": "EPSG:3857",
                "geojson_content": r#"{"type": "FeatureCollection", "features": [
                    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]}},
                    {"type": "Feature", "geometry": {"type": "Circle", "coordinates": [0, 0]}}
                ]}"#,
            }),
        );
        assert!(result.is_error);
        let text = result.text_content();
        assert!(text.starts_with("GeoJSON transformation failed: "));
        assert!(text.contains("feature #2"));
        assert!(text.contains("Circle"));
        assert!(!text.contains("\"features\""));

        let result = call(
            Tool::TransformGeojsonFile,
            json!({
                "source_crs": "EPSG:4326",
                "target_crs": "EPSG:3857",
                "geojson_content": "not json",
            }),
        );
        assert!(result.is_error);
        assert!(result.text_content().contains("malformed GeoJSON"));
    }
}
