#![doc(html_logo_url = "https://raw.githubusercontent.com/georust/meta/master/logo/logo.png")]
//! `proj-mcp` reprojects coordinates and GeoJSON documents with [PROJ](https://proj.org)
//! and exposes that as a [Model Context Protocol](https://modelcontextprotocol.io) server.
//!
//! The library has three layers:
//!
//! 1. CRS resolution and transformer construction ([`CrsResolver`], [`TransformerBuilder`],
//!    [`Transformer`]), on top of `libproj` through `proj-sys`;
//! 2. a typed GeoJSON model ([`Geometry`], [`GeoJson`]) with a single JSON parse boundary;
//! 3. coordinate walkers ([`transform_geometry`], [`transform_document`]) that reproject
//!    every position while preserving structure, order, trailing ordinates and all
//!    non-coordinate members.
//!
//! The [`mcp`] module serves the `transform-coordinates`, `list-supported-crs` and
//! `transform-geojson-file` tools over stdio.
//!
//! # CRS descriptors
//!
//! Anywhere a CRS is expected you can pass one of the names in [`COMMON_CRS`]
//! (`WGS84`, `WebMercator`, `CGCS2000`, `Beijing54`, `Xian80`), an authority code such as
//! `EPSG:4326`, a PROJ string or WKT. Transformers always use (longitude/easting,
//! latitude/northing) axis order.
//!
//! # Threads
//!
//! A [`TransformerBuilder`] owns a PROJ thread context shared by every [`Crs`] and
//! [`Transformer`] it produces, so none of them are `Send`. Build one per thread.
//!
//! # Requirements
//!
//! By default this requires `libproj` to be present on your system. The `bundled_proj`
//! feature builds it from source through `proj-sys` instead. The `geo-types` feature
//! (on by default) adds conversions between [`Geometry`] and `geo_types::Geometry`.
//!
//! # Example
//!
//! ```
//! use approx::assert_relative_eq;
//! use proj_mcp::{transform_document, GeoJson, Transformer};
//!
//! let transformer = Transformer::from_known_crs("WGS84", "EPSG:3857").unwrap();
//! let (x, y) = transformer.transform_xy(10.0, 20.0).unwrap();
//! assert_relative_eq!(x, 1113194.9079327358, epsilon = 1e-4);
//! assert_relative_eq!(y, 2273030.926987689, epsilon = 1e-4);
//!
//! let document: GeoJson = r#"{"type": "Feature", "geometry": null, "properties": {"a": 1}}"#
//!     .parse()
//!     .unwrap();
//! let output = transform_document(&transformer, &document).unwrap();
//! assert_eq!(output, document);
//! ```

mod context;
mod crs;
mod cstring_array;
mod document;
mod errno;
mod error;
#[cfg(feature = "geo-types")]
mod geo_types;
mod geometry;
pub mod mcp;
mod pj;
mod reproject;
mod transform;

pub use crate::crs::{alias, Crs, CrsAlias, CrsError, CrsResolver, COMMON_CRS, DESCRIPTOR_FORMATS};
pub use crate::document::{
    transform_document, DocumentError, Feature, FeatureCollection, GeoJson,
};
pub use crate::error::Error;
#[cfg(feature = "geo-types")]
pub use crate::geo_types::transform_geo_geometry;
pub use crate::geometry::{Geometry, GeometryError, GeometryKind, JsonObject, Position, Value};
pub use crate::reproject::{transform_geometry, transform_geometry_value};
pub use crate::transform::{
    CoordinateTransform, PointTransformError, TransformConfig, Transformer, TransformerBuilder,
    TransformerInitError,
};
