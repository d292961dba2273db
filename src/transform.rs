use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::context::ThreadContext;
use crate::crs::{Crs, CrsResolver};
use crate::cstring_array::CStringArray;
use crate::geometry::Position;
use crate::pj::{Pj, PjCreateError};
use crate::Error;

/// Reproject a single position.
///
/// This is the seam between the geometry walkers and the CRS engine: [`Transformer`]
/// implements it with PROJ, and any `Fn(&Position) -> Result<Position, PointTransformError>`
/// closure implements it too.
///
/// Implementations receive every ordinate of the position. Callers that need the trailing
/// ordinates preserved (see [`transform_geometry`](crate::transform_geometry)) only keep the
/// `x` and `y` of the result.
pub trait CoordinateTransform {
    fn transform_position(&self, position: &Position) -> Result<Position, PointTransformError>;
}

impl<F> CoordinateTransform for F
where
    F: Fn(&Position) -> Result<Position, PointTransformError>,
{
    fn transform_position(&self, position: &Position) -> Result<Position, PointTransformError> {
        self(position)
    }
}

/// A coordinate lies outside the domain of the transformation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("could not transform ({x}, {y}): {reason}")]
pub struct PointTransformError {
    pub x: f64,
    pub y: f64,
    pub reason: String,
}

impl PointTransformError {
    pub fn new(position: &Position, reason: impl Into<String>) -> Self {
        PointTransformError {
            x: position.x(),
            y: position.y(),
            reason: reason.into(),
        }
    }
}

/// No transformation pipeline could be built between two CRSs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not build a transformation from '{source_crs}' to '{target_crs}': {reason}")]
pub struct TransformerInitError {
    pub source_crs: String,
    pub target_crs: String,
    pub reason: String,
}

/// Settings applied to every transformer a [`TransformerBuilder`] creates.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    /// Directories searched for `proj.db` and grids. Empty keeps PROJ's defaults.
    pub search_paths: Vec<PathBuf>,
    /// Restrict candidate operations to one authority, e.g. `EPSG`.
    pub authority: Option<String>,
    /// Minimum desired accuracy of candidate operations, in metres.
    pub accuracy: Option<f64>,
    /// Whether PROJ may fall back to a ballpark transformation.
    pub allow_ballpark: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            search_paths: Vec::new(),
            authority: None,
            accuracy: None,
            allow_ballpark: true,
        }
    }
}

impl TransformConfig {
    fn options(&self) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(authority) = &self.authority {
            options.push(format!("AUTHORITY={}", authority));
        }
        if let Some(accuracy) = self.accuracy {
            options.push(format!("ACCURACY={}", accuracy));
        }
        if !self.allow_ballpark {
            options.push("ALLOW_BALLPARK=NO".to_string());
        }
        options
    }
}

/// Creates [`Transformer`]s.
///
/// A builder owns one PROJ thread context. CRS handles passed to [`build`](Self::build) must
/// come from the builder's own [`resolver`](Self::resolver).
///
/// ```no_run
/// use proj_mcp::TransformerBuilder;
///
/// let builder = TransformerBuilder::new();
/// let resolver = builder.resolver();
/// let source = resolver.resolve("WGS84").unwrap();
/// let target = resolver.resolve("EPSG:3857").unwrap();
/// let transformer = builder.build(source, target).unwrap();
/// let (x, y) = transformer.transform_xy(10.0, 20.0).unwrap();
/// assert!((x - 1113194.9079327358).abs() < 1e-6);
/// assert!((y - 2273030.926987689).abs() < 1e-6);
/// ```
pub struct TransformerBuilder {
    ctx: Rc<ThreadContext>,
    config: TransformConfig,
}

impl TransformerBuilder {
    pub fn new() -> Self {
        TransformerBuilder {
            ctx: Rc::new(ThreadContext::new()),
            config: TransformConfig::default(),
        }
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self, Error> {
        let mut builder = TransformerBuilder::new();
        if !config.search_paths.is_empty() {
            builder.set_search_paths(&config.search_paths)?;
        }
        builder.set_authority(config.authority.clone());
        builder.set_accuracy(config.accuracy);
        builder.allow_ballpark(config.allow_ballpark);
        Ok(builder)
    }

    /// Set the directories PROJ searches for its database and grid files.
    pub fn set_search_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), Error> {
        self.ctx
            .set_search_paths(paths)
            .map_err(|err| Error::Config(format!("invalid PROJ search path: {}", err)))?;
        self.config.search_paths = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        Ok(())
    }

    pub fn set_authority(&mut self, authority: Option<String>) {
        self.config.authority = authority;
    }

    pub fn set_accuracy(&mut self, accuracy: Option<f64>) {
        self.config.accuracy = accuracy;
    }

    pub fn allow_ballpark(&mut self, allow: bool) {
        self.config.allow_ballpark = allow;
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// A resolver whose handles can be passed to [`build`](Self::build).
    pub fn resolver(&self) -> CrsResolver {
        CrsResolver::with_context(Rc::clone(&self.ctx))
    }

    /// Build a transformer from `source` to `target`, consuming both handles.
    ///
    /// The pipeline always takes and returns coordinates in (x=longitude/easting,
    /// y=latitude/northing) order, whatever the native axis order of either CRS.
    pub fn build(&self, source: Crs, target: Crs) -> Result<Transformer, TransformerInitError> {
        let init_error = |reason: String| TransformerInitError {
            source_crs: source.descriptor().to_string(),
            target_crs: target.descriptor().to_string(),
            reason,
        };
        if !Rc::ptr_eq(source.pj().context(), &self.ctx)
            || !Rc::ptr_eq(target.pj().context(), &self.ctx)
        {
            return Err(init_error(PjCreateError::ContextMismatch.to_string()));
        }
        let options = CStringArray::from_strings(self.config.options())
            .map_err(|err| init_error(format!("invalid transformation option: {}", err)))?;
        let pipeline = Pj::crs_to_crs(source.pj(), target.pj(), &options)
            .and_then(|pj| pj.normalize_for_visualization())
            .map_err(|err| init_error(err.to_string()))?;
        log::debug!(
            "built transformer from {} to {}",
            source.canonical(),
            target.canonical()
        );
        Ok(Transformer {
            pj: pipeline,
            source_crs: source.descriptor().to_string(),
            target_crs: target.descriptor().to_string(),
        })
    }

    /// Resolve both descriptors and build a transformer between them.
    pub fn build_known_crs(
        &self,
        source_crs: &str,
        target_crs: &str,
    ) -> Result<Transformer, Error> {
        let resolver = self.resolver();
        let source = resolver.resolve(source_crs)?;
        let target = resolver.resolve(target_crs)?;
        Ok(self.build(source, target)?)
    }
}

impl Default for TransformerBuilder {
    fn default() -> Self {
        TransformerBuilder::new()
    }
}

/// A reprojection between two CRSs, with always-xy axis order.
///
/// Built once per request and dropped afterwards. The transformer owns its PROJ context and
/// is confined to the thread that built it.
pub struct Transformer {
    pj: Pj,
    source_crs: String,
    target_crs: String,
}

impl Transformer {
    /// Resolve `source_crs` and `target_crs` and build a transformer with default settings.
    pub fn from_known_crs(source_crs: &str, target_crs: &str) -> Result<Self, Error> {
        TransformerBuilder::new().build_known_crs(source_crs, target_crs)
    }

    pub fn source_crs(&self) -> &str {
        &self.source_crs
    }

    pub fn target_crs(&self) -> &str {
        &self.target_crs
    }

    /// Reproject a bare (x, y) pair.
    pub fn transform_xy(&self, x: f64, y: f64) -> Result<(f64, f64), PointTransformError> {
        let (x, y, _) = self.trans(x, y, 0.0).map_err(|reason| PointTransformError {
            x,
            y,
            reason,
        })?;
        Ok((x, y))
    }

    fn trans(&self, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64), String> {
        self.pj.errno_reset();
        // t = HUGE_VAL marks the coordinate as having no time
        let coord = unsafe { proj_sys::proj_coord(x, y, z, f64::INFINITY) };
        let out = self.pj.trans_forward(coord);
        let errno = self.pj.errno();
        if !errno.is_ok() {
            return Err(self.pj.errno_message(errno));
        }
        let out = unsafe { out.xyzt };
        if !out.x.is_finite() || !out.y.is_finite() {
            return Err("coordinate is outside the domain of the transformation".to_string());
        }
        Ok((out.x, out.y, out.z))
    }
}

impl CoordinateTransform for Transformer {
    fn transform_position(&self, position: &Position) -> Result<Position, PointTransformError> {
        let z = position.z();
        let (x, y, out_z) = self
            .trans(position.x(), position.y(), z.unwrap_or(0.0))
            .map_err(|reason| PointTransformError::new(position, reason))?;
        Ok(match z {
            Some(_) => Position::new_3d(x, y, out_z),
            None => Position::new(x, y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wgs84_to_web_mercator() -> Transformer {
        Transformer::from_known_crs("EPSG:4326", "EPSG:3857").unwrap()
    }

    #[test]
    fn origin_maps_to_origin() {
        let (x, y) = wgs84_to_web_mercator().transform_xy(0.0, 0.0).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn input_is_longitude_first() {
        // EPSG:4326 is natively latitude first
        let (x, y) = wgs84_to_web_mercator().transform_xy(10.0, 20.0).unwrap();
        assert_relative_eq!(x, 1113194.9079327358, epsilon = 1e-4);
        assert_relative_eq!(y, 2273030.926987689, epsilon = 1e-4);
    }

    #[test]
    fn aliases_resolve_through_builder() {
        let t = Transformer::from_known_crs("WGS84", "WebMercator").unwrap();
        assert_eq!(t.source_crs(), "WGS84");
        assert_eq!(t.target_crs(), "WebMercator");
        let (x, _) = t.transform_xy(10.0, 0.0).unwrap();
        assert_relative_eq!(x, 1113194.9079327358, epsilon = 1e-4);
    }

    #[test]
    fn same_crs_is_identity() {
        let t = Transformer::from_known_crs("EPSG:4326", "EPSG:4326").unwrap();
        let (x, y) = t.transform_xy(12.345678, -45.678901).unwrap();
        assert_relative_eq!(x, 12.345678, epsilon = 1e-6);
        assert_relative_eq!(y, -45.678901, epsilon = 1e-6);
    }

    #[test]
    fn there_and_back_again() {
        let forward = wgs84_to_web_mercator();
        let inverse = Transformer::from_known_crs("EPSG:3857", "EPSG:4326").unwrap();
        let (x, y) = forward.transform_xy(116.39, 39.91).unwrap();
        let (lon, lat) = inverse.transform_xy(x, y).unwrap();
        assert_relative_eq!(lon, 116.39, epsilon = 1e-6);
        assert_relative_eq!(lat, 39.91, epsilon = 1e-6);
    }

    #[test]
    fn pole_is_outside_mercator_domain() {
        let err = wgs84_to_web_mercator().transform_xy(0.0, 90.0).unwrap_err();
        assert_eq!((err.x, err.y), (0.0, 90.0));
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn failed_point_does_not_poison_the_next() {
        let t = wgs84_to_web_mercator();
        assert!(t.transform_xy(0.0, 90.0).is_err());
        assert!(t.transform_xy(10.0, 20.0).is_ok());
    }

    #[test]
    fn positions_keep_their_dimension() {
        let t = wgs84_to_web_mercator();
        let flat = t.transform_position(&Position::new(10.0, 20.0)).unwrap();
        assert_eq!(flat.dimensions(), 2);
        let raised = t.transform_position(&Position::new_3d(10.0, 20.0, 100.0)).unwrap();
        assert_eq!(raised.dimensions(), 3);
        assert_relative_eq!(raised.z().unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_crs_fails_before_building() {
        let err = Transformer::from_known_crs("EPSG:INVALID", "EPSG:3857").err().unwrap();
        assert!(matches!(err, Error::InvalidCrs(ref e) if e.descriptor == "EPSG:INVALID"));
    }

    #[test]
    fn handles_from_another_resolver_are_rejected() {
        let builder = TransformerBuilder::new();
        let source = CrsResolver::new().resolve("EPSG:4326").unwrap();
        let target = builder.resolver().resolve("EPSG:3857").unwrap();
        let err = builder.build(source, target).err().unwrap();
        assert_eq!(err.source_crs, "EPSG:4326");
        assert_eq!(err.target_crs, "EPSG:3857");
    }

    #[test]
    fn crs_on_another_body_has_no_pipeline() {
        let builder = TransformerBuilder::new();
        let resolver = builder.resolver();
        // Mars (2015) geographic CRS
        let source = resolver.resolve("IAU_2015:49900").unwrap();
        let target = resolver.resolve("EPSG:4326").unwrap();
        let err = builder.build(source, target).err().unwrap();
        assert_eq!(err.source_crs, "IAU_2015:49900");
        assert_eq!(err.target_crs, "EPSG:4326");
        assert!(!err.reason.is_empty());
        assert!(err.to_string().contains("IAU_2015:49900"));

        let err = builder.build_known_crs("IAU_2015:49900", "EPSG:4326").err().unwrap();
        assert!(matches!(err, Error::TransformerInit(_)));
    }

    #[test]
    fn options_follow_config() {
        let config = TransformConfig {
            authority: Some("EPSG".to_string()),
            accuracy: Some(1.5),
            allow_ballpark: false,
            ..TransformConfig::default()
        };
        assert_eq!(
            config.options(),
            vec!["AUTHORITY=EPSG", "ACCURACY=1.5", "ALLOW_BALLPARK=NO"]
        );
        assert!(TransformConfig::default().options().is_empty());
        let builder = TransformerBuilder::from_config(&config).unwrap();
        assert!(builder.build_known_crs("EPSG:4326", "EPSG:3857").is_ok());
    }

    #[test]
    fn closures_are_transforms() {
        let shift = |p: &Position| -> Result<Position, PointTransformError> {
            Ok(Position::new(p.x() + 1.0, p.y() - 1.0))
        };
        let out = shift.transform_position(&Position::new(1.0, 1.0)).unwrap();
        assert_eq!(out, Position::new(2.0, 0.0));
    }
}
