//! Resolution of user supplied CRS descriptors into PROJ objects.
//!
//! A descriptor may be one of the short aliases in [`COMMON_CRS`], an authority code such as
//! `EPSG:4326`, a PROJ string, or WKT. Aliases are expanded first; everything else is handed
//! to PROJ unchanged apart from trimming and the `+type=crs` fix-up for PROJ strings
//! that are not pipelines.

use crate::context::ThreadContext;
use crate::pj::{Pj, PjCreateError};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A human friendly name for a frequently used CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrsAlias {
    pub name: &'static str,
    pub code: &'static str,
    pub label: &'static str,
}

/// The aliases recognised by [`CrsResolver::resolve`], in catalog order.
pub const COMMON_CRS: &[CrsAlias] = &[
    CrsAlias {
        name: "WGS84",
        code: "EPSG:4326",
        label: "WGS 84, the GPS world geodetic system",
    },
    CrsAlias {
        name: "WebMercator",
        code: "EPSG:3857",
        label: "WGS 84 / Pseudo-Mercator, used by web map tiles",
    },
    CrsAlias {
        name: "CGCS2000",
        code: "EPSG:4490",
        label: "China Geodetic Coordinate System 2000",
    },
    CrsAlias {
        name: "Beijing54",
        code: "EPSG:4214",
        label: "Beijing 1954",
    },
    CrsAlias {
        name: "Xian80",
        code: "EPSG:4610",
        label: "Xian 1980",
    },
];

/// Descriptor formats accepted besides the aliases, each with an example.
pub const DESCRIPTOR_FORMATS: &[(&str, &str)] = &[
    ("Authority code", "EPSG:4326"),
    ("PROJ string", "+proj=longlat +datum=WGS84 +no_defs"),
    (
        "WKT",
        r#"GEOGCRS["WGS 84",DATUM["World Geodetic System 1984",ELLIPSOID["WGS 84",6378137,298.257223563]],CS[ellipsoidal,2],AXIS["longitude",east],AXIS["latitude",north],UNIT["degree",0.0174532925199433]]"#,
    ),
];

/// Look up an alias by its exact name.
pub fn alias(name: &str) -> Option<&'static CrsAlias> {
    COMMON_CRS.iter().find(|alias| alias.name == name)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid CRS '{descriptor}': {reason}")]
pub struct CrsError {
    pub descriptor: String,
    pub reason: String,
}

impl CrsError {
    fn new(descriptor: &str, reason: impl Into<String>) -> Self {
        CrsError {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }
}

/// A resolved coordinate reference system.
///
/// Immutable once created. A `Crs` is consumed by
/// [`TransformerBuilder::build`](crate::TransformerBuilder::build).
pub struct Crs {
    descriptor: String,
    definition: String,
    identifier: Option<String>,
    name: Option<String>,
    pj: Pj,
}

impl Crs {
    /// The descriptor exactly as supplied by the caller.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// The definition handed to PROJ, after alias expansion.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// `AUTHORITY:CODE` when PROJ knows the CRS by an identifier, otherwise the definition.
    pub fn canonical(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.definition)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn pj(&self) -> &Pj {
        &self.pj
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crs")
            .field("descriptor", &self.descriptor)
            .field("canonical", &self.canonical())
            .field("name", &self.name)
            .finish()
    }
}

/// Turns descriptors into [`Crs`] handles.
///
/// Handles resolved by one resolver share its PROJ context and can be combined into a
/// transformer. Resolving has no effect besides creating the handle.
pub struct CrsResolver {
    ctx: Rc<ThreadContext>,
}

impl CrsResolver {
    pub fn new() -> Self {
        CrsResolver::with_context(Rc::new(ThreadContext::new()))
    }

    pub(crate) fn with_context(ctx: Rc<ThreadContext>) -> Self {
        CrsResolver { ctx }
    }

    pub fn resolve(&self, descriptor: &str) -> Result<Crs, CrsError> {
        let definition = definition_for(descriptor)?;
        let pj = Pj::from_definition(Rc::clone(&self.ctx), &definition).map_err(|err| match err {
            PjCreateError::ArgumentNulError(_) => {
                CrsError::new(descriptor, "descriptor contains a nul byte")
            }
            err => CrsError::new(descriptor, err.to_string()),
        })?;
        if !pj.is_crs() {
            return Err(CrsError::new(
                descriptor,
                "definition describes an operation, not a coordinate reference system",
            ));
        }
        let crs = Crs {
            descriptor: descriptor.to_string(),
            identifier: pj.identifier(),
            name: pj.name(),
            definition,
            pj,
        };
        log::debug!("resolved CRS {:?}", crs);
        Ok(crs)
    }
}

impl Default for CrsResolver {
    fn default() -> Self {
        CrsResolver::new()
    }
}

fn definition_for(descriptor: &str) -> Result<String, CrsError> {
    let trimmed = descriptor.trim();
    if trimmed.is_empty() {
        return Err(CrsError::new(descriptor, "descriptor is empty"));
    }
    if let Some(alias) = alias(trimmed) {
        return Ok(alias.code.to_string());
    }
    let is_proj_string = trimmed.starts_with('+') || trimmed.starts_with("proj=");
    if is_proj_string && !trimmed.contains("type=crs") && !trimmed.contains("proj=pipeline") {
        return Ok(format!("{} +type=crs", trimmed));
    }
    Ok(trimmed.to_string())
}
