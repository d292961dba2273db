use thiserror::Error;

use crate::crs::CrsError;
use crate::document::DocumentError;
use crate::geometry::GeometryError;
use crate::transform::{PointTransformError, TransformerInitError};

/// Any failure of the crate's public operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    InvalidCrs(#[from] CrsError),
    #[error(transparent)]
    TransformerInit(#[from] TransformerInitError),
    #[error(transparent)]
    PointTransform(#[from] PointTransformError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("configuration error: {0}")]
    Config(String),
}
