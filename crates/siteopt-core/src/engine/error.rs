use thiserror::Error;

use super::config::ConfigError;
use crate::core::projection::ProjectionError;
use crate::core::raster::RasterError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Population raster is unavailable: {0}")]
    RasterUnavailable(#[from] RasterError),

    #[error("Coordinate projection failed: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Invalid region: {reason}")]
    InvalidRegion { reason: String },

    #[error(
        "Working grid of {width}x{height} cells exceeds the limit of {max_cells} cells"
    )]
    GridTooLarge {
        width: usize,
        height: usize,
        max_cells: usize,
    },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Deadline exceeded during {phase}")]
    DeadlineExceeded { phase: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_region(reason: impl Into<String>) -> Self {
        EngineError::InvalidRegion {
            reason: reason.into(),
        }
    }
}
