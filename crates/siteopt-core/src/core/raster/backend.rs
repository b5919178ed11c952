use super::geotiff::GeoTiffRaster;
use super::traits::{RasterError, RasterSource};
use crate::core::models::point::Crs;
use serde::Deserialize;
use std::path::PathBuf;

/// Selects and opens a raster backend from configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum RasterBackend {
    GeoTiff {
        path: PathBuf,
        /// Forces the raster CRS instead of reading it from the GeoKey directory.
        #[serde(default)]
        crs: Option<Crs>,
    },
}

impl RasterBackend {
    pub fn geotiff(path: impl Into<PathBuf>) -> Self {
        RasterBackend::GeoTiff {
            path: path.into(),
            crs: None,
        }
    }

    pub fn open(&self) -> Result<Box<dyn RasterSource>, RasterError> {
        match self {
            RasterBackend::GeoTiff { path, crs } => {
                Ok(Box::new(GeoTiffRaster::open(path, *crs)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_missing_geotiff_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RasterBackend::geotiff(dir.path().join("missing.tif"));
        assert!(matches!(backend.open(), Err(RasterError::Open { .. })));
    }
}
