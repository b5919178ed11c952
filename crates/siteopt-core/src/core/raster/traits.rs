use crate::core::models::grid::GeoTransform;
use crate::core::models::point::Crs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to open raster '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode raster: {0}")]
    Decode(String),
    #[error("Raster has no usable georeferencing: {0}")]
    MissingGeoreference(String),
    #[error("Raster CRS could not be determined; configure an explicit CRS override")]
    UnknownCrs,
    #[error("Unsupported raster sample format: {0}")]
    UnsupportedFormat(String),
    #[error("Pixel ({col}, {row}) is outside the {width}x{height} raster")]
    PixelOutOfBounds {
        col: usize,
        row: usize,
        width: usize,
        height: usize,
    },
    #[error("Invalid raster data: {0}")]
    InvalidData(String),
}

/// Read contract for a single-band, georeferenced raster.
///
/// Implementors own their underlying handle and release it when dropped, so a
/// raster is closed on every exit path of a run.
pub trait RasterSource {
    /// Raster size as `(width, height)` in pixels.
    fn dimensions(&self) -> (usize, usize);

    /// Affine mapping from pixel space to the raster's CRS.
    fn geo_transform(&self) -> GeoTransform;

    /// The coordinate reference system of the raster.
    fn crs(&self) -> Crs;

    /// The value marking missing data, if any.
    fn nodata(&self) -> Option<f64>;

    /// Reads one pixel value.
    ///
    /// # Arguments
    ///
    /// * `col` - Zero-based column, counted from the left edge.
    /// * `row` - Zero-based row, counted from the top edge of the image.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::PixelOutOfBounds`] for indices outside the raster and
    /// a decoding error when the underlying data cannot be read.
    fn read_pixel(&mut self, col: usize, row: usize) -> Result<f64, RasterError>;
}

impl<R: RasterSource + ?Sized> RasterSource for Box<R> {
    fn dimensions(&self) -> (usize, usize) {
        (**self).dimensions()
    }

    fn geo_transform(&self) -> GeoTransform {
        (**self).geo_transform()
    }

    fn crs(&self) -> Crs {
        (**self).crs()
    }

    fn nodata(&self) -> Option<f64> {
        (**self).nodata()
    }

    fn read_pixel(&mut self, col: usize, row: usize) -> Result<f64, RasterError> {
        (**self).read_pixel(col, row)
    }
}
