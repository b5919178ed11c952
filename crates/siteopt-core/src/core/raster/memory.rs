use super::traits::{RasterError, RasterSource};
use crate::core::models::grid::GeoTransform;
use crate::core::models::point::Crs;

/// A raster held entirely in memory, row 0 being the top image row.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRaster {
    width: usize,
    height: usize,
    values: Vec<f64>,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<f64>,
    reads: usize,
}

impl ArrayRaster {
    pub fn new(
        width: usize,
        height: usize,
        values: Vec<f64>,
        transform: GeoTransform,
        crs: Crs,
    ) -> Result<Self, RasterError> {
        if values.len() != width * height {
            return Err(RasterError::InvalidData(format!(
                "expected {} values for a {width}x{height} raster, got {}",
                width * height,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
            transform,
            crs,
            nodata: None,
            reads: 0,
        })
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Number of `read_pixel` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads
    }
}

impl RasterSource for ArrayRaster {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    fn crs(&self) -> Crs {
        self.crs
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn read_pixel(&mut self, col: usize, row: usize) -> Result<f64, RasterError> {
        if col >= self.width || row >= self.height {
            return Err(RasterError::PixelOutOfBounds {
                col,
                row,
                width: self.width,
                height: self.height,
            });
        }
        self.reads += 1;
        Ok(self.values[row * self.width + col])
    }
}
