use super::deadline::Deadline;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::grid::{GeoTransform, GridGeometry, PopulationGrid};
use crate::core::models::point::Crs;
use crate::core::models::region::PolygonTest;
use crate::core::projection::{CoordTransformer, SpatialProjector};
use crate::core::raster::RasterSource;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Rows whose pixel indices are resolved together before being read.
const BAND_ROWS: usize = 64;

type PixelIndex = Option<(usize, usize)>;

/// Resamples a population raster onto a working grid by nearest-pixel lookup at
/// each cell centre.
pub struct RasterSampler<'a> {
    projector: &'a SpatialProjector,
}

impl<'a> RasterSampler<'a> {
    pub fn new(projector: &'a SpatialProjector) -> Self {
        Self { projector }
    }

    /// Fills a grid with the raster value under each cell centre.
    ///
    /// Values are sanitized to `>= 0`: nodata, NaN, negative values, pixels outside
    /// the raster and centres outside `clip` all become `0`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Projection`] when the raster CRS is unsupported,
    /// [`EngineError::RasterUnavailable`] when a pixel read fails and
    /// [`EngineError::DeadlineExceeded`] when the budget runs out mid-way.
    #[instrument(skip_all, name = "raster_sampling", fields(width = geometry.width, height = geometry.height))]
    pub fn sample<R: RasterSource + ?Sized>(
        &self,
        raster: &mut R,
        geometry: &GridGeometry,
        clip: Option<&(dyn PolygonTest + Sync)>,
        deadline: &Deadline,
        reporter: &ProgressReporter,
    ) -> Result<PopulationGrid, EngineError> {
        let raster_crs = raster.crs();
        let (raster_width, raster_height) = raster.dimensions();
        let transform = raster.geo_transform();
        let nodata = raster.nodata();

        // Fails early on an unsupported raster CRS.
        let transformer = self.projector.transformer(geometry.crs, raster_crs)?;
        info!(
            raster_crs = %raster_crs,
            reproject = !transformer.is_identity(),
            "Sampling population raster onto the working grid."
        );

        let mapper = PixelMapper {
            geometry,
            clip,
            source: geometry.crs,
            target: raster_crs,
            transform,
            raster_width,
            raster_height,
        };

        let mut grid = PopulationGrid::zeros(*geometry);
        reporter.report(Progress::TaskStart {
            total_steps: geometry.height as u64,
            unit: "rows",
        });

        let mut band_start = 0;
        while band_start < geometry.height {
            let band_end = (band_start + BAND_ROWS).min(geometry.height);
            deadline.check("sampling")?;
            let band = mapper.map_rows(band_start..band_end, &transformer);

            for (offset, row_pixels) in band.into_iter().enumerate() {
                let row = band_start + offset;
                deadline.check("sampling")?;
                for (col, pixel) in row_pixels.into_iter().enumerate() {
                    let Some((px, py)) = pixel else { continue };
                    let raw = raster.read_pixel(px, py)?;
                    grid.set(col, row, sanitize(raw, nodata));
                }
                reporter.report(Progress::TaskIncrement);
            }
            band_start = band_end;
        }

        reporter.report(Progress::TaskFinish);
        debug!(
            populated_cells = grid.values().iter().filter(|v| **v > 0.0).count(),
            total_population = grid.sum(),
            "Raster sampling complete."
        );
        Ok(grid)
    }
}

struct PixelMapper<'g> {
    geometry: &'g GridGeometry,
    clip: Option<&'g (dyn PolygonTest + Sync)>,
    source: Crs,
    target: Crs,
    transform: GeoTransform,
    raster_width: usize,
    raster_height: usize,
}

impl PixelMapper<'_> {
    #[cfg(feature = "parallel")]
    fn map_rows(
        &self,
        rows: std::ops::Range<usize>,
        _transformer: &CoordTransformer,
    ) -> Vec<Vec<PixelIndex>> {
        rows.into_par_iter()
            .map_init(
                || CoordTransformer::new(self.source, self.target).ok(),
                |transformer, row| match transformer {
                    Some(t) => self.map_row(row, t),
                    None => vec![None; self.geometry.width],
                },
            )
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn map_rows(
        &self,
        rows: std::ops::Range<usize>,
        transformer: &CoordTransformer,
    ) -> Vec<Vec<PixelIndex>> {
        rows.map(|row| self.map_row(row, transformer)).collect()
    }

    fn map_row(&self, row: usize, transformer: &CoordTransformer) -> Vec<PixelIndex> {
        (0..self.geometry.width)
            .map(|col| {
                let (x, y) = self.geometry.cell_center(col, row);
                if let Some(clip) = self.clip {
                    if !clip.contains_point(x, y) {
                        return None;
                    }
                }
                // Centres outside the projection domain count as outside the raster.
                let (rx, ry) = transformer.transform(x, y).ok()?;
                let (px, py) = self.transform.pixel_index(rx, ry)?;
                if px < 0 || py < 0 {
                    return None;
                }
                let (px, py) = (px as usize, py as usize);
                (px < self.raster_width && py < self.raster_height).then_some((px, py))
            })
            .collect()
    }
}

fn sanitize(value: f64, nodata: Option<f64>) -> f64 {
    let is_nodata = nodata.is_some_and(|nd| value == nd || (nd.is_nan() && value.is_nan()));
    if is_nodata || !value.is_finite() || value < 0.0 {
        0.0
    } else {
        value
    }
}
