use super::config::DemandConfig;
use super::error::EngineError;
use crate::core::models::grid::{Grid, GridGeometry, PopulationGrid};
use crate::core::models::site::FacilitySite;
use tracing::{debug, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Builds the demand map: population minus the blurred influence of existing facilities.
#[derive(Debug, Clone)]
pub struct DemandMapBuilder {
    kernel: Vec<f64>,
    suppression_weight: f64,
}

impl DemandMapBuilder {
    pub fn new(config: &DemandConfig) -> Result<Self, EngineError> {
        let w = config.suppression_weight;
        if !w.is_finite() || w < 0.0 {
            return Err(EngineError::invalid_parameter(
                "suppression_weight",
                format!("must be finite and non-negative, got {w}"),
            ));
        }
        Ok(Self {
            kernel: gaussian_kernel(config.kernel_size, config.sigma)?,
            suppression_weight: w,
        })
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// Accumulates facility weights at the cells containing them. Facilities outside
    /// the grid or in another CRS contribute nothing.
    pub fn suppression_grid(&self, geometry: &GridGeometry, facilities: &[FacilitySite]) -> Grid {
        let mut grid = Grid::zeros(*geometry);
        for facility in facilities {
            let location = facility.location;
            if location.crs() != geometry.crs {
                trace!(crs = %location.crs(), "Ignoring facility outside the working CRS.");
                continue;
            }
            if let Some((col, row)) = geometry.cell_of(location.x(), location.y()) {
                grid.add(col, row, facility.effective_weight());
            }
        }
        grid
    }

    #[instrument(skip_all, name = "demand_map", fields(facilities = facilities.len()))]
    pub fn build(
        &self,
        population: &PopulationGrid,
        facilities: &[FacilitySite],
    ) -> Result<Grid, EngineError> {
        let suppression = self.suppression_grid(population.geometry(), facilities);
        if suppression.values().iter().all(|v| *v == 0.0) {
            debug!("No existing facility inside the grid; demand equals population.");
            return Ok(clamp_non_negative(population.clone()));
        }

        let blurred = gaussian_blur(&suppression, &self.kernel);
        let w = self.suppression_weight;
        let values = population
            .values()
            .iter()
            .zip(blurred.values())
            .map(|(pop, supp)| (pop - w * supp).max(0.0))
            .collect();
        let demand = Grid::from_values(*population.geometry(), values)
            .ok_or_else(|| EngineError::Internal("demand grid size mismatch".to_string()))?;

        debug!(
            population = population.sum(),
            demand = demand.sum(),
            "Demand map built."
        );
        Ok(demand)
    }
}

fn clamp_non_negative(mut grid: Grid) -> Grid {
    for v in grid.values_mut() {
        if v.is_nan() || *v < 0.0 {
            *v = 0.0;
        }
    }
    grid
}

/// Normalized 1-D Gaussian of odd length `size`.
///
/// A non-positive `sigma` is derived from the size as `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Result<Vec<f64>, EngineError> {
    if size == 0 || size % 2 == 0 {
        return Err(EngineError::invalid_parameter(
            "kernel_size",
            format!("must be odd and positive, got {size}"),
        ));
    }
    if !sigma.is_finite() {
        return Err(EngineError::invalid_parameter(
            "sigma",
            format!("must be finite, got {sigma}"),
        ));
    }
    let sigma = if sigma <= 0.0 {
        0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    } else {
        sigma
    };

    let center = (size / 2) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    Ok(raw.into_iter().map(|v| v / total).collect())
}

/// Mirrors an out-of-range index without repeating the edge sample (`gfedcb|abcdefgh|gfedcba`).
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let i = index.rem_euclid(period);
    if i >= len as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}

fn convolve_row(input: &[f64], output: &mut [f64], kernel: &[f64]) {
    let radius = (kernel.len() / 2) as isize;
    let len = input.len();
    for (x, out) in output.iter_mut().enumerate() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let src = reflect_101(x as isize + k as isize - radius, len);
                weight * input[src]
            })
            .sum();
    }
}

/// Separable convolution with `kernel` along both axes, reflect-101 borders.
pub fn gaussian_blur(grid: &Grid, kernel: &[f64]) -> Grid {
    let width = grid.width();
    let height = grid.height();
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0.0; width * height];
    #[cfg(feature = "parallel")]
    let rows = horizontal.par_chunks_mut(width);
    #[cfg(not(feature = "parallel"))]
    let rows = horizontal.chunks_mut(width);
    rows.enumerate().for_each(|(y, out)| {
        convolve_row(&grid.values()[y * width..(y + 1) * width], out, kernel);
    });

    let mut vertical = vec![0.0; width * height];
    #[cfg(feature = "parallel")]
    let rows = vertical.par_chunks_mut(width);
    #[cfg(not(feature = "parallel"))]
    let rows = vertical.chunks_mut(width);
    rows.enumerate().for_each(|(y, out)| {
        for (k, weight) in kernel.iter().enumerate() {
            let src_row = reflect_101(y as isize + k as isize - radius, height);
            let src = &horizontal[src_row * width..(src_row + 1) * width];
            for (o, s) in out.iter_mut().zip(src) {
                *o += weight * s;
            }
        }
    });

    let mut blurred = Grid::zeros(*grid.geometry());
    blurred.values_mut().copy_from_slice(&vertical);
    blurred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::point::{Crs, GeoPoint};

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn geometry(width: usize, height: usize) -> GridGeometry {
        GridGeometry::new(width, height, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE)
    }

    fn facility(x: f64, y: f64) -> FacilitySite {
        FacilitySite::new(GeoPoint::new(x, y, Crs::WORLD_MOLLWEIDE))
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(15, 3.0).unwrap();
        assert_eq!(kernel.len(), 15);
        assert!(approx_eq(kernel.iter().sum::<f64>(), 1.0, 1e-12));
        for i in 0..7 {
            assert!(approx_eq(kernel[i], kernel[14 - i], 1e-15));
        }
        assert!(kernel[7] > kernel[6]);
    }

    #[test]
    fn even_or_zero_kernel_size_is_rejected() {
        for size in [0, 4, 14] {
            assert!(matches!(
                gaussian_kernel(size, 3.0),
                Err(EngineError::InvalidParameter {
                    name: "kernel_size",
                    ..
                })
            ));
        }
    }

    #[test]
    fn non_positive_sigma_is_derived_from_size() {
        let derived = gaussian_kernel(7, 0.0).unwrap();
        let explicit = gaussian_kernel(7, 0.3 * (3.0 - 1.0) + 0.8).unwrap();
        for (a, b) in derived.iter().zip(&explicit) {
            assert!(approx_eq(*a, *b, 1e-15));
        }
    }

    #[test]
    fn reflect_101_mirrors_without_repeating_edges() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-7, 1), 0);
        assert_eq!(reflect_101(-1, 2), 1);
        assert_eq!(reflect_101(2, 2), 0);
    }

    #[test]
    fn blur_preserves_mass_away_from_borders() {
        let mut grid = Grid::zeros(geometry(21, 21));
        grid.set(10, 10, 1.0);
        let blurred = gaussian_blur(&grid, &gaussian_kernel(5, 1.0).unwrap());
        assert!(approx_eq(blurred.sum(), 1.0, 1e-12));
        assert!(blurred.get(10, 10) > blurred.get(11, 10));
        assert!(approx_eq(blurred.get(11, 10), blurred.get(9, 10), 1e-15));
    }

    #[test]
    fn suppression_grid_accumulates_weights_inside_grid_only() {
        let builder = DemandMapBuilder::new(&DemandConfig::default()).unwrap();
        let facilities = vec![
            facility(2.5, 2.5),
            facility(2.7, 2.2),
            facility(0.5, 0.5).with_weight(3.0),
            facility(50.0, 50.0),
            FacilitySite::new(GeoPoint::lon_lat(2.5, 2.5)),
        ];
        let grid = builder.suppression_grid(&geometry(5, 5), &facilities);
        assert_eq!(grid.get(2, 2), 2.0);
        assert_eq!(grid.get(0, 0), 3.0);
        assert_eq!(grid.sum(), 5.0);
    }

    #[test]
    fn demand_is_population_minus_blurred_influence_and_never_negative() {
        let builder = DemandMapBuilder::new(&DemandConfig {
            kernel_size: 3,
            sigma: 1.0,
            suppression_weight: 0.5,
        })
        .unwrap();
        let mut population = Grid::zeros(geometry(7, 7));
        for v in population.values_mut() {
            *v = 0.01;
        }
        population.set(6, 6, 100.0);

        let demand = builder.build(&population, &[facility(3.5, 3.5)]).unwrap();
        assert!(demand.values().iter().all(|v| *v >= 0.0));
        assert_eq!(demand.get(3, 3), 0.0);
        assert_eq!(demand.get(6, 6), 100.0);
    }

    #[test]
    fn without_facilities_demand_equals_population() {
        let builder = DemandMapBuilder::new(&DemandConfig::default()).unwrap();
        let mut population = Grid::zeros(geometry(3, 3));
        population.set(1, 1, 42.0);
        let demand = builder.build(&population, &[]).unwrap();
        assert_eq!(demand, population);
    }

    #[test]
    fn negative_facility_weight_never_raises_demand_above_population() {
        let builder = DemandMapBuilder::new(&DemandConfig {
            kernel_size: 3,
            sigma: 1.0,
            suppression_weight: 0.5,
        })
        .unwrap();
        let mut population = Grid::zeros(geometry(5, 5));
        for v in population.values_mut() {
            *v = 2.0;
        }

        let demand = builder
            .build(&population, &[facility(2.5, 2.5).with_weight(-10.0)])
            .unwrap();
        assert_eq!(demand, population);
    }

    #[test]
    fn negative_suppression_weight_is_rejected() {
        let config = DemandConfig {
            suppression_weight: -1.0,
            ..DemandConfig::default()
        };
        assert!(DemandMapBuilder::new(&config).is_err());
    }
}
