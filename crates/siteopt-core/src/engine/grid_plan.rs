use super::config::GridConfig;
use super::error::EngineError;
use crate::core::models::grid::GridGeometry;
use crate::core::models::point::Crs;
use crate::core::models::region::Envelope;
use tracing::{debug, warn};

const RESCALE_GROWTH: f64 = 1.01;
const MAX_RESCALE_STEPS: usize = 10_000;

/// The working grid chosen for an envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    pub geometry: GridGeometry,
    pub requested_cell_size: f64,
}

impl GridPlan {
    pub fn cell_size(&self) -> f64 {
        self.geometry.cell_width
    }

    pub fn was_rescaled(&self) -> bool {
        self.geometry.cell_width != self.requested_cell_size
    }
}

fn dimensions(envelope: &Envelope, cell_size: f64) -> (f64, f64) {
    let width = (envelope.width() / cell_size).ceil().max(1.0);
    let height = (envelope.height() / cell_size).ceil().max(1.0);
    (width, height)
}

/// Covers `envelope` with square cells, enlarging the cell size when the cell
/// count would exceed `config.max_cells`. The envelope is never truncated.
pub fn plan_grid(envelope: &Envelope, crs: Crs, config: &GridConfig) -> Result<GridPlan, EngineError> {
    let requested = config.cell_size;
    if !requested.is_finite() || requested <= 0.0 {
        return Err(EngineError::invalid_parameter(
            "cell_size",
            format!("must be positive and finite, got {requested}"),
        ));
    }
    if !envelope.is_finite() {
        return Err(EngineError::invalid_region("region envelope is not finite"));
    }

    let max_cells = config.max_cells as f64;
    let (width, height) = dimensions(envelope, requested);
    let mut cell_size = requested;

    if width * height > max_cells {
        if !config.auto_rescale || config.max_cells == 0 {
            return Err(too_large(width, height, config.max_cells));
        }

        cell_size = requested * (width * height / max_cells).sqrt();
        let mut steps = 0;
        loop {
            let (w, h) = dimensions(envelope, cell_size);
            if w * h <= max_cells {
                break;
            }
            if steps >= MAX_RESCALE_STEPS {
                return Err(too_large(w, h, config.max_cells));
            }
            cell_size *= RESCALE_GROWTH;
            steps += 1;
        }
        warn!(
            from = requested,
            to = cell_size,
            max_cells = config.max_cells,
            "Requested cell size exceeds the cell budget; enlarging cells."
        );
    }

    let (width, height) = dimensions(envelope, cell_size);
    let geometry = GridGeometry::new(
        width as usize,
        height as usize,
        envelope.min_x,
        envelope.min_y,
        cell_size,
        crs,
    );
    debug!(
        width = geometry.width,
        height = geometry.height,
        cell_size,
        "Planned working grid."
    );
    Ok(GridPlan {
        geometry,
        requested_cell_size: requested,
    })
}

fn too_large(width: f64, height: f64, max_cells: usize) -> EngineError {
    EngineError::GridTooLarge {
        width: width.min(usize::MAX as f64) as usize,
        height: height.min(usize::MAX as f64) as usize,
        max_cells,
    }
}
