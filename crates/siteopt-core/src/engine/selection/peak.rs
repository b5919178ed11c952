use super::separation::filter_by_separation;
use super::{Candidate, SelectionInput, SelectionOutcome, SiteSelector};
use crate::core::models::grid::GridGeometry;
use crate::engine::config::{PeakConfig, SuppressionMode};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::SelectionWarning;
use tracing::{debug, instrument, warn};

/// Residual fraction kept by a neighbour at distance zero under soft decay.
const SOFT_DECAY_FLOOR: f64 = 0.1;

/// Greedy iterative peak suppression.
///
/// Repeatedly takes the highest remaining cell and lowers its neighbourhood. Ties
/// are broken by row-major scan order (row 0 first, then columns left to right).
#[derive(Debug, Clone)]
pub struct PeakSuppressionSelector {
    config: PeakConfig,
}

impl PeakSuppressionSelector {
    pub fn new(config: PeakConfig) -> Self {
        Self { config }
    }
}

impl SiteSelector for PeakSuppressionSelector {
    fn name(&self) -> &'static str {
        "peak-suppression"
    }

    #[instrument(skip_all, name = "peak_suppression", fields(count = input.count, min_distance = input.min_distance))]
    fn select(
        &mut self,
        input: &SelectionInput<'_>,
        reporter: &ProgressReporter,
    ) -> Result<SelectionOutcome, EngineError> {
        let mut outcome = SelectionOutcome::empty();
        let demand = input.demand;
        let geometry = demand.geometry();
        let width = geometry.width;

        let max = demand.max_value();
        if max.is_nan() || max <= 0.0 || input.count == 0 {
            debug!(max, "Nothing to select.");
            return Ok(outcome);
        }

        let mut work: Vec<f64> = demand
            .iter_cells()
            .map(|(col, row, v)| {
                if input.is_eligible(col, row) {
                    v / max
                } else {
                    0.0
                }
            })
            .collect();

        reporter.report(Progress::TaskStart {
            total_steps: input.count as u64,
            unit: "sites",
        });
        let mut picks = Vec::with_capacity(input.count);
        for _ in 0..input.count {
            input.deadline.check("peak search")?;
            let Some((index, value)) = first_maximum(&work) else {
                break;
            };
            if value <= self.config.epsilon {
                debug!(remaining = value, "Remaining demand below epsilon; stopping.");
                break;
            }
            let (col, row) = (index % width, index / width);
            let (x, y) = geometry.cell_center(col, row);
            picks.push(Candidate::new(x, y, value * max));

            suppress(
                &mut work,
                geometry,
                col,
                row,
                input.min_distance,
                self.config.suppression,
            );
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);

        if self.config.enforce_separation {
            let (kept, dropped) = filter_by_separation(picks, input.existing, input.min_distance);
            if dropped > 0 {
                warn!(dropped, "Dropped peaks closer than the minimum distance.");
                outcome
                    .warnings
                    .push(SelectionWarning::SeparationFiltered { dropped });
            }
            outcome.candidates = kept;
        } else {
            outcome.candidates = picks;
        }

        debug!(selected = outcome.candidates.len(), "Peak search complete.");
        Ok(outcome)
    }
}

/// Index and value of the first strictly greatest element.
fn first_maximum(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}

fn suppress(
    work: &mut [f64],
    geometry: &GridGeometry,
    col: usize,
    row: usize,
    min_distance: f64,
    mode: SuppressionMode,
) {
    let width = geometry.width;
    work[row * width + col] = 0.0;
    if min_distance.is_nan() || min_distance <= 0.0 {
        return;
    }

    let reach_x = (min_distance / geometry.cell_width).ceil();
    let reach_y = (min_distance / geometry.cell_height).ceil();
    let col_lo = (col as f64 - reach_x).max(0.0) as usize;
    let col_hi = (col as f64 + reach_x).min((width - 1) as f64) as usize;
    let row_lo = (row as f64 - reach_y).max(0.0) as usize;
    let row_hi = (row as f64 + reach_y).min((geometry.height - 1) as f64) as usize;

    for r in row_lo..=row_hi {
        let dy = (r as f64 - row as f64) * geometry.cell_height;
        for c in col_lo..=col_hi {
            let dx = (c as f64 - col as f64) * geometry.cell_width;
            let d = dx.hypot(dy);
            let cell = &mut work[r * width + c];
            match mode {
                SuppressionMode::SoftDecay => {
                    if d < min_distance {
                        *cell *= 1.0 - (1.0 - SOFT_DECAY_FLOOR) * (1.0 - d / min_distance);
                    }
                }
                SuppressionMode::HardZero => {
                    if d <= min_distance {
                        *cell = 0.0;
                    }
                }
            }
        }
    }
}
