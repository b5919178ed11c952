//! Site-selection strategies operating on a demand grid in the working CRS.
//!
//! Both strategies implement [`SiteSelector`] and are chosen explicitly through
//! [`Strategy`](crate::engine::config::Strategy):
//!
//! - [`peak`] - greedy iterative peak suppression
//! - [`cluster`] - weighted k-means followed by minimum-distance [`repair`]
//!
//! [`ranking`] scores externally supplied candidates instead of proposing new ones.

pub mod cluster;
pub mod peak;
pub mod ranking;
pub mod repair;
pub mod separation;

use super::config::{SelectionConfig, Strategy};
use super::deadline::Deadline;
use super::error::EngineError;
use super::progress::ProgressReporter;
use super::state::SelectionWarning;
use crate::core::models::grid::Grid;
use crate::core::models::region::PolygonTest;
use nalgebra::Point2;

/// A proposed site in working coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub position: Point2<f64>,
    pub score: f64,
}

impl Candidate {
    pub fn new(x: f64, y: f64, score: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            score,
        }
    }
}

/// Everything a strategy needs; all coordinates are in the working CRS.
pub struct SelectionInput<'a> {
    pub demand: &'a Grid,
    pub count: usize,
    pub min_distance: f64,
    pub clip: Option<&'a (dyn PolygonTest + Sync)>,
    pub existing: &'a [Point2<f64>],
    pub deadline: Deadline,
}

impl SelectionInput<'_> {
    /// Whether the centre of cell `(col, row)` may host a site.
    pub fn is_eligible(&self, col: usize, row: usize) -> bool {
        match self.clip {
            Some(clip) => {
                let (x, y) = self.demand.geometry().cell_center(col, row);
                clip.contains_point(x, y)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOutcome {
    /// Best first.
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<SelectionWarning>,
    pub converged: bool,
}

impl SelectionOutcome {
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            warnings: Vec::new(),
            converged: true,
        }
    }
}

pub trait SiteSelector {
    fn name(&self) -> &'static str;

    /// Proposes up to `input.count` sites.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DeadlineExceeded`] when the run budget is exhausted and
    /// [`EngineError::InvalidParameter`] for unusable strategy settings.
    fn select(
        &mut self,
        input: &SelectionInput<'_>,
        reporter: &ProgressReporter,
    ) -> Result<SelectionOutcome, EngineError>;
}

/// Builds the strategy named by `config.strategy`.
pub fn selector_for(config: &SelectionConfig) -> Box<dyn SiteSelector> {
    match config.strategy {
        Strategy::PeakSuppression => Box::new(peak::PeakSuppressionSelector::new(config.peak.clone())),
        Strategy::WeightedClustering => Box::new(cluster::WeightedClusteringSelector::from_config(
            config.cluster.clone(),
        )),
    }
}
