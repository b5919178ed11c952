use super::grid_plan::GridPlan;
use crate::core::models::site::ScoredSite;
use std::fmt;

/// A non-fatal condition recorded during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionWarning {
    /// An input facility could not be projected and was left out.
    SkippedFacility { index: usize, reason: String },
    /// Distance repair hit its pass limit with violations remaining.
    RepairNotConverged { passes: usize },
    /// Fewer cluster seeds than requested could be placed.
    SeedingShortfall { requested: usize, seeded: usize },
    /// The cell size was enlarged to respect the cell budget.
    GridRescaled { from: f64, to: f64 },
    /// Demand was zero everywhere; nothing to propose.
    NoViableSites,
    /// A repaired centroid ended up outside the region.
    CentroidOutsideRegion { index: usize },
    /// Sites dropped by the minimum-separation filter.
    SeparationFiltered { dropped: usize },
    /// Cluster centroids left without demand after k-means, so not proposed.
    EmptyClustersDropped { dropped: usize },
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionWarning::SkippedFacility { index, reason } => {
                write!(f, "facility #{index} skipped: {reason}")
            }
            SelectionWarning::RepairNotConverged { passes } => write!(
                f,
                "minimum-distance repair did not converge after {passes} passes"
            ),
            SelectionWarning::SeedingShortfall { requested, seeded } => write!(
                f,
                "only {seeded} of {requested} cluster seeds could be placed"
            ),
            SelectionWarning::GridRescaled { from, to } => {
                write!(f, "cell size enlarged from {from} to {to} to fit the cell budget")
            }
            SelectionWarning::NoViableSites => write!(f, "no cell has positive demand"),
            SelectionWarning::CentroidOutsideRegion { index } => {
                write!(f, "site #{index} lies outside the region after repair")
            }
            SelectionWarning::SeparationFiltered { dropped } => write!(
                f,
                "{dropped} site(s) dropped for violating the minimum distance"
            ),
            SelectionWarning::EmptyClustersDropped { dropped } => {
                write!(f, "{dropped} cluster(s) ended with no demand and were dropped")
            }
        }
    }
}

/// Output of a selection or ranking run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    /// Sites in the public CRS, best first.
    pub sites: Vec<ScoredSite>,
    pub warnings: Vec<SelectionWarning>,
    /// `false` when distance repair gave up with violations remaining.
    pub converged: bool,
    /// The working grid actually used; `None` when the run ended before planning one.
    pub grid: Option<GridPlan>,
}

impl SelectionResult {
    pub fn empty() -> Self {
        Self {
            sites: Vec::new(),
            warnings: Vec::new(),
            converged: true,
            grid: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn has_warning(&self, predicate: impl Fn(&SelectionWarning) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }
}

impl Default for SelectionResult {
    fn default() -> Self {
        Self::empty()
    }
}
