use crate::core::models::point::Crs;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Which site-selection algorithm a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Greedy iterative peak suppression.
    PeakSuppression,
    /// Weighted k-means followed by minimum-distance repair.
    WeightedClustering,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::PeakSuppression => "peak-suppression",
            Strategy::WeightedClustering => "weighted-clustering",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peak-suppression" | "peak" => Ok(Strategy::PeakSuppression),
            "weighted-clustering" | "cluster" | "kmeans" => Ok(Strategy::WeightedClustering),
            _ => Err(ConfigError::UnknownVariant {
                kind: "strategy",
                value: s.to_string(),
            }),
        }
    }
}

/// How a chosen peak lowers its neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressionMode {
    /// Chosen cell zeroed, neighbours within the minimum distance linearly damped.
    #[default]
    SoftDecay,
    /// Every cell within the minimum distance zeroed.
    HardZero,
}

impl FromStr for SuppressionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft-decay" | "soft" => Ok(SuppressionMode::SoftDecay),
            "hard-zero" | "hard" => Ok(SuppressionMode::HardZero),
            _ => Err(ConfigError::UnknownVariant {
                kind: "suppression mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Requested cell edge length in working-CRS units (meters).
    pub cell_size: f64,
    pub max_cells: usize,
    /// Enlarge the cell size instead of failing when `max_cells` would be exceeded.
    pub auto_rescale: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 100.0,
            max_cells: 4_000_000,
            auto_rescale: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandConfig {
    /// Gaussian kernel size in cells; must be odd.
    pub kernel_size: usize,
    /// Gaussian standard deviation in cells; `<= 0` derives it from the kernel size.
    pub sigma: f64,
    pub suppression_weight: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            kernel_size: 15,
            sigma: 3.0,
            suppression_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakConfig {
    pub suppression: SuppressionMode,
    /// Normalized demand at or below which the search stops.
    pub epsilon: f64,
    pub enforce_separation: bool,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            suppression: SuppressionMode::SoftDecay,
            epsilon: 1e-9,
            enforce_separation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub max_iterations: usize,
    /// Largest centroid move (working units) still counted as converged.
    pub tolerance: f64,
    pub max_repair_passes: usize,
    pub max_seed_attempts: usize,
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 0.05,
            max_repair_passes: 1000,
            max_seed_attempts: 64,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrsConfig {
    pub working: Crs,
    pub public: Crs,
}

impl Default for CrsConfig {
    fn default() -> Self {
        Self {
            working: Crs::WORLD_MOLLWEIDE,
            public: Crs::WGS84,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub count: usize,
    /// Minimum distance between facilities, in working-CRS units.
    pub min_distance: f64,
    pub strategy: Strategy,
    pub grid: GridConfig,
    pub demand: DemandConfig,
    pub peak: PeakConfig,
    pub cluster: ClusterConfig,
    pub crs: CrsConfig,
    pub deadline: Option<Duration>,
}

#[derive(Default)]
pub struct SelectionConfigBuilder {
    count: Option<usize>,
    min_distance: Option<f64>,
    strategy: Option<Strategy>,
    grid: GridConfig,
    demand: DemandConfig,
    peak: PeakConfig,
    cluster: ClusterConfig,
    crs: CrsConfig,
    deadline: Option<Duration>,
}

impl SelectionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
    pub fn min_distance(mut self, distance: f64) -> Self {
        self.min_distance = Some(distance);
        self
    }
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn cell_size(mut self, size: f64) -> Self {
        self.grid.cell_size = size;
        self
    }
    pub fn max_cells(mut self, max_cells: usize) -> Self {
        self.grid.max_cells = max_cells;
        self
    }
    pub fn auto_rescale(mut self, enabled: bool) -> Self {
        self.grid.auto_rescale = enabled;
        self
    }
    pub fn demand(mut self, demand: DemandConfig) -> Self {
        self.demand = demand;
        self
    }
    pub fn peak(mut self, peak: PeakConfig) -> Self {
        self.peak = peak;
        self
    }
    pub fn cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.cluster.seed = Some(seed);
        self
    }
    pub fn working_crs(mut self, crs: Crs) -> Self {
        self.crs.working = crs;
        self
    }
    pub fn public_crs(mut self, crs: Crs) -> Self {
        self.crs.public = crs;
        self
    }
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<SelectionConfig, ConfigError> {
        Ok(SelectionConfig {
            count: self.count.ok_or(ConfigError::MissingParameter("count"))?,
            min_distance: self
                .min_distance
                .ok_or(ConfigError::MissingParameter("min_distance"))?,
            strategy: self
                .strategy
                .ok_or(ConfigError::MissingParameter("strategy"))?,
            grid: self.grid,
            demand: self.demand,
            peak: self.peak,
            cluster: self.cluster,
            crs: self.crs,
            deadline: self.deadline,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankConfig {
    pub top_n: usize,
    pub min_distance: f64,
    pub grid: GridConfig,
    pub crs: CrsConfig,
    pub deadline: Option<Duration>,
}

#[derive(Default)]
pub struct RankConfigBuilder {
    top_n: Option<usize>,
    min_distance: Option<f64>,
    grid: GridConfig,
    crs: CrsConfig,
    deadline: Option<Duration>,
}

impl RankConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }
    pub fn min_distance(mut self, distance: f64) -> Self {
        self.min_distance = Some(distance);
        self
    }
    pub fn cell_size(mut self, size: f64) -> Self {
        self.grid.cell_size = size;
        self
    }
    pub fn max_cells(mut self, max_cells: usize) -> Self {
        self.grid.max_cells = max_cells;
        self
    }
    pub fn auto_rescale(mut self, enabled: bool) -> Self {
        self.grid.auto_rescale = enabled;
        self
    }
    pub fn working_crs(mut self, crs: Crs) -> Self {
        self.crs.working = crs;
        self
    }
    pub fn public_crs(mut self, crs: Crs) -> Self {
        self.crs.public = crs;
        self
    }
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<RankConfig, ConfigError> {
        Ok(RankConfig {
            top_n: self.top_n.ok_or(ConfigError::MissingParameter("top_n"))?,
            min_distance: self
                .min_distance
                .ok_or(ConfigError::MissingParameter("min_distance"))?,
            grid: self.grid,
            crs: self.crs,
            deadline: self.deadline,
        })
    }
}
