use crate::error::{CliError, Result};
use serde::Deserialize;
use siteopt::core::models::point::Crs;
use siteopt::core::raster::RasterBackend;
use siteopt::engine::config::{Strategy, SuppressionMode};
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSelectionConfig {
    pub count: Option<usize>,
    pub min_distance: Option<f64>,
    pub strategy: Option<Strategy>,
    /// Region of interest as WKT.
    pub region: Option<String>,
    pub top_n: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileGridConfig {
    pub cell_size: Option<f64>,
    pub max_cells: Option<usize>,
    pub auto_rescale: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDemandConfig {
    pub kernel_size: Option<usize>,
    pub sigma: Option<f64>,
    pub suppression_weight: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePeakConfig {
    pub suppression: Option<SuppressionMode>,
    pub epsilon: Option<f64>,
    pub enforce_separation: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileClusterConfig {
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
    pub max_repair_passes: Option<usize>,
    pub max_seed_attempts: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCrsConfig {
    pub working: Option<Crs>,
    pub public: Option<Crs>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLimitsConfig {
    /// Wall-clock budget for a whole run.
    pub deadline_seconds: Option<f64>,
}

/// The TOML configuration file. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub selection: Option<FileSelectionConfig>,
    pub grid: Option<FileGridConfig>,
    pub demand: Option<FileDemandConfig>,
    pub peak: Option<FilePeakConfig>,
    pub cluster: Option<FileClusterConfig>,
    pub crs: Option<FileCrsConfig>,
    pub raster: Option<RasterBackend>,
    pub limits: Option<FileLimitsConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
