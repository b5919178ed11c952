use siteopt::core::raster::RasterBackend;
use siteopt::engine::config::{RankConfig, SelectionConfig};
use siteopt::workflows::select::RegionInput;
use std::path::PathBuf;

pub struct SelectAppConfig {
    pub raster: RasterBackend,
    pub facilities_path: Option<PathBuf>,
    pub region: Option<RegionInput>,
    pub output_path: PathBuf,
    pub core_config: SelectionConfig,
}

pub struct RankAppConfig {
    pub raster: RasterBackend,
    pub candidates_path: PathBuf,
    pub output_path: PathBuf,
    pub core_config: RankConfig,
}
