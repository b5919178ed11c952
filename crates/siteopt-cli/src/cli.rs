use clap::{Args, Parser, Subcommand};
use siteopt::engine::config::Strategy;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "SITEOPT Developers",
    version,
    about = "SITEOPT CLI - choose where new point facilities should go, driven by a population-density raster.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of worker threads for raster sampling and blurring.
    /// Defaults to the number of logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Propose new facility sites from a population raster.
    Select(SelectArgs),
    /// Rank given candidate sites by the population they reach.
    Rank(RankArgs),
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    // --- Inputs and outputs ---
    /// Population raster (GeoTIFF). Overrides `[raster]` in the config file.
    #[arg(short, long, value_name = "PATH")]
    pub raster: Option<PathBuf>,

    /// Output CSV for the proposed sites.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// CSV of existing facilities (columns: name, id, and wkt or lon/lat).
    #[arg(short, long, value_name = "PATH")]
    pub facilities: Option<PathBuf>,

    /// Region of interest as WKT, e.g. 'POLYGON((...))' or 'SRID=3035;POLYGON((...))'.
    #[arg(long, value_name = "WKT", conflicts_with = "region_file")]
    pub region: Option<String>,

    /// File holding the region of interest as WKT.
    #[arg(long, value_name = "PATH")]
    pub region_file: Option<PathBuf>,

    /// Configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Selection overrides ---
    /// Selection strategy: 'peak-suppression' or 'weighted-clustering'.
    #[arg(short, long, value_name = "NAME")]
    pub strategy: Option<Strategy>,

    /// Number of sites to propose.
    #[arg(short = 'n', long, value_name = "INT")]
    pub count: Option<usize>,

    /// Minimum distance between facilities, in meters of the working CRS.
    #[arg(short = 'd', long, value_name = "FLOAT")]
    pub min_distance: Option<f64>,

    /// Working grid cell size in meters.
    #[arg(long, value_name = "FLOAT")]
    pub cell_size: Option<f64>,

    /// Fixed seed for the clustering strategy.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Set a configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S demand.sigma=2.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    /// Population raster (GeoTIFF). Overrides `[raster]` in the config file.
    #[arg(short, long, value_name = "PATH")]
    pub raster: Option<PathBuf>,

    /// CSV of candidate sites (columns: name, id, and wkt or lon/lat).
    #[arg(long, required = true, value_name = "PATH")]
    pub candidates: PathBuf,

    /// Output CSV for the ranked sites.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Number of candidates to keep.
    #[arg(short = 'n', long, value_name = "INT")]
    pub top_n: Option<usize>,

    /// Minimum distance between kept candidates, and the reach radius, in meters.
    #[arg(short = 'd', long, value_name = "FLOAT")]
    pub min_distance: Option<f64>,

    /// Working grid cell size in meters.
    #[arg(long, value_name = "FLOAT")]
    pub cell_size: Option<f64>,

    /// Configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
