use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{RankAppConfig, SelectAppConfig};
use crate::cli::{RankArgs, SelectArgs};
use crate::error::{CliError, Result};
use crate::utils::parser::{self, ParseError};
use siteopt::core::models::point::Crs;
use siteopt::core::raster::RasterBackend;
use siteopt::engine::config::{
    ClusterConfig, DemandConfig, PeakConfig, RankConfigBuilder, SelectionConfigBuilder,
};
use siteopt::workflows::select::RegionInput;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn build_select_config(args: &SelectArgs) -> Result<SelectAppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file(args.config.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let selection = file_config.selection.take().unwrap_or_default();
    let count = args.count.or(selection.count).unwrap_or(defaults.count);
    let min_distance = args
        .min_distance
        .or(selection.min_distance)
        .unwrap_or(defaults.min_distance);
    let strategy = args
        .strategy
        .or(selection.strategy)
        .unwrap_or(defaults.strategy);

    let region_text = match (&args.region, &args.region_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(std::fs::read_to_string(path)?),
        (None, None) => selection.region,
    };

    let raster = resolve_raster(args.raster.as_deref(), file_config.raster.take())?;
    let grid = file_config.grid.take().unwrap_or_default();
    let crs = file_config.crs.take().unwrap_or_default();

    let mut builder = SelectionConfigBuilder::new()
        .count(count)
        .min_distance(min_distance)
        .strategy(strategy)
        .demand(merge_demand(&file_config))
        .peak(merge_peak(&file_config))
        .cluster(merge_cluster(&file_config, args.seed));
    if let Some(cell_size) = args.cell_size.or(grid.cell_size) {
        builder = builder.cell_size(cell_size);
    }
    if let Some(max_cells) = grid.max_cells {
        builder = builder.max_cells(max_cells);
    }
    if let Some(auto_rescale) = grid.auto_rescale {
        builder = builder.auto_rescale(auto_rescale);
    }
    if let Some(working) = crs.working {
        builder = builder.working_crs(working);
    }
    if let Some(public) = crs.public {
        builder = builder.public_crs(public);
    }
    if let Some(deadline) = deadline(&file_config)? {
        builder = builder.deadline(deadline);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(SelectAppConfig {
        raster,
        facilities_path: args.facilities.clone(),
        region: region_text.map(|text| RegionInput::wkt(text.trim())),
        output_path: args.output.clone(),
        core_config,
    })
}

pub fn build_rank_config(args: &RankArgs) -> Result<RankAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file(args.config.as_deref())?;

    let selection = file_config.selection.take().unwrap_or_default();
    let raster = resolve_raster(args.raster.as_deref(), file_config.raster.take())?;
    let grid = file_config.grid.take().unwrap_or_default();
    let crs = file_config.crs.take().unwrap_or_default();

    let mut builder = RankConfigBuilder::new()
        .top_n(args.top_n.or(selection.top_n).unwrap_or(defaults.top_n))
        .min_distance(
            args.min_distance
                .or(selection.min_distance)
                .unwrap_or(defaults.min_distance),
        );
    if let Some(cell_size) = args.cell_size.or(grid.cell_size) {
        builder = builder.cell_size(cell_size);
    }
    if let Some(max_cells) = grid.max_cells {
        builder = builder.max_cells(max_cells);
    }
    if let Some(auto_rescale) = grid.auto_rescale {
        builder = builder.auto_rescale(auto_rescale);
    }
    if let Some(working) = crs.working {
        builder = builder.working_crs(working);
    }
    if let Some(public) = crs.public {
        builder = builder.public_crs(public);
    }
    if let Some(deadline) = deadline(&file_config)? {
        builder = builder.deadline(deadline);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(RankAppConfig {
        raster,
        candidates_path: args.candidates.clone(),
        output_path: args.output.clone(),
        core_config,
    })
}

fn load_file(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => FileConfig::from_file(path),
        None => Ok(FileConfig::default()),
    }
}

fn resolve_raster(cli_path: Option<&Path>, file_raster: Option<RasterBackend>) -> Result<RasterBackend> {
    match (cli_path, file_raster) {
        (Some(path), Some(RasterBackend::GeoTiff { crs, .. })) => Ok(RasterBackend::GeoTiff {
            path: PathBuf::from(path),
            crs,
        }),
        (Some(path), None) => Ok(RasterBackend::geotiff(path)),
        (None, Some(backend)) => Ok(backend),
        (None, None) => Err(CliError::Config(
            "A population raster is required: pass --raster or add a [raster] section to the config file."
                .to_string(),
        )),
    }
}

fn merge_demand(file: &FileConfig) -> DemandConfig {
    let defaults = DemandConfig::default();
    let Some(demand) = &file.demand else {
        return defaults;
    };
    DemandConfig {
        kernel_size: demand.kernel_size.unwrap_or(defaults.kernel_size),
        sigma: demand.sigma.unwrap_or(defaults.sigma),
        suppression_weight: demand
            .suppression_weight
            .unwrap_or(defaults.suppression_weight),
    }
}

fn merge_peak(file: &FileConfig) -> PeakConfig {
    let defaults = PeakConfig::default();
    let Some(peak) = &file.peak else {
        return defaults;
    };
    PeakConfig {
        suppression: peak.suppression.unwrap_or(defaults.suppression),
        epsilon: peak.epsilon.unwrap_or(defaults.epsilon),
        enforce_separation: peak.enforce_separation.unwrap_or(defaults.enforce_separation),
    }
}

fn merge_cluster(file: &FileConfig, cli_seed: Option<u64>) -> ClusterConfig {
    let defaults = ClusterConfig::default();
    let cluster = file.cluster.clone().unwrap_or_default();
    ClusterConfig {
        max_iterations: cluster.max_iterations.unwrap_or(defaults.max_iterations),
        tolerance: cluster.tolerance.unwrap_or(defaults.tolerance),
        max_repair_passes: cluster
            .max_repair_passes
            .unwrap_or(defaults.max_repair_passes),
        max_seed_attempts: cluster
            .max_seed_attempts
            .unwrap_or(defaults.max_seed_attempts),
        seed: cli_seed.or(cluster.seed),
    }
}

fn deadline(file: &FileConfig) -> Result<Option<Duration>> {
    let Some(seconds) = file.limits.as_ref().and_then(|l| l.deadline_seconds) else {
        return Ok(None);
    };
    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|e| CliError::Config(format!("Invalid limits.deadline-seconds {seconds}: {e}")))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for assignment in set_values {
        let (key, value) = parser::parse_assignment(assignment).map_err(config_error)?;
        match key {
            "selection.count" => {
                section(&mut config.selection).count = Some(parse(key, value)?);
            }
            "selection.min-distance" => {
                section(&mut config.selection).min_distance = Some(parse(key, value)?);
            }
            "selection.strategy" => {
                section(&mut config.selection).strategy = Some(parse(key, value)?);
            }
            "selection.region" => {
                section(&mut config.selection).region = Some(value.to_string());
            }
            "selection.top-n" => {
                section(&mut config.selection).top_n = Some(parse(key, value)?);
            }
            "grid.cell-size" => section(&mut config.grid).cell_size = Some(parse(key, value)?),
            "grid.max-cells" => section(&mut config.grid).max_cells = Some(parse(key, value)?),
            "grid.auto-rescale" => {
                section(&mut config.grid).auto_rescale = Some(parse(key, value)?);
            }
            "demand.kernel-size" => {
                section(&mut config.demand).kernel_size = Some(parse(key, value)?);
            }
            "demand.sigma" => section(&mut config.demand).sigma = Some(parse(key, value)?),
            "demand.suppression-weight" => {
                section(&mut config.demand).suppression_weight = Some(parse(key, value)?);
            }
            "peak.suppression" => {
                section(&mut config.peak).suppression = Some(parse(key, value)?);
            }
            "peak.epsilon" => section(&mut config.peak).epsilon = Some(parse(key, value)?),
            "peak.enforce-separation" => {
                section(&mut config.peak).enforce_separation = Some(parse(key, value)?);
            }
            "cluster.max-iterations" => {
                section(&mut config.cluster).max_iterations = Some(parse(key, value)?);
            }
            "cluster.tolerance" => {
                section(&mut config.cluster).tolerance = Some(parse(key, value)?);
            }
            "cluster.max-repair-passes" => {
                section(&mut config.cluster).max_repair_passes = Some(parse(key, value)?);
            }
            "cluster.max-seed-attempts" => {
                section(&mut config.cluster).max_seed_attempts = Some(parse(key, value)?);
            }
            "cluster.seed" => section(&mut config.cluster).seed = Some(parse(key, value)?),
            "crs.working" => {
                section(&mut config.crs).working = Some(Crs::new(parse(key, value)?));
            }
            "crs.public" => {
                section(&mut config.crs).public = Some(Crs::new(parse(key, value)?));
            }
            "limits.deadline-seconds" => {
                section(&mut config.limits).deadline_seconds = Some(parse(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

fn section<T: Default>(slot: &mut Option<T>) -> &mut T {
    slot.get_or_insert_with(Default::default)
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parser::parse_value(key, value).map_err(config_error)
}

fn config_error(e: ParseError) -> CliError {
    CliError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use siteopt::engine::config::{Strategy, SuppressionMode};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let path = TEST_DIR.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn select_args(extra: &[&str]) -> SelectArgs {
        let mut argv = vec!["siteopt", "select", "-o", "out.csv"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Select(args) => args,
            Commands::Rank(_) => unreachable!(),
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let app = build_select_config(&select_args(&["-r", "pop.tif"])).unwrap();
        let cfg = app.core_config;
        assert_eq!(cfg.count, 10);
        assert_eq!(cfg.min_distance, 100.0);
        assert_eq!(cfg.strategy, Strategy::PeakSuppression);
        assert_eq!(cfg.grid.cell_size, 100.0);
        assert_eq!(cfg.demand, DemandConfig::default());
        assert_eq!(cfg.deadline, None);
        assert_eq!(app.raster, RasterBackend::geotiff("pop.tif"));
        assert!(app.region.is_none());
    }

    #[test]
    fn file_values_are_used_and_cli_flags_win() {
        let path = write_config_file(
            "layered.toml",
            r#"
            [selection]
            count = 4
            min-distance = 300.0
            strategy = "weighted-clustering"

            [grid]
            cell-size = 25.0

            [cluster]
            seed = 1

            [raster]
            kind = "geo-tiff"
            path = "from-file.tif"
            crs = 54009
            "#,
        );
        let path = path.to_str().unwrap();
        let app = build_select_config(&select_args(&[
            "-c", path, "-n", "9", "--seed", "42", "-r", "cli.tif",
        ]))
        .unwrap();
        let cfg = app.core_config;

        assert_eq!(cfg.count, 9);
        assert_eq!(cfg.min_distance, 300.0);
        assert_eq!(cfg.strategy, Strategy::WeightedClustering);
        assert_eq!(cfg.grid.cell_size, 25.0);
        assert_eq!(cfg.cluster.seed, Some(42));
        assert_eq!(
            app.raster,
            RasterBackend::GeoTiff {
                path: PathBuf::from("cli.tif"),
                crs: Some(Crs::WORLD_MOLLWEIDE),
            }
        );
    }

    #[test]
    fn set_values_override_the_file() {
        let path = write_config_file(
            "overridden.toml",
            "[demand]\nsigma = 1.0\n[raster]\nkind = \"geo-tiff\"\npath = \"p.tif\"\n",
        );
        let app = build_select_config(&select_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "demand.sigma=4.5",
            "-S",
            "peak.suppression=hard-zero",
            "-S",
            "crs.working=3035",
            "-S",
            "limits.deadline-seconds=2.5",
        ]))
        .unwrap();
        let cfg = app.core_config;

        assert_eq!(cfg.demand.sigma, 4.5);
        assert_eq!(cfg.peak.suppression, SuppressionMode::HardZero);
        assert_eq!(cfg.crs.working, Crs::LAEA_EUROPE);
        assert_eq!(cfg.deadline, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn unknown_or_malformed_set_values_are_rejected() {
        let unknown = build_select_config(&select_args(&["-r", "p.tif", "-S", "foo.bar=1"]));
        assert!(matches!(unknown, Err(CliError::Config(_))));

        let malformed = build_select_config(&select_args(&["-r", "p.tif", "-S", "grid.max-cells"]));
        assert!(matches!(malformed, Err(CliError::Config(_))));

        let bad_type =
            build_select_config(&select_args(&["-r", "p.tif", "-S", "selection.count=lots"]));
        assert!(matches!(bad_type, Err(CliError::Config(_))));
    }

    #[test]
    fn missing_raster_is_a_config_error() {
        let result = build_select_config(&select_args(&[]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn region_comes_from_flag_or_file() {
        let region_path = write_config_file("region.wkt", "POLYGON((0 0, 1 0, 1 1, 0 0))\n");
        let app = build_select_config(&select_args(&[
            "-r",
            "p.tif",
            "--region-file",
            region_path.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(
            app.region,
            Some(RegionInput::wkt("POLYGON((0 0, 1 0, 1 1, 0 0))"))
        );
    }

    #[test]
    fn negative_deadline_is_rejected() {
        let result = build_select_config(&select_args(&[
            "-r",
            "p.tif",
            "-S",
            "limits.deadline-seconds=-1",
        ]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn rank_config_reads_shared_sections() {
        let path = write_config_file(
            "rank.toml",
            "[selection]\ntop-n = 3\nmin-distance = 50.0\n[grid]\ncell-size = 10.0\n",
        );
        let cli = Cli::parse_from([
            "siteopt",
            "rank",
            "--candidates",
            "c.csv",
            "-o",
            "o.csv",
            "-r",
            "p.tif",
            "-c",
            path.to_str().unwrap(),
        ]);
        let Commands::Rank(args) = cli.command else {
            unreachable!()
        };
        let app = build_rank_config(&args).unwrap();
        assert_eq!(app.core_config.top_n, 3);
        assert_eq!(app.core_config.min_distance, 50.0);
        assert_eq!(app.core_config.grid.cell_size, 10.0);
        assert_eq!(app.candidates_path, PathBuf::from("c.csv"));
    }
}
