use super::{progress_handler, report_warnings};
use crate::cli::RankArgs;
use crate::config::build_rank_config;
use crate::data;
use crate::error::{CliError, Result};
use siteopt::engine::progress::ProgressReporter;
use siteopt::workflows::rank;
use tracing::info;

pub fn run(args: RankArgs, quiet: bool) -> Result<()> {
    info!("Building ranking configuration...");
    let app = build_rank_config(&args)?;
    let config = &app.core_config;

    let loaded = data::read_sites(&app.candidates_path, config.crs.public)?;
    let candidates = loaded.sites;
    if candidates.is_empty() {
        return Err(CliError::Argument(format!(
            "No usable candidate sites in {}",
            app.candidates_path.display()
        )));
    }

    let handler = progress_handler(quiet);
    let reporter = ProgressReporter::with_callback(handler.get_callback());

    if !quiet {
        println!(
            "Ranking {} candidate(s), keeping up to {}...",
            candidates.len(),
            config.top_n
        );
    }
    let result = rank::run_with_backend(&candidates, &app.raster, config, &reporter)?;
    info!(kept = result.sites.len(), "Ranking workflow finished.");

    report_warnings(&loaded.skipped, &result, quiet);
    data::write_sites(&app.output_path, &result.sites)?;
    if !quiet {
        println!(
            "✓ {} ranked site(s) written to {}.",
            result.sites.len(),
            app.output_path.display()
        );
    }
    Ok(())
}
