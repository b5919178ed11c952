use super::{progress_handler, report_warnings};
use crate::cli::SelectArgs;
use crate::config::build_select_config;
use crate::data;
use crate::error::Result;
use siteopt::engine::progress::ProgressReporter;
use siteopt::workflows::select::{self, SelectionRequest};
use tracing::{info, warn};

pub fn run(args: SelectArgs, quiet: bool) -> Result<()> {
    info!("Building selection configuration...");
    let app = build_select_config(&args)?;
    let config = &app.core_config;

    let facilities = match &app.facilities_path {
        Some(path) => data::read_sites(path, config.crs.public)?,
        None => data::LoadedSites::default(),
    };
    let mut request = SelectionRequest::new().with_facilities(facilities.sites);
    if let Some(region) = app.region.clone() {
        request = request.with_region(region);
    }

    let handler = progress_handler(quiet);
    let reporter = ProgressReporter::with_callback(handler.get_callback());

    if !quiet {
        println!(
            "Selecting {} site(s) with the {} strategy...",
            config.count, config.strategy
        );
    }
    let result = select::run_with_backend(&request, &app.raster, config, &reporter)?;
    info!(
        sites = result.sites.len(),
        warnings = result.warnings.len(),
        converged = result.converged,
        "Selection workflow finished."
    );

    report_warnings(&facilities.skipped, &result, quiet);
    if let Some(plan) = &result.grid {
        info!(
            width = plan.geometry.width,
            height = plan.geometry.height,
            cell_size = plan.cell_size(),
            "Working grid used."
        );
    }
    if result.is_empty() {
        warn!("No sites were proposed.");
    }

    data::write_sites(&app.output_path, &result.sites)?;
    if !quiet {
        match result.sites.first() {
            Some(best) => println!(
                "✓ {} site(s) written to {} (best score {:.2}).",
                result.sites.len(),
                app.output_path.display(),
                best.score
            ),
            None => println!(
                "No sites proposed; wrote an empty table to {}.",
                app.output_path.display()
            ),
        }
    }
    Ok(())
}
