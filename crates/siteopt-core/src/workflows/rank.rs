use super::boundary::{check_min_distance, padded_envelope, project_sites, to_public, working_positions};
use crate::core::models::site::FacilitySite;
use crate::core::projection::SpatialProjector;
use crate::core::raster::{RasterBackend, RasterSource};
use crate::engine::config::RankConfig;
use crate::engine::deadline::Deadline;
use crate::engine::error::EngineError;
use crate::engine::grid_plan::plan_grid;
use crate::engine::progress::ProgressReporter;
use crate::engine::sampler::RasterSampler;
use crate::engine::selection::ranking::rank_candidates;
use crate::engine::state::{SelectionResult, SelectionWarning};
use tracing::{info, instrument, warn};

/// Ranks caller-supplied candidate sites by the population they reach.
///
/// Each candidate scores `Σ population · (1 − d / min_distance)` over the cells
/// within `min_distance` of it. The best `config.top_n` candidates that keep
/// `min_distance` between each other are returned in the public CRS, with their
/// names and ids intact.
///
/// # Errors
///
/// Same as [`select::run`](super::select::run), minus region errors: the region is
/// always derived from the candidates.
#[instrument(skip_all, name = "ranking_workflow", fields(candidates = candidates.len(), top_n = config.top_n))]
pub fn run<R: RasterSource + ?Sized>(
    candidates: &[FacilitySite],
    raster: &mut R,
    projector: &SpatialProjector,
    config: &RankConfig,
    reporter: &ProgressReporter,
) -> Result<SelectionResult, EngineError> {
    let deadline = Deadline::from_budget(config.deadline);
    check_min_distance(config.min_distance)?;
    let mut result = SelectionResult::empty();

    reporter.phase_start("Preparation");
    let projected = project_sites(candidates, projector, &mut result.warnings)?;
    reporter.phase_finish();

    if config.top_n == 0 {
        return Ok(result);
    }
    // The envelope must also hold each candidate's reach disc.
    let margin = config.grid.cell_size.max(config.min_distance);
    let Some(envelope) = padded_envelope(&projected, margin) else {
        warn!("No candidate could be placed in the working CRS.");
        result.warnings.push(SelectionWarning::NoViableSites);
        return Ok(result);
    };
    deadline.check("preparation")?;

    let plan = plan_grid(&envelope, projector.working_crs(), &config.grid)?;
    if plan.was_rescaled() {
        result.warnings.push(SelectionWarning::GridRescaled {
            from: plan.requested_cell_size,
            to: plan.cell_size(),
        });
    }
    result.grid = Some(plan);

    reporter.phase_start("Sampling");
    let population =
        RasterSampler::new(projector).sample(raster, &plan.geometry, None, &deadline, reporter)?;
    reporter.phase_finish();
    deadline.check("sampling")?;

    reporter.phase_start("Ranking");
    let positions = working_positions(&projected);
    let ranked = rank_candidates(&population, &positions, config.min_distance, config.top_n);
    reporter.phase_finish();
    deadline.check("ranking")?;

    result.sites = ranked
        .into_iter()
        .map(|(index, score)| to_public(projected[index].clone(), score, projector))
        .collect::<Result<_, _>>()?;

    info!(
        kept = result.sites.len(),
        skipped = result.warnings.len(),
        "Ranking workflow complete."
    );
    Ok(result)
}

/// Opens the raster described by `backend` and runs [`run`] with a projector built
/// from `config.crs`.
pub fn run_with_backend(
    candidates: &[FacilitySite],
    backend: &RasterBackend,
    config: &RankConfig,
    reporter: &ProgressReporter,
) -> Result<SelectionResult, EngineError> {
    let projector = SpatialProjector::new(config.crs.working, config.crs.public)?;
    let mut raster = backend.open()?;
    run(candidates, raster.as_mut(), &projector, config, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::grid::GeoTransform;
    use crate::core::models::point::{Crs, GeoPoint};
    use crate::core::raster::ArrayRaster;
    use crate::engine::config::RankConfigBuilder;

    const W: Crs = Crs::WORLD_MOLLWEIDE;

    fn planar() -> SpatialProjector {
        SpatialProjector::new(W, W).unwrap()
    }

    fn raster_with(cells: &[(usize, usize, f64)]) -> ArrayRaster {
        let size = 40;
        let mut values = vec![0.0; size * size];
        for &(col, row_from_south, v) in cells {
            values[(size - 1 - row_from_south) * size + col] = v;
        }
        let transform = GeoTransform::north_up(0.0, size as f64, 1.0, -1.0);
        ArrayRaster::new(size, size, values, transform, W).unwrap()
    }

    fn candidate(name: &str, x: f64, y: f64) -> FacilitySite {
        FacilitySite::new(GeoPoint::new(x, y, W))
            .with_name(name)
            .with_id(format!("id-{name}"))
    }

    fn config(top_n: usize, min_distance: f64) -> RankConfig {
        RankConfigBuilder::new()
            .top_n(top_n)
            .min_distance(min_distance)
            .cell_size(1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn candidates_are_ordered_by_reach_and_keep_metadata() {
        let mut raster = raster_with(&[(10, 10, 5.0), (30, 30, 20.0), (20, 20, 10.0)]);
        let candidates = [
            candidate("a", 10.0, 10.0),
            candidate("b", 30.0, 30.0),
            candidate("c", 20.0, 20.0),
        ];
        let result = run(
            &candidates,
            &mut raster,
            &planar(),
            &config(2, 0.0),
            &ProgressReporter::new(),
        )
        .unwrap();

        let names: Vec<&str> = result
            .sites
            .iter()
            .filter_map(|s| s.site.name.as_deref())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(result.sites[0].site.id.as_deref(), Some("id-b"));
        assert_eq!(result.sites[0].score, 20.0);
        assert_eq!(result.sites[0].location(), GeoPoint::new(30.0, 30.0, W));
    }

    #[test]
    fn nearby_weaker_candidates_are_dropped() {
        let mut raster = raster_with(&[(10, 10, 9.0), (11, 10, 8.0), (30, 10, 1.0)]);
        let candidates = [
            candidate("strong", 10.0, 10.0),
            candidate("shadowed", 11.0, 10.0),
            candidate("far", 30.0, 10.0),
        ];
        let result = run(
            &candidates,
            &mut raster,
            &planar(),
            &config(3, 3.0),
            &ProgressReporter::new(),
        )
        .unwrap();

        let names: Vec<&str> = result
            .sites
            .iter()
            .filter_map(|s| s.site.name.as_deref())
            .collect();
        assert_eq!(names, vec!["strong", "far"]);
    }

    #[test]
    fn malformed_candidates_are_skipped() {
        let mut raster = raster_with(&[(5, 5, 1.0)]);
        let candidates = [
            candidate("bad", f64::NAN, 1.0),
            candidate("good", 5.0, 5.0),
        ];
        let result = run(
            &candidates,
            &mut raster,
            &planar(),
            &config(5, 0.0),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.sites.len(), 1);
        assert!(result.has_warning(|w| matches!(w, SelectionWarning::SkippedFacility { index: 0, .. })));
    }

    #[test]
    fn no_usable_candidate_yields_empty_result() {
        let mut raster = raster_with(&[]);
        let result = run(
            &[],
            &mut raster,
            &planar(),
            &config(5, 1.0),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(result.is_empty());
        assert_eq!(raster.read_count(), 0);
    }
}
