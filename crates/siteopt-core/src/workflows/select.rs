use super::boundary::{check_min_distance, padded_envelope, project_sites, to_public, working_positions};
use crate::core::io::wkt;
use crate::core::models::point::{Crs, GeoPoint};
use crate::core::models::region::{Envelope, Region};
use crate::core::models::site::FacilitySite;
use crate::core::projection::{ProjectionError, SpatialProjector};
use crate::core::raster::{RasterBackend, RasterSource};
use crate::engine::config::SelectionConfig;
use crate::engine::deadline::Deadline;
use crate::engine::demand::DemandMapBuilder;
use crate::engine::error::EngineError;
use crate::engine::grid_plan::plan_grid;
use crate::engine::progress::ProgressReporter;
use crate::engine::sampler::RasterSampler;
use crate::engine::selection::{SelectionInput, selector_for};
use crate::engine::state::{SelectionResult, SelectionWarning};
use tracing::{debug, info, instrument, warn};

/// Area of interest as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionInput {
    /// `POLYGON((...))`, optionally prefixed with `SRID=n;`. The CRS is taken from
    /// `crs`, then the SRID, then the projector's public CRS.
    Wkt { text: String, crs: Option<Crs> },
    /// Axis-aligned bounds in `crs` (public CRS when `None`).
    Envelope { envelope: Envelope, crs: Option<Crs> },
}

impl RegionInput {
    pub fn wkt(text: impl Into<String>) -> Self {
        RegionInput::Wkt {
            text: text.into(),
            crs: None,
        }
    }

    pub fn envelope(envelope: Envelope, crs: Crs) -> Self {
        RegionInput::Envelope {
            envelope,
            crs: Some(crs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionRequest {
    /// Facilities already in place; they lower demand and block nearby sites.
    pub facilities: Vec<FacilitySite>,
    /// When `None`, the padded envelope of `facilities` is used.
    pub region: Option<RegionInput>,
}

impl SelectionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facilities(mut self, facilities: Vec<FacilitySite>) -> Self {
        self.facilities = facilities;
        self
    }

    pub fn with_region(mut self, region: RegionInput) -> Self {
        self.region = Some(region);
        self
    }
}

/// Proposes up to `config.count` new facility sites.
///
/// Works in `projector`'s working CRS and reports sites in its public CRS, best first.
/// `config.crs` is not consulted here; see [`run_with_backend`].
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] for unusable parameters,
/// [`EngineError::InvalidRegion`] when no usable region can be resolved,
/// [`EngineError::Projection`] for unsupported CRSs or sites that cannot be reported,
/// [`EngineError::RasterUnavailable`] when the raster cannot be read,
/// [`EngineError::GridTooLarge`] when the grid does not fit the cell budget and
/// [`EngineError::DeadlineExceeded`] when the configured budget runs out.
#[instrument(skip_all, name = "selection_workflow", fields(count = config.count, strategy = %config.strategy))]
pub fn run<R: RasterSource + ?Sized>(
    request: &SelectionRequest,
    raster: &mut R,
    projector: &SpatialProjector,
    config: &SelectionConfig,
    reporter: &ProgressReporter,
) -> Result<SelectionResult, EngineError> {
    let deadline = Deadline::from_budget(config.deadline);
    check_min_distance(config.min_distance)?;
    let mut result = SelectionResult::empty();

    // === Phase 0: Inputs into the working CRS ===
    reporter.phase_start("Preparation");
    let facilities = project_sites(&request.facilities, projector, &mut result.warnings)?;
    let region = resolve_region(
        request.region.as_ref(),
        &facilities,
        projector,
        config.grid.cell_size,
    )?;
    reporter.phase_finish();

    if config.count == 0 {
        info!("Zero sites requested; nothing to do.");
        return Ok(result);
    }
    deadline.check("preparation")?;

    let plan = plan_grid(&region.envelope(), projector.working_crs(), &config.grid)?;
    if plan.was_rescaled() {
        result.warnings.push(SelectionWarning::GridRescaled {
            from: plan.requested_cell_size,
            to: plan.cell_size(),
        });
    }
    result.grid = Some(plan);

    // === Phase 1: Population sampling ===
    reporter.phase_start("Sampling");
    let population = RasterSampler::new(projector).sample(
        raster,
        &plan.geometry,
        region.clip(),
        &deadline,
        reporter,
    )?;
    reporter.phase_finish();
    deadline.check("sampling")?;

    // === Phase 2: Demand map ===
    reporter.phase_start("Demand");
    let demand = DemandMapBuilder::new(&config.demand)?.build(&population, &facilities)?;
    reporter.phase_finish();
    deadline.check("demand")?;

    // === Phase 3: Site selection ===
    reporter.phase_start("Selection");
    let existing = working_positions(&facilities);
    let input = SelectionInput {
        demand: &demand,
        count: config.count,
        min_distance: config.min_distance,
        clip: region.clip(),
        existing: &existing,
        deadline,
    };
    let mut selector = selector_for(config);
    debug!(strategy = selector.name(), "Running site selector.");
    let outcome = selector.select(&input, reporter)?;
    reporter.phase_finish();
    deadline.check("selection")?;

    result.warnings.extend(outcome.warnings);
    result.converged = outcome.converged;
    if outcome.candidates.is_empty() {
        warn!("Demand is zero everywhere in the region; no site proposed.");
        result.warnings.push(SelectionWarning::NoViableSites);
        return Ok(result);
    }

    // === Phase 4: Back to the public CRS ===
    reporter.phase_start("Reprojection");
    let working = projector.working_crs();
    result.sites = outcome
        .candidates
        .into_iter()
        .map(|c| {
            let site = FacilitySite::new(GeoPoint::new(c.position.x, c.position.y, working));
            to_public(site, c.score, projector)
        })
        .collect::<Result<_, _>>()?;
    reporter.phase_finish();

    info!(
        sites = result.sites.len(),
        warnings = result.warnings.len(),
        converged = result.converged,
        "Selection workflow complete."
    );
    Ok(result)
}

/// Opens the raster described by `backend`, builds the projector from `config.crs`
/// and runs [`run`]. The raster is released when this returns.
pub fn run_with_backend(
    request: &SelectionRequest,
    backend: &RasterBackend,
    config: &SelectionConfig,
    reporter: &ProgressReporter,
) -> Result<SelectionResult, EngineError> {
    let projector = SpatialProjector::new(config.crs.working, config.crs.public)?;
    let mut raster = backend.open()?;
    run(request, raster.as_mut(), &projector, config, reporter)
}

/// Turns the caller's region (or the facilities, when there is none) into a
/// validated region in the working CRS.
pub fn resolve_region(
    input: Option<&RegionInput>,
    facilities: &[FacilitySite],
    projector: &SpatialProjector,
    cell_size: f64,
) -> Result<Region, EngineError> {
    match input {
        Some(RegionInput::Wkt { text, crs }) => {
            let (rings, srid) =
                wkt::parse_polygon(text).map_err(|e| EngineError::invalid_region(e.to_string()))?;
            let source = crs
                .or(srid.map(Crs::new))
                .unwrap_or(projector.public_crs());
            let mut projected = rings
                .iter()
                .map(|ring| project_ring(ring, source, projector))
                .collect::<Result<Vec<_>, _>>()?;
            if projected.is_empty() {
                return Err(EngineError::invalid_region("polygon has no rings"));
            }
            let exterior = projected.remove(0);
            Region::polygon(exterior, projected)
                .map_err(|e| EngineError::invalid_region(e.to_string()))
        }
        Some(RegionInput::Envelope { envelope, crs }) => {
            let source = crs.unwrap_or(projector.public_crs());
            let outline = envelope_outline(envelope);
            let projected = project_ring(&outline, source, projector)?;
            let bounds = Envelope::from_points(projected)
                .filter(|e| e.is_finite() && e.width() > 0.0 && e.height() > 0.0)
                .ok_or_else(|| EngineError::invalid_region("envelope has zero area"))?;
            Ok(Region::Envelope(bounds))
        }
        None => {
            let margin = if cell_size.is_finite() { cell_size } else { 0.0 };
            padded_envelope(facilities, margin)
                .map(Region::Envelope)
                .ok_or_else(|| {
                    EngineError::invalid_region(
                        "no region given and no existing facility to derive one from",
                    )
                })
        }
    }
}

fn project_ring(
    ring: &[(f64, f64)],
    source: Crs,
    projector: &SpatialProjector,
) -> Result<Vec<(f64, f64)>, EngineError> {
    let transformer = projector.transformer(source, projector.working_crs())?;
    ring.iter()
        .map(|&(x, y)| {
            transformer.transform(x, y).map_err(|e| match e {
                ProjectionError::OutOfDomain { .. } => EngineError::invalid_region(e.to_string()),
                other => other.into(),
            })
        })
        .collect()
}

/// Corners and edge midpoints, so curved projections of the edges are roughly covered.
fn envelope_outline(envelope: &Envelope) -> Vec<(f64, f64)> {
    let mid_x = (envelope.min_x + envelope.max_x) / 2.0;
    let mid_y = (envelope.min_y + envelope.max_y) / 2.0;
    vec![
        (envelope.min_x, envelope.min_y),
        (mid_x, envelope.min_y),
        (envelope.max_x, envelope.min_y),
        (envelope.max_x, mid_y),
        (envelope.max_x, envelope.max_y),
        (mid_x, envelope.max_y),
        (envelope.min_x, envelope.max_y),
        (envelope.min_x, mid_y),
    ]
}
