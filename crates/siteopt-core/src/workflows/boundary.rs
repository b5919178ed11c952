use crate::core::models::point::GeoPoint;
use crate::core::models::region::Envelope;
use crate::core::models::site::{FacilitySite, ScoredSite};
use crate::core::projection::SpatialProjector;
use crate::engine::error::EngineError;
use crate::engine::state::SelectionWarning;
use nalgebra::Point2;
use tracing::warn;

/// Fraction of each envelope dimension added on every side of a derived region.
const ENVELOPE_MARGIN: f64 = 0.1;

pub(crate) fn check_min_distance(min_distance: f64) -> Result<(), EngineError> {
    if !min_distance.is_finite() || min_distance < 0.0 {
        return Err(EngineError::invalid_parameter(
            "min_distance",
            format!("must be finite and non-negative, got {min_distance}"),
        ));
    }
    Ok(())
}

/// Moves sites into the working CRS, keeping their metadata.
///
/// Sites with malformed or unprojectable coordinates are left out and reported as
/// `SkippedFacility`; a CRS the projector cannot handle at all is fatal.
pub(crate) fn project_sites(
    sites: &[FacilitySite],
    projector: &SpatialProjector,
    warnings: &mut Vec<SelectionWarning>,
) -> Result<Vec<FacilitySite>, EngineError> {
    let locations: Vec<GeoPoint> = sites.iter().map(|s| s.location).collect();
    let projected = projector.transform_all(&locations, projector.working_crs());

    let mut kept = Vec::with_capacity(sites.len());
    for (index, (site, outcome)) in sites.iter().zip(projected).enumerate() {
        let reason = match outcome {
            Ok(point) if point.is_finite() => {
                kept.push(site.relocated(point));
                continue;
            }
            Ok(_) => "coordinates are not finite".to_string(),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => e.to_string(),
        };
        warn!(index, %reason, "Skipping site that cannot be placed in the working CRS.");
        warnings.push(SelectionWarning::SkippedFacility { index, reason });
    }
    Ok(kept)
}

pub(crate) fn working_positions(sites: &[FacilitySite]) -> Vec<Point2<f64>> {
    sites
        .iter()
        .map(|s| Point2::new(s.location.x(), s.location.y()))
        .collect()
}

/// Envelope of `sites` grown by 10 % of each dimension per side, and by at least
/// `min_margin` per side. `None` when there are no sites.
pub(crate) fn padded_envelope(sites: &[FacilitySite], min_margin: f64) -> Option<Envelope> {
    let envelope = Envelope::from_points(sites.iter().map(|s| (s.location.x(), s.location.y())))?;
    let dx = (envelope.width() * ENVELOPE_MARGIN).max(min_margin);
    let dy = (envelope.height() * ENVELOPE_MARGIN).max(min_margin);
    Some(envelope.expand_by(dx, dy))
}

/// Re-expresses a working-CRS site in the public CRS. Failure here is fatal since a
/// computed site that cannot be reported is useless.
pub(crate) fn to_public(
    site: FacilitySite,
    score: f64,
    projector: &SpatialProjector,
) -> Result<ScoredSite, EngineError> {
    let location = projector.to_public(&site.location)?;
    Ok(ScoredSite::new(site.relocated(location), score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::point::Crs;

    fn working_site(x: f64, y: f64) -> FacilitySite {
        FacilitySite::new(GeoPoint::new(x, y, Crs::WORLD_MOLLWEIDE))
    }

    #[test]
    fn negative_or_nan_min_distance_is_rejected() {
        assert!(check_min_distance(0.0).is_ok());
        assert!(check_min_distance(-1.0).is_err());
        assert!(check_min_distance(f64::NAN).is_err());
    }

    #[test]
    fn padded_envelope_uses_ten_percent_or_minimum_margin() {
        let sites = [working_site(100.0, 100.0), working_site(300.0, 200.0)];
        let env = padded_envelope(&sites, 10.0).unwrap();
        assert_eq!(env, Envelope::new(80.0, 90.0, 320.0, 210.0));
        assert!(padded_envelope(&[], 10.0).is_none());
    }

    #[test]
    fn single_site_gets_minimum_margin() {
        let env = padded_envelope(&[working_site(5.0, 5.0)], 2.0).unwrap();
        assert_eq!(env, Envelope::new(3.0, 3.0, 7.0, 7.0));
    }

    #[test]
    fn malformed_sites_are_skipped_with_warning() {
        let projector = SpatialProjector::default();
        let sites = [
            FacilitySite::new(GeoPoint::lon_lat(10.0, 50.0)).with_name("ok"),
            FacilitySite::new(GeoPoint::lon_lat(f64::NAN, 50.0)),
            working_site(f64::INFINITY, 0.0),
        ];
        let mut warnings = Vec::new();
        let kept = project_sites(&sites, &projector, &mut warnings).unwrap();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name.as_deref(), Some("ok"));
        assert_eq!(kept[0].location.crs(), Crs::WORLD_MOLLWEIDE);
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            warnings[0],
            SelectionWarning::SkippedFacility { index: 1, .. }
        ));
        assert!(matches!(
            warnings[1],
            SelectionWarning::SkippedFacility { index: 2, .. }
        ));
    }

    #[test]
    fn unsupported_site_crs_is_fatal() {
        let projector = SpatialProjector::default();
        let sites = [FacilitySite::new(GeoPoint::new(1.0, 1.0, Crs::new(2154)))];
        let result = project_sites(&sites, &projector, &mut Vec::new());
        assert!(matches!(result, Err(EngineError::Projection(_))));
    }
}
