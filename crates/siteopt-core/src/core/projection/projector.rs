use super::{mollweide, registry};
use crate::core::models::point::{Crs, GeoPoint};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Unsupported coordinate reference system {0}")]
    UnsupportedCrs(Crs),
    #[error("Working CRS {0} must be a projected system measured in meters")]
    GeographicWorkingCrs(Crs),
    #[error("Coordinates ({x}, {y}) are outside the valid domain of {crs}")]
    OutOfDomain { x: f64, y: f64, crs: Crs },
    #[error("Projection backend failure: {0}")]
    Backend(String),
}

impl ProjectionError {
    /// Out-of-domain failures concern a single point; everything else invalidates the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProjectionError::OutOfDomain { .. })
    }
}

enum TransformStrategy {
    Identity,
    MollweideForward,
    MollweideInverse,
    Proj4rs(Box<ProjPair>),
}

struct ProjPair {
    source: Proj,
    target: Proj,
}

/// A reusable conversion between two supported CRSs.
///
/// Building one parses the PROJ definitions once; [`CoordTransformer::transform`] is then
/// cheap enough to call per grid cell.
pub struct CoordTransformer {
    source: Crs,
    target: Crs,
    strategy: TransformStrategy,
}

impl fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl CoordTransformer {
    pub fn new(source: Crs, target: Crs) -> Result<Self, ProjectionError> {
        let source_def =
            registry::proj_string(source).ok_or(ProjectionError::UnsupportedCrs(source))?;
        let target_def =
            registry::proj_string(target).ok_or(ProjectionError::UnsupportedCrs(target))?;

        let strategy = if source == target {
            TransformStrategy::Identity
        } else if source == Crs::WGS84 && target == Crs::WORLD_MOLLWEIDE {
            TransformStrategy::MollweideForward
        } else if source == Crs::WORLD_MOLLWEIDE && target == Crs::WGS84 {
            TransformStrategy::MollweideInverse
        } else {
            let source = Proj::from_proj_string(source_def)
                .map_err(|e| ProjectionError::Backend(format!("{source}: {e:?}")))?;
            let target = Proj::from_proj_string(target_def)
                .map_err(|e| ProjectionError::Backend(format!("{target}: {e:?}")))?;
            TransformStrategy::Proj4rs(Box::new(ProjPair { source, target }))
        };

        Ok(Self {
            source,
            target,
            strategy,
        })
    }

    pub fn source(&self) -> Crs {
        self.source
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.strategy, TransformStrategy::Identity)
    }

    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let out_of_domain = || ProjectionError::OutOfDomain {
            x,
            y,
            crs: self.source,
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(out_of_domain());
        }
        if registry::is_geographic(self.source) && (x.abs() > 180.0 || y.abs() > 90.0) {
            return Err(out_of_domain());
        }

        let (out_x, out_y) = match &self.strategy {
            TransformStrategy::Identity => (x, y),
            TransformStrategy::MollweideForward => {
                mollweide::forward(x, y).ok_or_else(out_of_domain)?
            }
            TransformStrategy::MollweideInverse => {
                mollweide::inverse(x, y).ok_or_else(out_of_domain)?
            }
            TransformStrategy::Proj4rs(pair) => {
                let mut point = if registry::is_geographic(self.source) {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };
                transform(&pair.source, &pair.target, &mut point)
                    .map_err(|_| out_of_domain())?;
                if registry::is_geographic(self.target) {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    (point.0, point.1)
                }
            }
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(out_of_domain());
        }
        Ok((out_x, out_y))
    }
}

/// Converts points between the public CRS (how callers speak) and the working CRS
/// (where all metric computation happens).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialProjector {
    working: Crs,
    public: Crs,
}

impl Default for SpatialProjector {
    fn default() -> Self {
        Self {
            working: Crs::WORLD_MOLLWEIDE,
            public: Crs::WGS84,
        }
    }
}

impl SpatialProjector {
    pub fn new(working: Crs, public: Crs) -> Result<Self, ProjectionError> {
        for crs in [working, public] {
            if !registry::is_supported(crs) {
                return Err(ProjectionError::UnsupportedCrs(crs));
            }
        }
        if registry::is_geographic(working) {
            return Err(ProjectionError::GeographicWorkingCrs(working));
        }
        Ok(Self { working, public })
    }

    pub fn working_crs(&self) -> Crs {
        self.working
    }

    pub fn public_crs(&self) -> Crs {
        self.public
    }

    pub fn transformer(&self, source: Crs, target: Crs) -> Result<CoordTransformer, ProjectionError> {
        CoordTransformer::new(source, target)
    }

    /// Re-expresses `point` in `target`. Identity when the CRSs already match.
    pub fn transform(&self, point: &GeoPoint, target: Crs) -> Result<GeoPoint, ProjectionError> {
        if point.crs() == target {
            return Ok(*point);
        }
        let (x, y) = self.transform_xy(point.x(), point.y(), point.crs(), target)?;
        Ok(GeoPoint::new(x, y, target))
    }

    pub fn transform_xy(
        &self,
        x: f64,
        y: f64,
        source: Crs,
        target: Crs,
    ) -> Result<(f64, f64), ProjectionError> {
        CoordTransformer::new(source, target)?.transform(x, y)
    }

    pub fn to_working(&self, point: &GeoPoint) -> Result<GeoPoint, ProjectionError> {
        self.transform(point, self.working)
    }

    pub fn to_public(&self, point: &GeoPoint) -> Result<GeoPoint, ProjectionError> {
        self.transform(point, self.public)
    }

    /// Projects a batch of points with a single transformer. Each entry fails independently.
    pub fn transform_all(
        &self,
        points: &[GeoPoint],
        target: Crs,
    ) -> Vec<Result<GeoPoint, ProjectionError>> {
        let mut cache: Option<CoordTransformer> = None;
        points
            .iter()
            .map(|point| {
                if point.crs() == target {
                    return Ok(*point);
                }
                let reusable = cache
                    .as_ref()
                    .is_some_and(|t| t.source() == point.crs() && t.target() == target);
                if !reusable {
                    cache = Some(CoordTransformer::new(point.crs(), target)?);
                }
                let transformer = cache.as_ref().ok_or_else(|| {
                    ProjectionError::Backend("transformer cache is empty".to_string())
                })?;
                let (x, y) = transformer.transform(point.x(), point.y())?;
                Ok(GeoPoint::new(x, y, target))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL_DEG: f64 = 1e-6;

    #[test]
    fn default_projector_uses_mollweide_and_wgs84() {
        let projector = SpatialProjector::default();
        assert_eq!(projector.working_crs(), Crs::WORLD_MOLLWEIDE);
        assert_eq!(projector.public_crs(), Crs::WGS84);
    }

    #[test]
    fn unsupported_crs_is_rejected_at_construction() {
        let err = SpatialProjector::new(Crs::new(12345), Crs::WGS84).unwrap_err();
        assert_eq!(err, ProjectionError::UnsupportedCrs(Crs::new(12345)));
        assert!(err.is_fatal());
    }

    #[test]
    fn geographic_working_crs_is_rejected() {
        let err = SpatialProjector::new(Crs::WGS84, Crs::WGS84).unwrap_err();
        assert_eq!(err, ProjectionError::GeographicWorkingCrs(Crs::WGS84));
    }

    #[test]
    fn public_to_working_round_trip_is_within_tolerance() {
        let projector = SpatialProjector::default();
        let istanbul = GeoPoint::lon_lat(28.9784, 41.0082);
        let working = projector.to_working(&istanbul).unwrap();
        assert_eq!(working.crs(), Crs::WORLD_MOLLWEIDE);
        let back = projector.to_public(&working).unwrap();
        assert!((back.x() - istanbul.x()).abs() < TOL_DEG);
        assert!((back.y() - istanbul.y()).abs() < TOL_DEG);
    }

    #[test]
    fn same_crs_transform_is_identity() {
        let projector = SpatialProjector::default();
        let point = GeoPoint::new(1234.5, -678.9, Crs::WORLD_MOLLWEIDE);
        assert_eq!(projector.to_working(&point).unwrap(), point);
        assert!(
            CoordTransformer::new(Crs::WORLD_MOLLWEIDE, Crs::WORLD_MOLLWEIDE)
                .unwrap()
                .is_identity()
        );
    }

    #[test]
    fn out_of_range_latitude_is_out_of_domain() {
        let projector = SpatialProjector::default();
        let err = projector.to_working(&GeoPoint::lon_lat(10.0, 95.0)).unwrap_err();
        assert!(matches!(err, ProjectionError::OutOfDomain { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn web_mercator_round_trip_uses_backend() {
        let projector = SpatialProjector::new(Crs::WEB_MERCATOR, Crs::WGS84).unwrap();
        let point = GeoPoint::lon_lat(-0.1276, 51.5072);
        let working = projector.to_working(&point).unwrap();
        assert!((working.x() - (-14_204.4)).abs() < 50.0);
        let back = projector.to_public(&working).unwrap();
        assert!((back.x() - point.x()).abs() < TOL_DEG);
        assert!((back.y() - point.y()).abs() < TOL_DEG);
    }

    #[test]
    fn transform_all_reports_failures_per_point() {
        let projector = SpatialProjector::default();
        let results = projector.transform_all(
            &[
                GeoPoint::lon_lat(0.0, 0.0),
                GeoPoint::lon_lat(0.0, 120.0),
                GeoPoint::lon_lat(10.0, 10.0),
            ],
            Crs::WORLD_MOLLWEIDE,
        );
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
