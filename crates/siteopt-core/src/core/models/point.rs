use serde::Deserialize;
use std::fmt;

/// A coordinate reference system identified by its authority code.
///
/// Codes below 50000 are EPSG codes; the ESRI range (e.g. `54009`) is
/// displayed with the `ESRI:` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Crs(u32);

impl Crs {
    /// WGS84 geographic longitude/latitude in degrees.
    pub const WGS84: Crs = Crs(4326);
    /// Spherical Web Mercator.
    pub const WEB_MERCATOR: Crs = Crs(3857);
    /// ESRI World Mollweide, the equal-area projection used by GHS population grids.
    pub const WORLD_MOLLWEIDE: Crs = Crs(54009);
    /// WGS84 EASE-Grid 2.0 global (cylindrical equal area).
    pub const EASE_GRID_2: Crs = Crs(6933);
    /// ETRS89 Lambert azimuthal equal area, Europe.
    pub const LAEA_EUROPE: Crs = Crs(3035);

    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u32 {
        self.0
    }

    pub fn authority(&self) -> &'static str {
        if (53000..60000).contains(&self.0) {
            "ESRI"
        } else {
            "EPSG"
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority(), self.0)
    }
}

/// An immutable point tagged with the CRS its coordinates are expressed in.
///
/// For geographic systems `x` is the longitude and `y` the latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    x: f64,
    y: f64,
    crs: Crs,
}

impl GeoPoint {
    pub fn new(x: f64, y: f64, crs: Crs) -> Self {
        Self { x, y, crs }
    }

    pub fn lon_lat(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, Crs::WGS84)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Planar distance to `other`. Only meaningful in a projected CRS; returns
    /// `None` when the two points are in different systems.
    pub fn distance(&self, other: &GeoPoint) -> Option<f64> {
        (self.crs == other.crs).then(|| (self.x - other.x).hypot(self.y - other.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crs_display_uses_authority_prefix() {
        assert_eq!(Crs::WGS84.to_string(), "EPSG:4326");
        assert_eq!(Crs::WORLD_MOLLWEIDE.to_string(), "ESRI:54009");
        assert_eq!(Crs::new(3035).to_string(), "EPSG:3035");
    }

    #[test]
    fn default_crs_is_wgs84() {
        assert_eq!(Crs::default(), Crs::WGS84);
    }

    #[test]
    fn distance_requires_matching_crs() {
        let a = GeoPoint::new(0.0, 0.0, Crs::WORLD_MOLLWEIDE);
        let b = GeoPoint::new(3.0, 4.0, Crs::WORLD_MOLLWEIDE);
        let c = GeoPoint::new(3.0, 4.0, Crs::WGS84);
        assert_eq!(a.distance(&b), Some(5.0));
        assert_eq!(a.distance(&c), None);
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(GeoPoint::lon_lat(10.0, 20.0).is_finite());
        assert!(!GeoPoint::lon_lat(f64::NAN, 20.0).is_finite());
    }
}
