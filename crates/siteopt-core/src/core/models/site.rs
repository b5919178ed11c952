use super::point::GeoPoint;

/// A facility location, either already in place or newly proposed.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilitySite {
    pub location: GeoPoint,
    pub name: Option<String>,
    pub id: Option<String>,
    /// Relative "already served" influence of the facility; `None` means 1.
    pub weight: Option<f64>,
}

impl FacilitySite {
    pub fn new(location: GeoPoint) -> Self {
        Self {
            location,
            name: None,
            id: None,
            weight: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Non-finite weights count as 1; negative weights as 0, so a facility never
    /// raises demand around itself.
    pub fn effective_weight(&self) -> f64 {
        self.weight
            .filter(|w| w.is_finite())
            .map_or(1.0, |w| w.max(0.0))
    }

    /// Same metadata, different location (used when reprojecting).
    pub fn relocated(&self, location: GeoPoint) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }
}

/// A proposed site together with its ranking score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSite {
    pub site: FacilitySite,
    /// Population reach of the site, in the units of the demand grid.
    pub score: f64,
}

impl ScoredSite {
    pub fn new(site: FacilitySite, score: f64) -> Self {
        Self { site, score }
    }

    pub fn location(&self) -> GeoPoint {
        self.site.location
    }
}
