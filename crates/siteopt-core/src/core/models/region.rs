use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, Contains, Coord, Line, LineString, Point, Polygon};
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RegionError {
    #[error("Region polygon has no vertices")]
    Empty,
    #[error("Region polygon ring has only {0} distinct vertices, at least 3 are required")]
    TooFewVertices(usize),
    #[error("Region polygon contains non-finite coordinates")]
    NonFinite,
    #[error("Region polygon has zero area")]
    ZeroArea,
    #[error("Region polygon ring is self-intersecting (segments {first} and {second})")]
    SelfIntersecting { first: usize, second: usize },
}

/// Capability answering whether a point lies inside an area of interest.
pub trait PolygonTest {
    fn contains_point(&self, x: f64, y: f64) -> bool;
}

/// Axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Smallest envelope covering every point, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |acc, (x, y)| match acc {
            None => Some(Self::new(x, y, x, y)),
            Some(env) => Some(Self {
                min_x: env.min_x.min(x),
                min_y: env.min_y.min(y),
                max_x: env.max_x.max(x),
                max_y: env.max_y.max(y),
            }),
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Grows the envelope by `dx` on the left and right and `dy` on the bottom and top.
    pub fn expand_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl PolygonTest for Envelope {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        self.contains(x, y)
    }
}

impl PolygonTest for Polygon<f64> {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        self.contains(&Point::new(x, y))
    }
}

/// The area of interest, expressed in the working CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Envelope(Envelope),
    Polygon(Polygon<f64>),
}

impl Region {
    /// Builds a validated polygon region from an exterior ring and optional holes.
    /// Rings may be given open or closed.
    pub fn polygon(
        exterior: Vec<(f64, f64)>,
        interiors: Vec<Vec<(f64, f64)>>,
    ) -> Result<Self, RegionError> {
        let exterior = validated_ring(exterior)?;
        let interiors = interiors
            .into_iter()
            .map(validated_ring)
            .collect::<Result<Vec<_>, _>>()?;

        let polygon = Polygon::new(exterior, interiors);
        if polygon.unsigned_area() <= 0.0 {
            return Err(RegionError::ZeroArea);
        }
        Ok(Region::Polygon(polygon))
    }

    pub fn envelope(&self) -> Envelope {
        match self {
            Region::Envelope(env) => *env,
            Region::Polygon(polygon) => {
                Envelope::from_points(polygon.exterior().coords().map(|c| (c.x, c.y)))
                    .unwrap_or(Envelope::new(0.0, 0.0, 0.0, 0.0))
            }
        }
    }

    /// The clip to apply to grid cells. Envelopes clip too: the grid is rounded up
    /// to whole cells, so its last row and column can reach past the envelope.
    pub fn clip(&self) -> Option<&(dyn PolygonTest + Sync)> {
        match self {
            Region::Envelope(envelope) => Some(envelope),
            Region::Polygon(polygon) => Some(polygon),
        }
    }
}

impl PolygonTest for Region {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        match self {
            Region::Envelope(env) => env.contains(x, y),
            Region::Polygon(polygon) => polygon.contains_point(x, y),
        }
    }
}

fn validated_ring(points: Vec<(f64, f64)>) -> Result<LineString<f64>, RegionError> {
    if points.is_empty() {
        return Err(RegionError::Empty);
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(RegionError::NonFinite);
    }

    let mut coords: Vec<Coord<f64>> = points
        .into_iter()
        .map(|(x, y)| Coord { x, y })
        .dedup()
        .collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Err(RegionError::TooFewVertices(coords.len()));
    }

    let mut ring = LineString::new(coords);
    ring.close();
    check_simple(&ring)?;
    Ok(ring)
}

fn check_simple(ring: &LineString<f64>) -> Result<(), RegionError> {
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();

    for (i, j) in (0..n).tuple_combinations() {
        let adjacent = j == i + 1 || (i == 0 && j == n - 1);
        match line_intersection(segments[i], segments[j]) {
            None => {}
            Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
            Some(LineIntersection::Collinear { intersection })
                if adjacent && intersection.start == intersection.end => {}
            Some(_) => {
                return Err(RegionError::SelfIntersecting {
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)]
    }

    #[test]
    fn envelope_from_points_covers_all_points() {
        let env = Envelope::from_points(vec![(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]).unwrap();
        assert_eq!(env, Envelope::new(-2.0, -1.0, 4.0, 5.0));
        assert!(Envelope::from_points(Vec::new()).is_none());
    }

    #[test]
    fn envelope_expands_on_every_side() {
        let env = Envelope::new(0.0, 0.0, 10.0, 20.0).expand_by(1.0, 2.0);
        assert_eq!(env, Envelope::new(-1.0, -2.0, 11.0, 22.0));
        assert_eq!(env.width(), 12.0);
        assert_eq!(env.height(), 24.0);
    }

    #[test]
    fn polygon_region_accepts_open_and_closed_rings() {
        let open = Region::polygon(square(10.0), vec![]).unwrap();
        let mut closed_ring = square(10.0);
        closed_ring.push((0.0, 0.0));
        let closed = Region::polygon(closed_ring, vec![]).unwrap();
        assert_eq!(open, closed);
        assert_eq!(open.envelope(), Envelope::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn polygon_region_contains_interior_points_only() {
        let region = Region::polygon(vec![(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], vec![]).unwrap();
        assert!(region.contains_point(2.0, 2.0));
        assert!(!region.contains_point(8.0, 8.0));
        assert!(region.clip().is_some());
    }

    #[test]
    fn polygon_with_hole_excludes_hole_interior() {
        let hole = vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)];
        let region = Region::polygon(square(10.0), vec![hole]).unwrap();
        assert!(region.contains_point(1.0, 1.0));
        assert!(!region.contains_point(5.0, 5.0));
    }

    #[test]
    fn empty_polygon_is_rejected() {
        assert_eq!(Region::polygon(vec![], vec![]), Err(RegionError::Empty));
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let result = Region::polygon(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)], vec![]);
        assert_eq!(result, Err(RegionError::TooFewVertices(2)));

        let collinear = Region::polygon(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], vec![]);
        assert!(collinear.is_err());
    }

    #[test]
    fn bow_tie_polygon_is_self_intersecting() {
        let bow_tie = vec![(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)];
        let result = Region::polygon(bow_tie, vec![]);
        assert!(matches!(result, Err(RegionError::SelfIntersecting { .. })));
    }

    #[test]
    fn non_finite_vertices_are_rejected() {
        let result = Region::polygon(vec![(0.0, 0.0), (f64::NAN, 0.0), (0.0, 1.0)], vec![]);
        assert_eq!(result, Err(RegionError::NonFinite));
    }

    #[test]
    fn envelope_region_clips_to_its_bounds() {
        let region = Region::Envelope(Envelope::new(0.0, 0.0, 5.0, 5.0));
        let clip = region.clip().unwrap();
        assert!(clip.contains_point(5.0, 5.0));
        assert!(clip.contains_point(2.5, 0.0));
        assert!(!clip.contains_point(5.1, 5.0));
        assert!(!clip.contains_point(2.0, -0.5));
    }
}
