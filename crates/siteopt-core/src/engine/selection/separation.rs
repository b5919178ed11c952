use super::Candidate;
use itertools::Itertools;
use nalgebra::{Point2, distance};

/// Keeps candidates in order, dropping any closer than `min_distance` to an earlier
/// kept candidate or to a fixed site. Returns the kept list and the number dropped.
pub fn filter_by_separation(
    candidates: Vec<Candidate>,
    fixed: &[Point2<f64>],
    min_distance: f64,
) -> (Vec<Candidate>, usize) {
    if min_distance <= 0.0 {
        return (candidates, 0);
    }
    let total = candidates.len();
    let mut kept: Vec<Candidate> = Vec::with_capacity(total);
    for candidate in candidates {
        let too_close = fixed
            .iter()
            .chain(kept.iter().map(|c| &c.position))
            .any(|other| distance(&candidate.position, other) < min_distance);
        if !too_close {
            kept.push(candidate);
        }
    }
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Smallest distance between any two points, or `None` for fewer than two.
pub fn min_pairwise_distance(points: &[Point2<f64>]) -> Option<f64> {
    points
        .iter()
        .tuple_combinations()
        .map(|(a, b)| distance(a, b))
        .min_by(f64::total_cmp)
}
