use itertools::Itertools;
use nalgebra::{Point2, Vector2, distance};
use tracing::{debug, trace};

/// Golden angle in radians; spreads directions for coincident points.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairReport {
    /// Passes that found at least one violation.
    pub passes: usize,
    pub converged: bool,
}

fn fallback_direction(seed: usize) -> Vector2<f64> {
    let angle = seed as f64 * GOLDEN_ANGLE;
    Vector2::new(angle.cos(), angle.sin())
}

/// Unit vector from `from` towards `to`, or a deterministic direction if they coincide.
fn direction(from: &Point2<f64>, to: &Point2<f64>, seed: usize) -> Vector2<f64> {
    let delta = to - from;
    let norm = delta.norm();
    if norm > f64::EPSILON {
        delta / norm
    } else {
        fallback_direction(seed)
    }
}

/// Pushes `points` apart until every pair, and every point against each `fixed`
/// point, is at least `min_distance` apart.
///
/// A violating pair moves half the deficit each along the line joining them; a
/// point too close to a fixed site moves the full deficit away from it. Fixed sites
/// never move. Gives up after `max_passes`, leaving best-effort positions.
pub fn separate(
    points: &mut [Point2<f64>],
    fixed: &[Point2<f64>],
    min_distance: f64,
    max_passes: usize,
) -> RepairReport {
    if min_distance.is_nan() || min_distance <= 0.0 {
        return RepairReport {
            passes: 0,
            converged: true,
        };
    }
    let n = points.len();

    for pass in 0..max_passes {
        let mut violated = false;

        for (i, j) in (0..n).tuple_combinations() {
            let d = distance(&points[i], &points[j]);
            let deficit = min_distance - d;
            if deficit > SLACK {
                let dir = direction(&points[i], &points[j], i * n + j);
                let shift = dir * (deficit / 2.0);
                points[i] -= shift;
                points[j] += shift;
                violated = true;
            }
        }

        for (i, point) in points.iter_mut().enumerate() {
            for (f, anchor) in fixed.iter().enumerate() {
                let d = distance(point, anchor);
                let deficit = min_distance - d;
                if deficit > SLACK {
                    let dir = direction(anchor, point, i * fixed.len() + f + 1);
                    *point += dir * deficit;
                    violated = true;
                }
            }
        }

        if !violated {
            debug!(passes = pass, "Minimum-distance repair converged.");
            return RepairReport {
                passes: pass,
                converged: true,
            };
        }
        trace!(pass, "Repair pass moved at least one site.");
    }

    let converged = !has_violation(points, fixed, min_distance);
    RepairReport {
        passes: max_passes,
        converged,
    }
}

/// Whether any pair (or point/fixed pair) is closer than `min_distance`.
pub fn has_violation(points: &[Point2<f64>], fixed: &[Point2<f64>], min_distance: f64) -> bool {
    let pairwise = points
        .iter()
        .tuple_combinations()
        .any(|(a, b)| min_distance - distance(a, b) > SLACK);
    pairwise
        || points
            .iter()
            .any(|p| fixed.iter().any(|f| min_distance - distance(p, f) > SLACK))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn close_pair_is_pushed_apart_symmetrically() {
        let mut points = [Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)];
        let report = separate(&mut points, &[], 10.0, 1000);

        assert!(report.converged);
        assert_eq!(report.passes, 1);
        assert!(approx_eq(points[0].x, -2.5) && approx_eq(points[0].y, 0.0));
        assert!(approx_eq(points[1].x, 7.5) && approx_eq(points[1].y, 0.0));
        assert!(approx_eq(distance(&points[0], &points[1]), 10.0));
    }

    #[test]
    fn fixed_sites_never_move() {
        let fixed = [Point2::new(0.0, 0.0)];
        let mut points = [Point2::new(3.0, 4.0)];
        let report = separate(&mut points, &fixed, 10.0, 1000);

        assert!(report.converged);
        assert_eq!(fixed[0], Point2::new(0.0, 0.0));
        assert!(approx_eq(points[0].x, 6.0) && approx_eq(points[0].y, 8.0));
    }

    #[test]
    fn coincident_points_separate_deterministically() {
        let mut a = [Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)];
        let mut b = a;
        separate(&mut a, &[], 4.0, 1000);
        separate(&mut b, &[], 4.0, 1000);
        assert_eq!(a, b);
        assert!(distance(&a[0], &a[1]) >= 4.0 - 1e-9);
    }

    #[test]
    fn crowded_cluster_converges_to_valid_spacing() {
        let mut points: Vec<Point2<f64>> = (0..12)
            .map(|i| Point2::new((i % 4) as f64, (i / 4) as f64))
            .collect();
        let fixed = [Point2::new(1.5, 1.0)];
        let report = separate(&mut points, &fixed, 5.0, 1000);
        assert!(report.converged);
        assert!(!has_violation(&points, &fixed, 5.0));
    }

    #[test]
    fn exhausted_passes_report_non_convergence() {
        let mut points: Vec<Point2<f64>> = (0..8).map(|i| Point2::new(i as f64 * 0.1, 0.0)).collect();
        let report = separate(&mut points, &[], 50.0, 1);
        assert!(!report.converged);
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn zero_distance_needs_no_repair() {
        let mut points = [Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)];
        let report = separate(&mut points, &[], 0.0, 10);
        assert!(report.converged);
        assert_eq!(report.passes, 0);
    }
}
