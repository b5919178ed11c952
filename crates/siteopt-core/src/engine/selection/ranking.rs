use crate::core::models::grid::Grid;
use itertools::Itertools;
use nalgebra::{Point2, distance};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Population reachable from cell `(col, row)`, linearly discounted with distance.
///
/// Sums `population[c] * (1 - d / min_distance)` over every cell `c` whose centre
/// lies within `min_distance` of the centre of `(col, row)`. With a non-positive
/// `min_distance` only the cell itself counts.
pub fn reach_score(population: &Grid, col: usize, row: usize, min_distance: f64) -> f64 {
    if min_distance.is_nan() || min_distance <= 0.0 {
        return population.get(col, row);
    }
    let geometry = population.geometry();
    let reach_x = (min_distance / geometry.cell_width).ceil() as usize;
    let reach_y = (min_distance / geometry.cell_height).ceil() as usize;
    let col_lo = col.saturating_sub(reach_x);
    let col_hi = (col + reach_x).min(geometry.width - 1);
    let row_lo = row.saturating_sub(reach_y);
    let row_hi = (row + reach_y).min(geometry.height - 1);

    (row_lo..=row_hi)
        .cartesian_product(col_lo..=col_hi)
        .map(|(r, c)| {
            let dx = (c as f64 - col as f64) * geometry.cell_width;
            let dy = (r as f64 - row as f64) * geometry.cell_height;
            let d = dx.hypot(dy);
            if d <= min_distance {
                population.get(c, r) * (1.0 - d / min_distance)
            } else {
                0.0
            }
        })
        .sum()
}

/// Scores every position, then keeps up to `top_n` of them greedily in descending
/// score order, skipping any closer than `min_distance` to one already kept.
///
/// Returns `(input index, score)` pairs, best first. Ties keep input order and
/// positions outside the grid score zero.
#[instrument(skip_all, name = "rank_candidates", fields(candidates = positions.len(), top_n))]
pub fn rank_candidates(
    population: &Grid,
    positions: &[Point2<f64>],
    min_distance: f64,
    top_n: usize,
) -> Vec<(usize, f64)> {
    let geometry = population.geometry();
    let score_of = |p: &Point2<f64>| match geometry.cell_of(p.x, p.y) {
        Some((col, row)) => reach_score(population, col, row, min_distance),
        None => 0.0,
    };

    #[cfg(feature = "parallel")]
    let scores: Vec<f64> = positions.par_iter().map(score_of).collect();
    #[cfg(not(feature = "parallel"))]
    let scores: Vec<f64> = positions.iter().map(score_of).collect();

    let order: Vec<usize> = (0..positions.len())
        .sorted_by(|&a, &b| scores[b].total_cmp(&scores[a]))
        .collect();

    let mut kept: Vec<(usize, f64)> = Vec::with_capacity(top_n.min(positions.len()));
    for index in order {
        if kept.len() >= top_n {
            break;
        }
        let too_close = kept
            .iter()
            .any(|&(other, _)| distance(&positions[index], &positions[other]) < min_distance);
        if too_close {
            debug!(index, "Candidate skipped; too close to a better one.");
            continue;
        }
        kept.push((index, scores[index]));
    }
    kept
}
