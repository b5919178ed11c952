use super::repair::separate;
use super::{Candidate, SelectionInput, SelectionOutcome, SiteSelector};
use crate::engine::config::ClusterConfig;
use crate::engine::deadline::Deadline;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::SelectionWarning;
use crate::engine::utils::sampling::separated_weighted_seeds;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point2, distance};
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Weighted k-means over positive-demand cells, followed by distance repair.
pub struct WeightedClusteringSelector<R: Rng> {
    config: ClusterConfig,
    rng: R,
}

impl WeightedClusteringSelector<StdRng> {
    /// Seeds the RNG from `config.seed`, or from OS entropy when unset.
    pub fn from_config(config: ClusterConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }
}

impl<R: Rng> WeightedClusteringSelector<R> {
    pub fn with_rng(config: ClusterConfig, rng: R) -> Self {
        Self { config, rng }
    }
}

struct WeightedPoints {
    positions: Vec<Point2<f64>>,
    weights: Vec<f64>,
}

impl WeightedPoints {
    fn collect(input: &SelectionInput<'_>) -> Self {
        let geometry = input.demand.geometry();
        let (positions, weights) = input
            .demand
            .iter_cells()
            .filter(|&(col, row, v)| v > 0.0 && input.is_eligible(col, row))
            .map(|(col, row, v)| {
                let (x, y) = geometry.cell_center(col, row);
                (Point2::new(x, y), v)
            })
            .unzip();
        Self { positions, weights }
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl<R: Rng> SiteSelector for WeightedClusteringSelector<R> {
    fn name(&self) -> &'static str {
        "weighted-clustering"
    }

    #[instrument(skip_all, name = "weighted_clustering", fields(count = input.count, min_distance = input.min_distance))]
    fn select(
        &mut self,
        input: &SelectionInput<'_>,
        reporter: &ProgressReporter,
    ) -> Result<SelectionOutcome, EngineError> {
        let mut outcome = SelectionOutcome::empty();
        let points = WeightedPoints::collect(input);
        if points.is_empty() || input.count == 0 {
            debug!("No positive-demand cell to cluster.");
            return Ok(outcome);
        }

        let k = input.count.min(points.len());
        let seeds = separated_weighted_seeds(
            &points.positions,
            &points.weights,
            k,
            input.existing,
            input.min_distance,
            self.config.max_seed_attempts,
            &mut self.rng,
        )
        .map_err(|e| EngineError::Internal(format!("cluster seeding failed: {e}")))?;

        if seeds.len() < k {
            warn!(
                requested = k,
                seeded = seeds.len(),
                "Could not place every cluster seed at the minimum distance."
            );
            outcome.warnings.push(SelectionWarning::SeedingShortfall {
                requested: k,
                seeded: seeds.len(),
            });
        }
        if seeds.is_empty() {
            return Ok(outcome);
        }
        info!(
            points = points.len(),
            k = seeds.len(),
            "Running weighted k-means."
        );

        let (centroids, assigned) =
            weighted_kmeans(&points, seeds, &self.config, &input.deadline, reporter)?;
        let (mut centroids, assigned, dropped) = drop_empty_clusters(centroids, assigned);
        if dropped > 0 {
            warn!(dropped, "Dropping centroids whose clusters emptied during k-means.");
            outcome
                .warnings
                .push(SelectionWarning::EmptyClustersDropped { dropped });
        }

        input.deadline.check("distance repair")?;
        let report = separate(
            &mut centroids,
            input.existing,
            input.min_distance,
            self.config.max_repair_passes,
        );
        if !report.converged {
            warn!(
                passes = report.passes,
                "Minimum-distance repair did not converge; returning best-effort positions."
            );
            outcome.converged = false;
            outcome.warnings.push(SelectionWarning::RepairNotConverged {
                passes: report.passes,
            });
        }

        let mut candidates: Vec<Candidate> = centroids
            .into_iter()
            .zip(assigned)
            .map(|(position, score)| Candidate { position, score })
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        if let Some(clip) = input.clip {
            for (index, candidate) in candidates.iter().enumerate() {
                if !clip.contains_point(candidate.position.x, candidate.position.y) {
                    warn!(index, "Repaired site lies outside the region.");
                    outcome
                        .warnings
                        .push(SelectionWarning::CentroidOutsideRegion { index });
                }
            }
        }

        outcome.candidates = candidates;
        Ok(outcome)
    }
}

/// Keeps only centroids that ended with assigned demand.
fn drop_empty_clusters(
    centroids: Vec<Point2<f64>>,
    assigned: Vec<f64>,
) -> (Vec<Point2<f64>>, Vec<f64>, usize) {
    let before = centroids.len();
    let (centroids, assigned): (Vec<_>, Vec<_>) = centroids
        .into_iter()
        .zip(assigned)
        .filter(|(_, weight)| *weight > 0.0)
        .unzip();
    let dropped = before - centroids.len();
    (centroids, assigned, dropped)
}

#[cfg(feature = "parallel")]
fn nearest_indices(tree: &KdTree<f64, 2>, positions: &[Point2<f64>]) -> Vec<usize> {
    positions
        .par_iter()
        .map(|p| tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y]).item as usize)
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn nearest_indices(tree: &KdTree<f64, 2>, positions: &[Point2<f64>]) -> Vec<usize> {
    positions
        .iter()
        .map(|p| tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y]).item as usize)
        .collect()
}

/// Lloyd iterations with demand weights. Returns the final centroids and the total
/// weight assigned to each.
fn weighted_kmeans(
    points: &WeightedPoints,
    mut centroids: Vec<Point2<f64>>,
    config: &ClusterConfig,
    deadline: &Deadline,
    reporter: &ProgressReporter,
) -> Result<(Vec<Point2<f64>>, Vec<f64>), EngineError> {
    let k = centroids.len();
    let mut assigned = vec![0.0; k];

    reporter.report(Progress::TaskStart {
        total_steps: config.max_iterations as u64,
        unit: "iterations",
    });
    for iteration in 0..config.max_iterations {
        deadline.check("clustering")?;

        let coords: Vec<[f64; 2]> = centroids.iter().map(|c| [c.x, c.y]).collect();
        let tree: KdTree<f64, 2> = (&coords).into();
        let nearest = nearest_indices(&tree, &points.positions);

        let mut sums = vec![(0.0, 0.0, 0.0); k];
        for ((position, weight), &cluster) in points
            .positions
            .iter()
            .zip(&points.weights)
            .zip(&nearest)
        {
            let entry = &mut sums[cluster];
            entry.0 += weight * position.x;
            entry.1 += weight * position.y;
            entry.2 += weight;
        }

        let mut max_move: f64 = 0.0;
        for (j, (sx, sy, w)) in sums.into_iter().enumerate() {
            assigned[j] = w;
            if w > 0.0 {
                let updated = Point2::new(sx / w, sy / w);
                max_move = max_move.max(distance(&centroids[j], &updated));
                centroids[j] = updated;
            }
        }
        reporter.report(Progress::TaskIncrement);

        if max_move < config.tolerance {
            debug!(iteration, max_move, "k-means converged.");
            break;
        }
    }
    reporter.report(Progress::TaskFinish);

    Ok((centroids, assigned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::grid::{Grid, GridGeometry};
    use crate::core::models::point::Crs;
    use crate::core::models::region::Region;
    use crate::engine::selection::separation::min_pairwise_distance;

    fn demand_with_blobs() -> Grid {
        let mut grid = Grid::zeros(GridGeometry::new(
            40,
            40,
            0.0,
            0.0,
            10.0,
            Crs::WORLD_MOLLWEIDE,
        ));
        for (cx, cy, peak) in [(8usize, 8usize, 50.0), (30, 10, 40.0), (20, 32, 30.0)] {
            for dy in 0..5 {
                for dx in 0..5 {
                    grid.set(cx + dx - 2, cy + dy - 2, peak - 5.0 * (dx.abs_diff(2) + dy.abs_diff(2)) as f64);
                }
            }
        }
        grid
    }

    fn input<'a>(demand: &'a Grid, count: usize, min_distance: f64) -> SelectionInput<'a> {
        SelectionInput {
            demand,
            count,
            min_distance,
            clip: None,
            existing: &[],
            deadline: Deadline::none(),
        }
    }

    fn config(seed: u64) -> ClusterConfig {
        ClusterConfig {
            seed: Some(seed),
            ..ClusterConfig::default()
        }
    }

    fn run(seed: u64, input: &SelectionInput<'_>) -> SelectionOutcome {
        WeightedClusteringSelector::from_config(config(seed))
            .select(input, &ProgressReporter::new())
            .unwrap()
    }

    #[test]
    fn converged_output_respects_min_distance() {
        let demand = demand_with_blobs();
        let outcome = run(17, &input(&demand, 6, 120.0));

        assert!(outcome.converged);
        assert!(!outcome.candidates.is_empty());
        let positions: Vec<Point2<f64>> = outcome.candidates.iter().map(|c| c.position).collect();
        if let Some(min) = min_pairwise_distance(&positions) {
            assert!(min >= 120.0 - 1e-6, "closest pair {min}");
        }
    }

    #[test]
    fn existing_sites_are_kept_at_distance() {
        let demand = demand_with_blobs();
        let existing = [Point2::new(85.0, 85.0)];
        let input = SelectionInput {
            existing: &existing,
            ..input(&demand, 3, 100.0)
        };
        let outcome = run(5, &input);
        assert!(outcome.converged);
        for candidate in &outcome.candidates {
            assert!(distance(&candidate.position, &existing[0]) >= 100.0 - 1e-6);
        }
    }

    #[test]
    fn fixed_seed_gives_identical_output() {
        let demand = demand_with_blobs();
        let a = run(99, &input(&demand, 4, 50.0));
        let b = run(99, &input(&demand, 4, 50.0));
        assert_eq!(a, b);
    }

    #[test]
    fn sites_are_ranked_by_assigned_weight() {
        let demand = demand_with_blobs();
        let outcome = run(3, &input(&demand, 3, 0.0));
        let scores: Vec<f64> = outcome.candidates.iter().map(|c| c.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        let total: f64 = scores.iter().sum();
        assert!((total - demand.sum()).abs() < 1e-6);
    }

    #[test]
    fn k_is_capped_by_point_count() {
        let mut demand = Grid::zeros(GridGeometry::new(5, 5, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE));
        demand.set(0, 0, 1.0);
        demand.set(4, 4, 2.0);
        let outcome = run(1, &input(&demand, 10, 0.0));
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].position, Point2::new(4.5, 4.5));
        assert_eq!(outcome.candidates[0].score, 2.0);
    }

    #[test]
    fn all_zero_demand_yields_nothing() {
        let demand = Grid::zeros(GridGeometry::new(20, 20, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE));
        let outcome = run(1, &input(&demand, 5, 2.0));
        assert!(outcome.candidates.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn crowded_seeds_report_shortfall() {
        let mut demand = Grid::zeros(GridGeometry::new(3, 1, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE));
        demand.set(0, 0, 1.0);
        demand.set(1, 0, 1.0);
        demand.set(2, 0, 1.0);
        let outcome = run(8, &input(&demand, 3, 100.0));
        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome
            .warnings
            .contains(&SelectionWarning::SeedingShortfall {
                requested: 3,
                seeded: 1
            }));
    }

    #[test]
    fn centroids_with_no_assigned_demand_are_dropped() {
        let centroids = vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 5.0),
            Point2::new(9.0, 1.0),
        ];
        let (kept, weights, dropped) = drop_empty_clusters(centroids, vec![4.0, 0.0, 2.5]);

        assert_eq!(dropped, 1);
        assert_eq!(kept, vec![Point2::new(0.0, 0.0), Point2::new(9.0, 1.0)]);
        assert_eq!(weights, vec![4.0, 2.5]);
    }

    #[test]
    fn repaired_sites_outside_region_are_reported_not_clipped() {
        let mut demand = Grid::zeros(GridGeometry::new(6, 1, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE));
        demand.set(0, 0, 9.0);
        demand.set(5, 0, 1.0);
        let region =
            Region::polygon(vec![(0.0, 0.0), (6.0, 0.0), (6.0, 1.0), (0.0, 1.0)], vec![]).unwrap();
        let existing = [Point2::new(0.5, -3.0)];
        let input = SelectionInput {
            clip: region.clip(),
            existing: &existing,
            ..input(&demand, 2, 4.5)
        };
        let outcome = run(2, &input);

        assert_eq!(outcome.candidates.len(), 1);
        let site = outcome.candidates[0].position;
        assert!(distance(&site, &existing[0]) >= 4.5 - 1e-9);
        assert!(site.y > 1.0);
        assert!(outcome
            .warnings
            .contains(&SelectionWarning::CentroidOutsideRegion { index: 0 }));
    }
}
