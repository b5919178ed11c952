use nalgebra::{Point2, distance};
use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;
use tracing::{instrument, trace};

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Input weight list is empty, cannot perform sampling")]
    EmptyWeights,
    #[error("Weights and positions differ in length ({weights} vs {positions})")]
    LengthMismatch { weights: usize, positions: usize },
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Picks up to `k` positions by demand-weighted sampling, rejecting any draw closer
/// than `min_distance` to a `blocked` point or an earlier pick.
///
/// Each pick gets at most `max_attempts` draws; when one runs out, sampling stops
/// and the shorter list is returned.
#[instrument(level = "trace", skip_all, fields(k, min_distance))]
pub fn separated_weighted_seeds(
    positions: &[Point2<f64>],
    weights: &[f64],
    k: usize,
    blocked: &[Point2<f64>],
    min_distance: f64,
    max_attempts: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Point2<f64>>, SamplingError> {
    if positions.len() != weights.len() {
        return Err(SamplingError::LengthMismatch {
            weights: weights.len(),
            positions: positions.len(),
        });
    }
    if positions.is_empty() {
        return Err(SamplingError::EmptyWeights);
    }
    let dist = WeightedIndex::new(weights)?;

    let mut seeds: Vec<Point2<f64>> = Vec::with_capacity(k);
    while seeds.len() < k {
        let accepted = (0..max_attempts.max(1)).find_map(|_| {
            let candidate = positions[dist.sample(&mut *rng)];
            let rejected = blocked.iter().chain(seeds.iter()).any(|other| {
                let d = distance(&candidate, other);
                d < min_distance || d == 0.0
            });
            (!rejected).then_some(candidate)
        });
        match accepted {
            Some(seed) => seeds.push(seed),
            None => {
                trace!(seeded = seeds.len(), "Seed attempts exhausted.");
                break;
            }
        }
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn empty_or_all_zero_weights_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            separated_weighted_seeds(&[], &[], 1, &[], 0.0, 8, &mut rng),
            Err(SamplingError::EmptyWeights)
        ));
        let positions = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(matches!(
            separated_weighted_seeds(&positions, &[0.0, 0.0], 1, &[], 0.0, 8, &mut rng),
            Err(SamplingError::DistributionError { .. })
        ));
        assert!(matches!(
            separated_weighted_seeds(&positions, &[1.0], 1, &[], 0.0, 8, &mut rng),
            Err(SamplingError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn zero_weight_positions_are_never_seeded() {
        let positions = [Point2::new(0.0, 0.0), Point2::new(5.0, 0.0), Point2::new(9.0, 0.0)];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let seeds =
                separated_weighted_seeds(&positions, &[0.0, 2.0, 0.0], 1, &[], 0.0, 8, &mut rng)
                    .unwrap();
            assert_eq!(seeds, vec![Point2::new(5.0, 0.0)]);
        }
    }

    #[test]
    fn seeds_respect_min_distance_and_blocked_points() {
        let positions: Vec<Point2<f64>> = (0..50).map(|i| Point2::new(i as f64, 0.0)).collect();
        let weights = vec![1.0; 50];
        let blocked = [Point2::new(0.0, 0.0)];
        let mut rng = StdRng::seed_from_u64(42);

        let seeds =
            separated_weighted_seeds(&positions, &weights, 4, &blocked, 8.0, 500, &mut rng).unwrap();
        assert_eq!(seeds.len(), 4);
        for (i, a) in seeds.iter().enumerate() {
            assert!(distance(a, &blocked[0]) >= 8.0);
            for b in &seeds[i + 1..] {
                assert!(distance(a, b) >= 8.0);
            }
        }
    }

    #[test]
    fn seeding_stops_short_when_space_runs_out() {
        let positions = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let weights = vec![1.0, 1.0];
        let mut rng = StdRng::seed_from_u64(3);
        let seeds =
            separated_weighted_seeds(&positions, &weights, 2, &[], 10.0, 16, &mut rng).unwrap();
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let positions: Vec<Point2<f64>> = (0..30)
            .map(|i| Point2::new((i % 6) as f64 * 10.0, (i / 6) as f64 * 10.0))
            .collect();
        let weights: Vec<f64> = (0..30).map(|i| 1.0 + i as f64).collect();
        let a = separated_weighted_seeds(
            &positions,
            &weights,
            5,
            &[],
            5.0,
            64,
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();
        let b = separated_weighted_seeds(
            &positions,
            &weights,
            5,
            &[],
            5.0,
            64,
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
