use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, span, Level};

use crate::config::constant::{
    QIEA_ELITE_COUNT, QIEA_LEARNING_RATE, QIEA_LOG_INTERVAL, QIEA_MAX_GENERATIONS,
    QIEA_MUTATION_RATE, QIEA_MUTATION_SIGMA, QIEA_POPULATION_SIZE,
};
use crate::domain::result::{AlgorithmParams, IterationEntry, RouteResult};
use crate::domain::types::{Algorithm, ProblemInstance};
use crate::error::OptimizerError;
use crate::evaluation::cost::{route_distance, route_time};
use crate::evaluation::objective;
use crate::solver::construction::{
    farthest_insertion, nearest_neighbor, random_route, stochastic_walk,
};
use crate::solver::{trivial_result, CancelFlag};

/// Transition-affinity matrix of one quantum individual: `q[i][j]` in
/// [0, 1] is the unnormalized appetite for visiting j right after i.
type QuantumState = Vec<Vec<f64>>;

fn params() -> AlgorithmParams {
    AlgorithmParams::Qiea {
        method: "qiea",
        population_size: QIEA_POPULATION_SIZE,
        generations: QIEA_MAX_GENERATIONS,
        mutation_rate: QIEA_MUTATION_RATE,
        strategy: "exploration_focused",
        objective_weights: "0.5*distance + 0.3*time + 0.2*diversity",
    }
}

/// Quantum-inspired evolutionary search: a population of affinity
/// matrices is repeatedly collapsed into classical tours, and the best
/// tours reinforce the transitions they used. Generation 0 seeds the
/// population with four different construction heuristics for diversity.
pub fn optimize(
    pi: &ProblemInstance,
    seed: u64,
    cancel: &CancelFlag,
) -> Result<RouteResult, OptimizerError> {
    let span = span!(Level::DEBUG, "qiea", n = pi.len(), seed);
    let _guard = span.enter();

    let n = pi.len();
    if n <= 2 {
        return Ok(trivial_result(Algorithm::Qiea, pi, seed, params()));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mutation_noise = Normal::new(0.0, QIEA_MUTATION_SIGMA)
        .map_err(|e| OptimizerError::Internal(e.to_string()))?;

    let mut population: Vec<QuantumState> = (0..QIEA_POPULATION_SIZE)
        .map(|_| {
            (0..n)
                .map(|_| (0..n).map(|_| rng.gen::<f64>()).collect())
                .collect()
        })
        .collect();

    let mut best_route: Option<Vec<usize>> = None;
    let mut best_objective = f64::INFINITY;
    let mut iterations_log = vec![];

    for generation in 0..QIEA_MAX_GENERATIONS {
        cancel.check()?;

        let mut solutions: Vec<(Vec<usize>, f64)> = Vec::with_capacity(QIEA_POPULATION_SIZE);
        for (k, quantum) in population.iter().enumerate() {
            let route = if generation == 0 {
                match k % 4 {
                    0 => random_route(n, &mut rng),
                    1 => nearest_neighbor(&pi.time_matrix),
                    2 => nearest_neighbor(&pi.distance_matrix),
                    _ => farthest_insertion(&pi.distance_matrix),
                }
            } else {
                stochastic_walk(quantum, &mut rng)
            };

            let route_objective = objective::qiea(&route, pi);
            if route_objective < best_objective {
                best_objective = route_objective;
                best_route = Some(route.clone());
                debug!(
                    "new best in generation {}: {:.3}",
                    generation, best_objective
                );
            }
            solutions.push((route, route_objective));
        }

        let mut ranked: Vec<&(Vec<usize>, f64)> = solutions.iter().collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let elites: Vec<&Vec<usize>> = ranked
            .iter()
            .take(QIEA_ELITE_COUNT)
            .map(|s| &s.0)
            .collect();

        for (k, quantum) in population.iter_mut().enumerate() {
            // Three reinforcement regimes: top elites, mid-rank elites,
            // every third elite.
            match k % 3 {
                0 => {
                    for route in elites.iter().take(3) {
                        reinforce(quantum, route);
                    }
                }
                1 => {
                    for route in elites.iter().skip(5).take(3) {
                        reinforce(quantum, route);
                    }
                }
                _ => {
                    for route in elites.iter().step_by(3) {
                        reinforce(quantum, route);
                    }
                }
            }

            if rng.gen::<f64>() < QIEA_MUTATION_RATE {
                for i in 0..n {
                    for j in 0..n {
                        if i != j {
                            quantum[i][j] =
                                (quantum[i][j] + mutation_noise.sample(&mut rng)).clamp(0.0, 1.0);
                        }
                    }
                }
            }
        }

        if generation % QIEA_LOG_INTERVAL == 0 {
            iterations_log.push(IterationEntry::Qiea {
                iter: generation,
                objective: best_objective,
                population_diversity: population_diversity(&population),
            });
        }
    }

    let best_route =
        best_route.ok_or_else(|| OptimizerError::Internal("no route materialized".into()))?;

    Ok(RouteResult {
        route_order: pi.ids_for(&best_route),
        polyline: String::new(),
        distance_km: route_distance(&best_route, &pi.distance_matrix),
        time_min: route_time(&best_route, &pi.time_matrix),
        objective_value: best_objective,
        iterations_log,
        seed,
        algorithm_params: params(),
        error: None,
    })
}

/// Nudge the transitions used by `route` toward certainty.
fn reinforce(quantum: &mut QuantumState, route: &[usize]) {
    for pair in route.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        quantum[a][b] = (quantum[a][b] + QIEA_LEARNING_RATE).min(1.0);
    }
}

/// Mean over individual pairs of the mean absolute entry difference.
/// Pair results are collected in order and reduced sequentially so the
/// value is reproducible run to run.
fn population_diversity(population: &[QuantumState]) -> f64 {
    if population.len() < 2 {
        return 0.0;
    }

    let pairs: Vec<(usize, usize)> = (0..population.len()).tuple_combinations().collect();
    let diversities: Vec<f64> = pairs
        .par_iter()
        .map(|&(a, b)| mean_abs_diff(&population[a], &population[b]))
        .collect();

    diversities.iter().sum::<f64>() / diversities.len() as f64
}

fn mean_abs_diff(a: &QuantumState, b: &QuantumState) -> f64 {
    let n = a.len();
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            total += (a[i][j] - b[i][j]).abs();
        }
    }
    total / (n * n) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_support::{assert_permutation, symmetric};

    fn four_stop_instance() -> ProblemInstance {
        symmetric(
            vec![
                vec![0.0, 10.0, 5.0, 8.0],
                vec![10.0, 0.0, 3.0, 4.0],
                vec![5.0, 3.0, 0.0, 6.0],
                vec![8.0, 4.0, 6.0, 0.0],
            ],
            Some(42),
        )
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let pi = four_stop_instance();
        let first = optimize(&pi, 42, &CancelFlag::new()).unwrap();
        let second = optimize(&pi, 42, &CancelFlag::new()).unwrap();

        assert_eq!(first.route_order, second.route_order);
        assert_eq!(first.objective_value, second.objective_value);
        assert_eq!(first.iterations_log, second.iterations_log);
    }

    #[test]
    fn log_cadence_and_diversity_are_sane() {
        let pi = four_stop_instance();
        let result = optimize(&pi, 42, &CancelFlag::new()).unwrap();

        assert_eq!(result.iterations_log.len(), 10);
        for (k, entry) in result.iterations_log.iter().enumerate() {
            assert_eq!(entry.iter(), k * 25);
            let IterationEntry::Qiea {
                population_diversity,
                ..
            } = entry
            else {
                panic!("unexpected entry variant");
            };
            assert!(*population_diversity >= 0.0);
            assert!(*population_diversity <= 1.0);
        }
    }

    #[test]
    fn objective_matches_published_formula() {
        let pi = four_stop_instance();
        let result = optimize(&pi, 17, &CancelFlag::new()).unwrap();

        let order: Vec<usize> = result
            .route_order
            .iter()
            .map(|id| id[1..].parse::<usize>().unwrap())
            .collect();
        assert_permutation(&order, 4);

        let recomputed = objective::qiea(&order, &pi);
        assert!((result.objective_value - recomputed).abs() < 1e-9);
    }

    #[test]
    fn reinforce_saturates_at_one() {
        let mut quantum = vec![vec![0.95; 3]; 3];
        reinforce(&mut quantum, &[0, 1, 2]);
        assert_eq!(quantum[0][1], 1.0);
        assert_eq!(quantum[1][2], 1.0);
        assert_eq!(quantum[0][2], 0.95);
    }

    #[test]
    fn diversity_of_identical_population_is_zero() {
        let population = vec![vec![vec![0.5; 4]; 4]; 3];
        assert_eq!(population_diversity(&population), 0.0);
    }
}
