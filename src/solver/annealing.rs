use rand::seq::{IteratorRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, span, Level};

use crate::config::constant::{
    SA_COOLING_RATE, SA_FINAL_TEMP, SA_INITIAL_TEMP, SA_LOG_INTERVAL, SA_MAX_ITERATIONS,
};
use crate::domain::result::{AlgorithmParams, IterationEntry, RouteResult};
use crate::domain::types::{Algorithm, ProblemInstance};
use crate::error::OptimizerError;
use crate::evaluation::cost::{route_distance, route_time};
use crate::evaluation::objective;
use crate::solver::construction::nearest_neighbor;
use crate::solver::{trivial_result, CancelFlag};

#[derive(Clone, Copy)]
enum Move {
    Swap,
    Insert,
    Reverse,
}

const MOVES: [Move; 3] = [Move::Swap, Move::Insert, Move::Reverse];

fn params(iterations: usize) -> AlgorithmParams {
    AlgorithmParams::Annealing {
        method: "simulated_annealing",
        initial_temp: SA_INITIAL_TEMP,
        final_temp: SA_FINAL_TEMP,
        cooling_rate: SA_COOLING_RATE,
        iterations,
        strategy: "time_distance_hybrid",
        objective_weights: "0.6*distance + 0.4*time",
    }
}

/// Simulated annealing over the hybrid distance/time objective. Starts
/// from a time-optimal nearest-neighbor tour (deliberately different
/// from the classical solver's construction) and explores with
/// swap/insert/reverse neighbors under multiplicative cooling.
pub fn optimize(
    pi: &ProblemInstance,
    seed: u64,
    cancel: &CancelFlag,
) -> Result<RouteResult, OptimizerError> {
    let span = span!(Level::DEBUG, "simulated_annealing", n = pi.len(), seed);
    let _guard = span.enter();

    let n = pi.len();
    if n <= 2 {
        return Ok(trivial_result(Algorithm::Simulated, pi, seed, params(0)));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut route = nearest_neighbor(&pi.time_matrix);
    let mut current_objective = objective::annealing(&route, pi);
    let mut best_route = route.clone();
    let mut best_objective = current_objective;

    let mut temperature = SA_INITIAL_TEMP;
    let mut iterations_log = vec![IterationEntry::Annealing {
        iter: 0,
        objective: current_objective,
        best: best_objective,
        temperature,
    }];

    let mut completed = 0;
    for iteration in 1..=SA_MAX_ITERATIONS {
        cancel.check()?;
        completed = iteration;

        let mut candidate = route.clone();
        // Index 0 never moves; move generation needs at least two free
        // tail positions.
        if n > 3 {
            match *MOVES.choose(&mut rng).unwrap_or(&Move::Swap) {
                Move::Swap => {
                    let picked = (1..n).choose_multiple(&mut rng, 2);
                    candidate.swap(picked[0], picked[1]);
                }
                Move::Insert => {
                    let i = rng.gen_range(1..n);
                    let j = rng.gen_range(1..n);
                    let city = candidate.remove(i);
                    candidate.insert(j, city);
                }
                Move::Reverse => {
                    let mut picked = (1..n).choose_multiple(&mut rng, 2);
                    picked.sort_unstable();
                    candidate[picked[0]..=picked[1]].reverse();
                }
            }
        }

        let candidate_objective = objective::annealing(&candidate, pi);
        let delta = candidate_objective - current_objective;

        if delta < 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
            route = candidate;
            current_objective = candidate_objective;

            if current_objective < best_objective {
                best_route = route.clone();
                best_objective = current_objective;
                debug!(
                    "new best at iteration {}: {:.3}",
                    iteration, best_objective
                );
            }
        }

        temperature *= SA_COOLING_RATE;

        if iteration % SA_LOG_INTERVAL == 0 {
            iterations_log.push(IterationEntry::Annealing {
                iter: iteration,
                objective: current_objective,
                best: best_objective,
                temperature,
            });
        }

        if temperature < SA_FINAL_TEMP {
            break;
        }
    }

    Ok(RouteResult {
        route_order: pi.ids_for(&best_route),
        polyline: String::new(),
        distance_km: route_distance(&best_route, &pi.distance_matrix),
        time_min: route_time(&best_route, &pi.time_matrix),
        objective_value: best_objective,
        iterations_log,
        seed,
        algorithm_params: params(completed),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_support::{assert_permutation, symmetric};

    fn five_stop_instance() -> ProblemInstance {
        symmetric(
            vec![
                vec![0.0, 4.0, 8.0, 3.0, 6.0],
                vec![4.0, 0.0, 2.0, 7.0, 5.0],
                vec![8.0, 2.0, 0.0, 4.0, 9.0],
                vec![3.0, 7.0, 4.0, 0.0, 1.0],
                vec![6.0, 5.0, 9.0, 1.0, 0.0],
            ],
            Some(123),
        )
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let pi = five_stop_instance();
        let first = optimize(&pi, 123, &CancelFlag::new()).unwrap();
        let second = optimize(&pi, 123, &CancelFlag::new()).unwrap();

        assert_eq!(first.route_order, second.route_order);
        assert_eq!(first.objective_value, second.objective_value);
        assert_eq!(first.iterations_log, second.iterations_log);
    }

    #[test]
    fn log_runs_every_hundred_iterations_with_non_increasing_best() {
        let pi = five_stop_instance();
        let result = optimize(&pi, 123, &CancelFlag::new()).unwrap();

        let mut previous_best = f64::INFINITY;
        for (k, entry) in result.iterations_log.iter().enumerate() {
            assert_eq!(entry.iter(), k * 100);
            let IterationEntry::Annealing { best, .. } = entry else {
                panic!("unexpected entry variant");
            };
            assert!(*best <= previous_best);
            previous_best = *best;
        }
        assert!(result.iterations_log.len() > 1);
    }

    #[test]
    fn returned_route_is_a_permutation_with_consistent_costs() {
        let pi = five_stop_instance();
        let result = optimize(&pi, 99, &CancelFlag::new()).unwrap();

        let order: Vec<usize> = result
            .route_order
            .iter()
            .map(|id| id[1..].parse::<usize>().unwrap())
            .collect();
        assert_permutation(&order, 5);
        assert_eq!(order[0], 0);

        let expected = 0.6 * route_distance(&order, &pi.distance_matrix)
            + 0.4 * route_time(&order, &pi.time_matrix);
        assert!((result.objective_value - expected).abs() < 1e-9);
    }

    #[test]
    fn cancellation_aborts_the_loop() {
        let pi = five_stop_instance();
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(
            optimize(&pi, 1, &cancel),
            Err(OptimizerError::Cancelled)
        ));
    }

    #[test]
    fn three_stops_keep_time_construction() {
        // With n = 3 no neighbor moves are generated; the time-NN tour
        // survives annealing untouched.
        let pi = crate::solver::test_support::instance(
            vec![
                vec![0.0, 1.0, 2.0],
                vec![1.0, 0.0, 1.0],
                vec![2.0, 1.0, 0.0],
            ],
            vec![
                vec![0.0, 5.0, 1.0],
                vec![5.0, 0.0, 2.0],
                vec![1.0, 2.0, 0.0],
            ],
            None,
        );
        let result = optimize(&pi, 5, &CancelFlag::new()).unwrap();
        assert_eq!(result.route_order, vec!["s0", "s2", "s1"]);
    }
}
