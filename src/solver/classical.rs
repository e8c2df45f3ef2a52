use tracing::{debug, span, Level};

use crate::config::constant::{CLASSICAL_LOG_INTERVAL, CLASSICAL_MAX_PASSES};
use crate::domain::result::{AlgorithmParams, IterationEntry, RouteResult};
use crate::domain::types::{Algorithm, ProblemInstance};
use crate::error::OptimizerError;
use crate::evaluation::cost::{route_distance, route_time};
use crate::solver::construction::nearest_neighbor;
use crate::solver::two_opt::improve_full;
use crate::solver::{trivial_result, CancelFlag};

/// Greedy nearest-neighbor construction over the distance matrix,
/// polished with full-pass 2-opt. Deterministic; the seed is only echoed
/// back.
///
/// The log holds the initial objective, then improving moves only on
/// passes divisible by the log interval. The sparse cadence is
/// intentional.
pub fn optimize(
    pi: &ProblemInstance,
    seed: u64,
    cancel: &CancelFlag,
) -> Result<RouteResult, OptimizerError> {
    let span = span!(Level::DEBUG, "classical", n = pi.len());
    let _guard = span.enter();

    let n = pi.len();
    if n <= 2 {
        return Ok(trivial_result(
            Algorithm::Classical,
            pi,
            seed,
            AlgorithmParams::Classical {
                method: "greedy_2opt",
                iterations: 0,
                strategy: "shortest_distance",
            },
        ));
    }

    let mut route = nearest_neighbor(&pi.distance_matrix);
    let initial_distance = route_distance(&route, &pi.distance_matrix);
    debug!("nearest-neighbor tour: {:?} ({:.3} km)", route, initial_distance);

    let mut iterations_log = vec![IterationEntry::Classical {
        iter: 0,
        objective: initial_distance,
    }];

    let (best_distance, passes) = improve_full(
        &mut route,
        &pi.distance_matrix,
        CLASSICAL_MAX_PASSES,
        cancel,
        |pass, distance| {
            if pass % CLASSICAL_LOG_INTERVAL == 0 {
                iterations_log.push(IterationEntry::Classical {
                    iter: pass,
                    objective: distance,
                });
            }
        },
    )?;

    debug!(
        "2-opt converged after {} passes: {:.3} km",
        passes, best_distance
    );

    Ok(RouteResult {
        route_order: pi.ids_for(&route),
        polyline: String::new(),
        distance_km: best_distance,
        time_min: route_time(&route, &pi.time_matrix),
        objective_value: best_distance,
        iterations_log,
        seed,
        algorithm_params: AlgorithmParams::Classical {
            method: "greedy_2opt",
            iterations: passes,
            strategy: "shortest_distance",
        },
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_support::symmetric;

    #[test]
    fn three_symmetric_stops_stay_in_order() {
        let pi = symmetric(
            vec![
                vec![0.0, 1.0, 2.0],
                vec![1.0, 0.0, 1.0],
                vec![2.0, 1.0, 0.0],
            ],
            Some(42),
        );
        let result = optimize(&pi, 42, &CancelFlag::new()).unwrap();

        assert_eq!(result.route_order, vec!["s0", "s1", "s2"]);
        assert_eq!(result.distance_km, 2.0);
        assert_eq!(result.objective_value, 2.0);
        assert_eq!(result.iterations_log.len(), 1);
        assert_eq!(result.iterations_log[0].iter(), 0);
    }

    #[test]
    fn depot_instance_improves_on_nearest_neighbor() {
        // Nearest neighbor gives depot,2,1,3 = 12; 2-opt may only improve.
        let pi = symmetric(
            vec![
                vec![0.0, 10.0, 5.0, 8.0],
                vec![10.0, 0.0, 3.0, 4.0],
                vec![5.0, 3.0, 0.0, 6.0],
                vec![8.0, 4.0, 6.0, 0.0],
            ],
            Some(7),
        );
        let result = optimize(&pi, 7, &CancelFlag::new()).unwrap();

        assert!(result.distance_km <= 12.0);
        assert_eq!(result.route_order.len(), 4);
        assert_eq!(result.route_order[0], "s0");
    }

    #[test]
    fn two_stops_early_return_uses_matrix_entries() {
        let pi = symmetric(vec![vec![0.0, 7.5], vec![7.5, 0.0]], None);
        let result = optimize(&pi, 0, &CancelFlag::new()).unwrap();

        assert_eq!(result.route_order, vec!["s0", "s1"]);
        assert_eq!(result.distance_km, 7.5);
        assert_eq!(result.time_min, 7.5);
        assert_eq!(result.objective_value, 7.5);
        assert!(result.iterations_log.is_empty());
    }

    #[test]
    fn works_on_asymmetric_matrices() {
        let pi = crate::solver::test_support::instance(
            vec![
                vec![0.0, 2.0, 9.0],
                vec![7.0, 0.0, 1.0],
                vec![3.0, 8.0, 0.0],
            ],
            vec![
                vec![0.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![1.0, 1.0, 0.0],
            ],
            None,
        );
        let result = optimize(&pi, 0, &CancelFlag::new()).unwrap();
        assert_eq!(result.route_order.len(), 3);
        assert_eq!(result.route_order[0], "s0");
        // 0 -> 1 -> 2 costs 3; the alternative 0 -> 2 -> 1 costs 17.
        assert_eq!(result.distance_km, 3.0);
    }
}
