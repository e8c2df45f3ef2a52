use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::result::{AlgorithmParams, RouteResult};
use crate::domain::types::{Algorithm, ProblemInstance};
use crate::error::OptimizerError;
use crate::evaluation::cost::{route_distance, route_time};
use crate::evaluation::objective::objective;

pub mod annealing;
pub mod classical;
pub mod construction;
pub mod qaoa;
pub mod qiea;
pub mod two_opt;

/// Request-wide cancellation signal. Optimizers poll it at iteration
/// boundaries; network calls are cancelled by dropping their futures.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), OptimizerError> {
        if self.is_cancelled() {
            Err(OptimizerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Run one optimizer over a shared instance.
pub fn run(
    algorithm: Algorithm,
    pi: &ProblemInstance,
    seed: u64,
    cancel: &CancelFlag,
) -> Result<RouteResult, OptimizerError> {
    match algorithm {
        Algorithm::Classical => classical::optimize(pi, seed, cancel),
        Algorithm::Simulated => annealing::optimize(pi, seed, cancel),
        Algorithm::Qiea => qiea::optimize(pi, seed, cancel),
        Algorithm::Qaoa => qaoa::optimize(pi, seed, cancel),
    }
}

/// Early return for n <= 2: the identity order is the only tour, costed
/// over the real matrices with the algorithm's own objective.
pub(crate) fn trivial_result(
    algorithm: Algorithm,
    pi: &ProblemInstance,
    seed: u64,
    params: AlgorithmParams,
) -> RouteResult {
    let order: Vec<usize> = (0..pi.len()).collect();

    RouteResult {
        route_order: pi.ids_for(&order),
        polyline: String::new(),
        distance_km: route_distance(&order, &pi.distance_matrix),
        time_min: route_time(&order, &pi.time_matrix),
        objective_value: objective(algorithm, &order, pi),
        iterations_log: vec![],
        seed,
        algorithm_params: params,
        error: None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::types::{Location, ProblemInstance};

    pub fn instance(d: Vec<Vec<f64>>, t: Vec<Vec<f64>>, seed: Option<u64>) -> ProblemInstance {
        let locations = (0..d.len())
            .map(|i| Location {
                id: format!("s{i}"),
                lat: 0.0,
                lng: 0.0,
            })
            .collect();
        ProblemInstance {
            locations,
            distance_matrix: d,
            time_matrix: t,
            seed,
        }
    }

    pub fn symmetric(d: Vec<Vec<f64>>, seed: Option<u64>) -> ProblemInstance {
        instance(d.clone(), d, seed)
    }

    pub fn assert_permutation(order: &[usize], n: usize) {
        let mut seen = vec![false; n];
        assert_eq!(order.len(), n, "order {order:?} has wrong length");
        for &i in order {
            assert!(!seen[i], "index {i} repeated in {order:?}");
            seen[i] = true;
        }
    }
}
