use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use rand::{thread_rng, Rng};
use serde::Deserialize;
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::constant::{API_VERSION, SEED_RANGE};
use crate::distance::matrix::{haversine_matrices, MatrixData, MatrixProvider};
use crate::domain::result::{DebugInfo, OptimizationResponse, RouteResult};
use crate::domain::types::{
    Algorithm, Constraints, Depot, Location, ProblemInstance, RoutingProfile, Stop,
};
use crate::error::{EngineError, OptimizerError};
use crate::solver::{self, CancelFlag};

pub const DEPOT_ID: &str = "depot";

fn default_profile() -> String {
    RoutingProfile::Driving.as_str().to_string()
}

fn default_algorithms() -> Vec<String> {
    Algorithm::ALL.iter().map(|a| a.as_str().to_string()).collect()
}

/// One optimization request as the engine sees it; the HTTP layer adds
/// only the upstream credential on top of this.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeRequest {
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub depot: Option<Depot>,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default = "default_profile")]
    pub routing_profile: String,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Validates requests, builds the problem instance through the matrix
/// provider, fans the optimizers out onto blocking workers and assembles
/// the aggregate response.
pub struct Engine<P: MatrixProvider> {
    provider: P,
}

impl<P: MatrixProvider> Engine<P> {
    pub fn new(provider: P) -> Self {
        Engine { provider }
    }

    pub async fn optimize(
        &self,
        request: OptimizeRequest,
        cancel: &CancelFlag,
    ) -> Result<OptimizationResponse, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let (profile, algorithms) = validate(&request)?;
        let locations = assemble_locations(&request);
        let n = locations.len();

        info!(
            "optimizing {} locations with algorithms {:?} (profile {})",
            n,
            algorithms.iter().map(Algorithm::as_str).collect::<Vec<_>>(),
            profile
        );

        let mut warnings = vec![];
        let mut errors = vec![];

        let matrix_data = match self.provider.build_matrices(&locations, profile).await {
            Ok(data) if matrices_well_formed(&data, n) => data,
            Ok(_) => {
                warn!("provider returned malformed matrices, using Haversine fallback");
                warnings.push(
                    "distance matrix provider returned malformed matrices; using Haversine fallback"
                        .to_string(),
                );
                haversine_fallback(&locations)
            }
            Err(e) => {
                warn!("provider unavailable ({}), using Haversine fallback", e);
                warnings.push(format!(
                    "distance matrix provider unavailable ({}); using Haversine fallback",
                    e
                ));
                haversine_fallback(&locations)
            }
        };
        warnings.extend(matrix_data.warnings.iter().cloned());

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let source = matrix_data.source.clone();
        let instance = Arc::new(ProblemInstance {
            locations,
            distance_matrix: matrix_data.distance_matrix,
            time_matrix: matrix_data.time_matrix,
            seed: request.random_seed,
        });

        // Seeds are resolved up front so unseeded draws happen exactly
        // once per optimizer and get recorded with the result.
        let specs: Vec<(Algorithm, u64)> = algorithms
            .iter()
            .map(|&alg| (alg, resolve_seed(alg, request.random_seed)))
            .collect();

        let tasks: Vec<_> = specs
            .iter()
            .map(|&(alg, seed)| {
                let instance = Arc::clone(&instance);
                let cancel = cancel.clone();
                task::spawn_blocking(move || solver::run(alg, &instance, seed, &cancel))
            })
            .collect();

        let outcomes = join_all(tasks).await;

        let mut results: BTreeMap<String, RouteResult> = BTreeMap::new();
        for (&(alg, seed), outcome) in specs.iter().zip(outcomes) {
            match outcome {
                Ok(Ok(result)) => {
                    results.insert(alg.as_str().to_string(), result);
                }
                Ok(Err(OptimizerError::Cancelled)) => return Err(EngineError::Cancelled),
                Ok(Err(e)) => {
                    warn!("{} optimizer failed: {}", alg, e);
                    errors.push(format!("{}: {}", alg, e));
                    results.insert(alg.as_str().to_string(), RouteResult::failed(seed, e.to_string()));
                }
                Err(join_error) => {
                    warn!("{} optimizer panicked: {}", alg, join_error);
                    errors.push(format!("{}: {}", alg, join_error));
                    results.insert(
                        alg.as_str().to_string(),
                        RouteResult::failed(seed, join_error.to_string()),
                    );
                }
            }
        }

        for (name, result) in results.iter_mut() {
            if result.error.is_some() || result.route_order.len() < 2 {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let ordered = ordered_locations(&instance, &result.route_order);
            match self.provider.full_polyline(&ordered).await {
                Ok(polyline) => result.polyline = polyline,
                Err(e) => {
                    debug!("polyline lookup for {} failed: {}", name, e);
                    result.polyline = String::new();
                }
            }
        }

        if let Some(limit) = request
            .constraints
            .as_ref()
            .and_then(|c| c.max_travel_time)
        {
            for (name, result) in &results {
                if result.error.is_none() && result.time_min > limit {
                    warnings.push(format!(
                        "{} route takes {:.1} min, exceeding max_travel_time of {:.1} min",
                        name, result.time_min, limit
                    ));
                }
            }
        }

        Ok(OptimizationResponse {
            algorithm_results: results,
            distance_matrix_source: source,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            api_version: API_VERSION,
            debug: DebugInfo {
                warnings,
                errors,
                matrix_size: n,
                total_stops: request.stops.len(),
            },
        })
    }
}

fn validate(request: &OptimizeRequest) -> Result<(RoutingProfile, Vec<Algorithm>), EngineError> {
    if request.stops.len() < 2 {
        return Err(EngineError::Validation(
            "At least 2 delivery stops are required".to_string(),
        ));
    }

    let mut ids = HashSet::new();
    for stop in &request.stops {
        if !(-90.0..=90.0).contains(&stop.lat) || !(-180.0..=180.0).contains(&stop.lng) {
            return Err(EngineError::Validation(format!(
                "stop '{}' has coordinates out of range",
                stop.id
            )));
        }
        if !ids.insert(stop.id.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate stop id '{}'",
                stop.id
            )));
        }
    }

    if let Some(depot) = &request.depot {
        if !(-90.0..=90.0).contains(&depot.lat) || !(-180.0..=180.0).contains(&depot.lng) {
            return Err(EngineError::Validation(
                "depot has coordinates out of range".to_string(),
            ));
        }
        if ids.contains(DEPOT_ID) {
            return Err(EngineError::Validation(format!(
                "stop id '{}' collides with the synthetic depot",
                DEPOT_ID
            )));
        }
    }

    let profile =
        RoutingProfile::from_str(&request.routing_profile).map_err(EngineError::Validation)?;

    let mut algorithms = vec![];
    let mut seen = HashSet::new();
    for name in &request.algorithms {
        let algorithm = Algorithm::from_str(name).map_err(EngineError::Validation)?;
        if seen.insert(algorithm) {
            algorithms.push(algorithm);
        }
    }

    Ok((profile, algorithms))
}

fn assemble_locations(request: &OptimizeRequest) -> Vec<Location> {
    let mut locations: Vec<Location> = request
        .stops
        .iter()
        .map(|s| Location {
            id: s.id.clone(),
            lat: s.lat,
            lng: s.lng,
        })
        .collect();

    if let Some(depot) = &request.depot {
        locations.insert(
            0,
            Location {
                id: DEPOT_ID.to_string(),
                lat: depot.lat,
                lng: depot.lng,
            },
        );
    }

    locations
}

fn matrices_well_formed(data: &MatrixData, n: usize) -> bool {
    data.distance_matrix.len() == n
        && data.time_matrix.len() == n
        && data.distance_matrix.iter().all(|row| row.len() == n)
        && data.time_matrix.iter().all(|row| row.len() == n)
}

fn haversine_fallback(locations: &[Location]) -> MatrixData {
    let (distance_matrix, time_matrix) = haversine_matrices(locations);
    MatrixData {
        distance_matrix,
        time_matrix,
        polyline_fragments: Default::default(),
        source: "haversine-fallback".to_string(),
        warnings: vec![],
    }
}

fn resolve_seed(algorithm: Algorithm, request_seed: Option<u64>) -> u64 {
    match (request_seed, algorithm) {
        (Some(seed), _) => seed,
        // The classical solver is deterministic; it only echoes a seed.
        (None, Algorithm::Classical) => 0,
        (None, _) => thread_rng().gen_range(SEED_RANGE),
    }
}

fn ordered_locations(instance: &ProblemInstance, route_order: &[String]) -> Vec<Location> {
    route_order
        .iter()
        .filter_map(|id| instance.locations.iter().find(|l| &l.id == id).cloned())
        .collect()
}
