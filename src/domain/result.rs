use std::collections::BTreeMap;

use serde::Serialize;

/// One entry of an optimizer's convergence log. The variants share `iter`
/// and `objective`; the rest is algorithm-specific. Untagged so each
/// serializes as a plain object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IterationEntry {
    Classical {
        iter: usize,
        objective: f64,
    },
    Annealing {
        iter: usize,
        objective: f64,
        best: f64,
        temperature: f64,
    },
    Qiea {
        iter: usize,
        objective: f64,
        population_diversity: f64,
    },
    Qaoa {
        iter: usize,
        objective: f64,
        gamma_avg: f64,
        beta_avg: f64,
        phase: &'static str,
    },
}

impl IterationEntry {
    pub fn iter(&self) -> usize {
        match *self {
            IterationEntry::Classical { iter, .. }
            | IterationEntry::Annealing { iter, .. }
            | IterationEntry::Qiea { iter, .. }
            | IterationEntry::Qaoa { iter, .. } => iter,
        }
    }
}

/// The tuning record echoed back with each result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlgorithmParams {
    Classical {
        method: &'static str,
        iterations: usize,
        strategy: &'static str,
    },
    Annealing {
        method: &'static str,
        initial_temp: f64,
        final_temp: f64,
        cooling_rate: f64,
        iterations: usize,
        strategy: &'static str,
        objective_weights: &'static str,
    },
    Qiea {
        method: &'static str,
        population_size: usize,
        generations: usize,
        mutation_rate: f64,
        strategy: &'static str,
        objective_weights: &'static str,
    },
    Qaoa {
        method: &'static str,
        p_depth: usize,
        optimization_steps: usize,
        num_samples: usize,
        strategy: &'static str,
        objective_weights: &'static str,
    },
    None {},
}

/// Outcome of one (instance, optimizer) pair.
#[derive(Debug, Clone, Serialize)]
pub struct RouteResult {
    pub route_order: Vec<String>,
    pub polyline: String,
    pub distance_km: f64,
    pub time_min: f64,
    pub objective_value: f64,
    pub iterations_log: Vec<IterationEntry>,
    pub seed: u64,
    pub algorithm_params: AlgorithmParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RouteResult {
    /// Sentinel record for an optimizer that failed in isolation.
    pub fn failed(seed: u64, message: String) -> Self {
        RouteResult {
            route_order: vec![],
            polyline: String::new(),
            distance_km: 0.0,
            time_min: 0.0,
            objective_value: f64::INFINITY,
            iterations_log: vec![],
            seed,
            algorithm_params: AlgorithmParams::None {},
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub matrix_size: usize,
    pub total_stops: usize,
}

/// The aggregate response of one optimization request. Results are keyed
/// by algorithm name; a BTreeMap keeps serialization order deterministic.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResponse {
    #[serde(rename = "algorithmResults")]
    pub algorithm_results: BTreeMap<String, RouteResult>,
    #[serde(rename = "distanceMatrixSource")]
    pub distance_matrix_source: String,
    pub timestamp: String,
    pub api_version: &'static str,
    pub debug: DebugInfo,
}
