use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::types::{ApiOptimizeRequest, ErrorResponse};
use crate::config::constant::DEFAULT_BIND;
use crate::distance::providers::{new_pair_cache, GoogleMatrixProvider, PairCache};
use crate::domain::result::OptimizationResponse;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::solver::CancelFlag;

#[derive(Clone)]
pub struct AppState {
    pub pair_cache: Arc<PairCache>,
}

pub fn router() -> Router {
    router_with_state(AppState {
        pair_cache: new_pair_cache(),
    })
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/algorithms", get(algorithms))
        .route("/optimize", post(optimize))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped. The bind address comes
/// from `QROUTE_BIND`.
pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let bind = std::env::var("QROUTE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("qroute server listening on {}", bind);
    axum::serve(listener, router()).await?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Quantum-Inspired Smart Routing API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        "features": [
            "Google Maps API integration",
            "Classical TSP optimization",
            "Simulated Annealing",
            "Quantum-Inspired Evolutionary Algorithm (QIEA)",
            "Quantum Approximate Optimization Algorithm (QAOA)",
            "Real road distance matrix",
            "Complete route polylines",
            "Multi-algorithm comparison"
        ]
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        "components": {
            "api": "operational",
            "algorithms": ["classical", "simulated", "qiea", "qaoa"],
            "google_maps": "ready"
        }
    }))
}

async fn algorithms() -> Json<Value> {
    Json(json!({
        "algorithms": {
            "classical": {
                "name": "Classical Optimization",
                "description": "Greedy nearest neighbor construction with 2-opt improvement",
                "type": "deterministic",
                "best_for": "Small to medium problem sizes, guaranteed improvement",
                "parameters": ["iterations", "improvement_method"]
            },
            "simulated": {
                "name": "Simulated Annealing",
                "description": "Probabilistic optimization inspired by metallurgical annealing",
                "type": "metaheuristic",
                "best_for": "Escaping local optima, medium to large problems",
                "parameters": ["temperature", "cooling_rate", "iterations"]
            },
            "qiea": {
                "name": "Quantum-Inspired Evolutionary Algorithm",
                "description": "Evolutionary algorithm using quantum probability amplitudes",
                "type": "quantum-inspired",
                "best_for": "Complex landscapes, population-based search",
                "parameters": ["population_size", "generations", "mutation_rate"]
            },
            "qaoa": {
                "name": "Quantum Approximate Optimization Algorithm",
                "description": "Variational quantum algorithm for combinatorial optimization",
                "type": "quantum-inspired",
                "best_for": "Near-term quantum computing simulation, complex constraints",
                "parameters": ["p_depth", "optimization_steps", "num_samples"]
            }
        }
    }))
}

async fn optimize(
    State(state): State<AppState>,
    Json(payload): Json<ApiOptimizeRequest>,
) -> Result<Json<OptimizationResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.google_api_key.trim().is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Google API key is required".to_string(),
        ));
    }

    info!(
        "optimization requested: {} stops, algorithms {:?}",
        payload.request.stops.len(),
        payload.request.algorithms
    );

    let provider =
        GoogleMatrixProvider::new(payload.google_api_key, Arc::clone(&state.pair_cache));
    let engine = Engine::new(provider);
    let cancel = CancelFlag::new();

    match engine.optimize(payload.request, &cancel).await {
        Ok(response) => Ok(Json(response)),
        Err(EngineError::Validation(message)) => {
            error!("validation error: {}", message);
            Err(reject(StatusCode::BAD_REQUEST, message))
        }
        Err(e) => {
            error!("optimization error: {}", e);
            Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error during optimization: {}", e),
            ))
        }
    }
}

fn reject(status: StatusCode, error: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error }))
}
