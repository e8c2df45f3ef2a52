use thiserror::Error;

/// Request-level failures surfaced to the HTTP layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("request cancelled")]
    Cancelled,
}

/// Upstream matrix/polyline failures. Individual pair failures are
/// absorbed inside the provider; these variants cover whole-call faults.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream rejected request: {0}")]
    Rejected(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Per-optimizer failures. `Cancelled` aborts the whole request;
/// everything else becomes an error record for that algorithm only.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("request cancelled")]
    Cancelled,

    #[error("optimizer failed: {0}")]
    Internal(String),
}
