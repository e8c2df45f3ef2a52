use serde::{Deserialize, Serialize};

use crate::engine::OptimizeRequest;

/// Wire shape of `POST /optimize`: the engine request plus the upstream
/// credential, which never travels further than the provider.
#[derive(Debug, Deserialize)]
pub struct ApiOptimizeRequest {
    #[serde(flatten)]
    pub request: OptimizeRequest,
    #[serde(default)]
    pub google_api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
