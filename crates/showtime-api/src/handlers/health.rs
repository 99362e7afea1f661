//! Health check handler.

use axum::Json;
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Handler for GET /health
///
/// Public and unauthenticated; does not touch the identity provider.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
