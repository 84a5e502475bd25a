//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{config::StoreBackend, error::AppResult};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service
    pub status: String,
    /// Version of the service
    pub version: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    /// Storage backend serving the catalog
    pub store: StoreBackend,
}

/// Readiness check endpoint (runs a catalog query against the store)
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 500, description = "Store unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn readiness_check(
    State(state): State<crate::AppState>,
) -> AppResult<(StatusCode, Json<ReadinessResponse>)> {
    state
        .services
        .lending
        .find_books(&json!({ "search": "readiness", "count": 0 }))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: state.config.database.backend,
        }),
    ))
}
