use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    // A probe key that is never written; only the lookup has to succeed.
    let storage = match state.storage.exists("health-probe").await {
        Ok(_) => "available",
        Err(e) => {
            tracing::warn!("Storage health probe failed: {}", e);
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
        storage: storage.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
