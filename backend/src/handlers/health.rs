//! Health check handlers

use std::time::Duration;

use axum::{extract::State, Json};
use serde::Serialize;
use shared::ApiResponse;

use crate::AppState;

const DATABASE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    // Check database connectivity
    let probe = sqlx::query("SELECT 1").execute(&state.db);
    let db_status = match tokio::time::timeout(DATABASE_PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => "connected",
        Ok(Err(e)) => {
            tracing::warn!("Health check database probe failed: {}", e);
            "disconnected"
        }
        Err(_) => {
            tracing::warn!("Health check database probe timed out");
            "disconnected"
        }
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status.to_string(),
    }))
}
