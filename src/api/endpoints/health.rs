//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// `GET /api/health` — liveness probe, no database access.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: format!("{} API running", config::APP_NAME),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: config::APP_VERSION,
        uptime_secs: ctx.core.uptime_secs(),
    })
}
