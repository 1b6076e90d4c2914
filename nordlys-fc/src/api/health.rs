//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::controller::DataCondition;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", "degraded" or "unavailable", mirroring the data condition
    pub status: String,
    /// Module name ("nordlys-fc")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Latest data problem, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let condition = state.controller.status().await.condition;
    let status = match condition {
        DataCondition::Ok => "ok",
        DataCondition::Degraded { .. } => "degraded",
        DataCondition::Unavailable { .. } => "unavailable",
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "nordlys-fc".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        last_error: condition.message().map(str::to_string),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
