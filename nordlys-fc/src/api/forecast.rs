//! Forecast endpoints
//!
//! - `GET /api/score`: latest aurora score
//! - `GET /api/status`: loading/degraded/unavailable state
//! - `GET /api/series`: every cached series
//! - `GET /api/ovation`: OVATION map as GeoJSON
//! - `POST /api/refresh`: run one refresh cycle now

use axum::{extract::State, Json};
use chrono::Utc;
use nordlys_common::human_time::{format_date_time, time_ago};
use nordlys_common::ovation::{ovation_to_geojson, OvationGeoJson};
use nordlys_common::{AuroraScore, GeoPosition};
use serde::Serialize;
use tracing::info;

use crate::controller::{ForecastSeries, ForecastStatus, RefreshReport};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub score: AuroraScore,
    /// Display label for the verdict ("High Chance")
    pub verdict_label: &'static str,
    pub position: GeoPosition,
}

/// GET /api/score
pub async fn get_score(State(state): State<AppState>) -> ApiResult<Json<ScoreResponse>> {
    let score = state.controller.score().await.ok_or_else(|| {
        ApiError::ServiceUnavailable("No aurora score has been computed yet".to_string())
    })?;

    Ok(Json(ScoreResponse {
        verdict_label: score.verdict.label(),
        score,
        position: state.controller.position(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: ForecastStatus,
    /// "5m ago", absent before the first update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_ago: Option<String>,
    /// "Jan 15, 23:05" (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub source_count: usize,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.controller.status().await;
    let now = Utc::now();

    Json(StatusResponse {
        updated_ago: status.last_updated.map(|t| time_ago(t, now)),
        updated_at: status.last_updated.map(format_date_time),
        source_count: state.controller.source_count(),
        status,
    })
}

/// GET /api/series
pub async fn get_series(State(state): State<AppState>) -> Json<ForecastSeries> {
    Json(state.controller.series().await)
}

/// GET /api/ovation
pub async fn get_ovation(State(state): State<AppState>) -> ApiResult<Json<OvationGeoJson>> {
    let series = state.controller.series().await;
    let ovation = series
        .ovation
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("No OVATION map available".to_string()))?;

    Ok(Json(ovation_to_geojson(ovation)))
}

/// POST /api/refresh
///
/// Only one refresh runs at a time; a concurrent request gets 409.
pub async fn post_refresh(State(state): State<AppState>) -> ApiResult<Json<RefreshReport>> {
    let _guard = state
        .refresh_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("Refresh already running".to_string()))?;

    info!("Manual refresh requested");
    Ok(Json(state.controller.refresh().await))
}
