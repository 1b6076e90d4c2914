//! Viewing spot endpoints
//!
//! - `GET /api/spots`: curated then user spots (`?origin=curated|user` filters)
//! - `GET /api/spots/:id`: one spot
//! - `POST /api/spots`: add a user spot
//! - `DELETE /api/spots/:id`: remove a user spot

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use nordlys_common::ViewingSpot;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::spots::NewSpot;
use crate::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotOrigin {
    Curated,
    User,
}

#[derive(Debug, Deserialize)]
pub struct SpotsQuery {
    pub origin: Option<SpotOrigin>,
}

/// GET /api/spots
pub async fn list_spots(
    State(state): State<AppState>,
    Query(query): Query<SpotsQuery>,
) -> Json<Vec<ViewingSpot>> {
    let spots = match query.origin {
        None => state.spots.all().await,
        Some(SpotOrigin::Curated) => state.spots.curated().to_vec(),
        Some(SpotOrigin::User) => state.spots.user_added().await,
    };
    Json(spots)
}

/// GET /api/spots/:id
pub async fn get_spot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ViewingSpot>> {
    state
        .spots
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Spot {}", id)))
}

/// POST /api/spots
pub async fn add_spot(
    State(state): State<AppState>,
    Json(new): Json<NewSpot>,
) -> ApiResult<(StatusCode, Json<ViewingSpot>)> {
    let spot = state.spots.add(new).await?;
    info!("Added viewing spot {} ({})", spot.name, spot.id);
    Ok((StatusCode::CREATED, Json(spot)))
}

/// DELETE /api/spots/:id
pub async fn remove_spot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let spot = state.spots.remove(&id).await?;
    info!("Removed viewing spot {} ({})", spot.name, spot.id);
    Ok(StatusCode::NO_CONTENT)
}
