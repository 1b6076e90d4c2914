//! nordlys-fc library - aurora forecast service
//!
//! Fetches space-weather and local weather feeds, fuses them into an aurora
//! visibility score for one location, and serves the result over HTTP along
//! with a list of viewing spots.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod sources;
pub mod spots;

pub use controller::ForecastController;
pub use error::{ApiError, ApiResult};
pub use spots::SpotRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ForecastController>,
    pub spots: Arc<SpotRegistry>,
    /// Held for the duration of a refresh cycle
    pub refresh_lock: Arc<Mutex<()>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(controller: Arc<ForecastController>, spots: Arc<SpotRegistry>) -> Self {
        Self {
            controller,
            spots,
            refresh_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/score", get(api::get_score))
        .route("/api/status", get(api::get_status))
        .route("/api/series", get(api::get_series))
        .route("/api/ovation", get(api::get_ovation))
        .route("/api/refresh", post(api::post_refresh))
        .route("/api/spots", get(api::list_spots).post(api::add_spot))
        .route("/api/spots/:id", get(api::get_spot).delete(api::remove_spot))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
