//! HTTP API for nordlys-fc

pub mod forecast;
pub mod health;
pub mod spots;

pub use forecast::{get_ovation, get_score, get_series, get_status, post_refresh};
pub use health::health_routes;
pub use spots::{add_spot, get_spot, list_spots, remove_spot};
