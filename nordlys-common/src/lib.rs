//! # Nordlys Common Library
//!
//! Shared code for the Nordlys aurora forecast services including:
//! - Domain types for space-weather and local weather readings
//! - Solar position calculation (darkness gate)
//! - "Latest value" readers over upstream time series
//! - The aurora scoring engine
//! - Configuration loading and location resolution

pub mod config;
pub mod error;
pub mod human_time;
pub mod ovation;
pub mod readers;
pub mod scoring;
pub mod sun;
pub mod types;

pub use error::{Error, Result};
pub use scoring::{calculate_aurora_score, ScoreInputs};
pub use types::{AuroraScore, AuroraVerdict, GeoPosition, LightPollution, ViewingSpot};
