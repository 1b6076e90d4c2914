//! Forecast aggregation controller
//!
//! Owns the latest series from every source, the latest score and the data
//! status. One `refresh` runs every source concurrently, applies whatever
//! succeeded, and rescores from the best available value per quantity.
//!
//! # Input preference
//! - Kp: 1-minute estimate if > 0, else latest observed 3-hourly Kp
//! - Bz: propagated solar wind if non-zero, else L1 magnetometer
//! - Speed: propagated solar wind if > 0, else L1 plasma
//! - Cloud cover: weather point nearest to now, else 50 %
//!
//! A failed source keeps its previous series. If every source fails the
//! previous score is kept and `last_updated` does not move.
//!
//! Overlapping refreshes are not guarded here; callers serialize them.

use crate::sources::{FetchOutcome, ForecastSource, ParallelFetcher, SourceData, SourceKind};
use chrono::{DateTime, Utc};
use nordlys_common::ovation::OvationResponse;
use nordlys_common::readers::{
    first_available, latest_bz, latest_hemispheric_power, latest_kp, latest_kp_high_frequency,
    latest_speed, weather_at,
};
use nordlys_common::types::{
    GeomagneticStormLevel, HemisphericPower, KpReading, SolarWind, WeatherPoint,
};
use nordlys_common::{calculate_aurora_score, AuroraScore, GeoPosition, ScoreInputs};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Cloud cover assumed when no weather is available
pub const DEFAULT_CLOUD_COVER: f64 = 50.0;

/// Message shown when no source could be reached
pub const ALL_UNAVAILABLE_MESSAGE: &str = "All data sources unavailable. Check your connection.";

/// Latest series from every source
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSeries {
    pub kp_index: Vec<KpReading>,
    pub kp_forecast: Vec<KpReading>,
    pub kp_high_frequency: Vec<KpReading>,
    pub solar_wind_mag: Vec<SolarWind>,
    pub solar_wind_plasma: Vec<SolarWind>,
    pub propagated_solar_wind: Vec<SolarWind>,
    pub hemispheric_power: Vec<HemisphericPower>,
    pub weather: Vec<WeatherPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ovation: Option<OvationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storm_level: Option<GeomagneticStormLevel>,
}

impl ForecastSeries {
    /// Replace the series that `data` belongs to
    pub fn apply(&mut self, data: SourceData) {
        match data {
            SourceData::KpIndex(v) => self.kp_index = v,
            SourceData::KpForecast(v) => self.kp_forecast = v,
            SourceData::KpHighFrequency(v) => self.kp_high_frequency = v,
            SourceData::SolarWindMag(v) => self.solar_wind_mag = v,
            SourceData::SolarWindPlasma(v) => self.solar_wind_plasma = v,
            SourceData::PropagatedSolarWind(v) => self.propagated_solar_wind = v,
            SourceData::HemisphericPower(v) => self.hemispheric_power = v,
            SourceData::Weather(v) => self.weather = v,
            SourceData::Ovation(v) => self.ovation = Some(v),
            SourceData::StormScales(v) => self.storm_level = Some(v),
        }
    }

    /// Best available value per quantity at `now`
    pub fn score_inputs(&self, now: DateTime<Utc>) -> ScoreInputs {
        let kp = first_available(
            [
                latest_kp_high_frequency(&self.kp_high_frequency),
                latest_kp(&self.kp_index),
            ],
            |kp| kp > 0.0,
            0.0,
        );
        let bz = first_available(
            [
                latest_bz(&self.propagated_solar_wind),
                latest_bz(&self.solar_wind_mag),
            ],
            |bz| bz != 0.0,
            0.0,
        );
        let wind_speed = first_available(
            [
                latest_speed(&self.propagated_solar_wind),
                latest_speed(&self.solar_wind_plasma),
            ],
            |speed| speed > 0.0,
            0.0,
        );
        let cloud_cover = weather_at(&self.weather, now)
            .map(|point| point.cloud_cover)
            .unwrap_or(DEFAULT_CLOUD_COVER);

        ScoreInputs {
            kp,
            cloud_cover,
            bz,
            wind_speed,
            hemispheric_power: latest_hemispheric_power(&self.hemispheric_power),
        }
    }
}

/// Health of the data behind the current score
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DataCondition {
    Ok,
    /// Some sources failed; the score was recomputed without them
    Degraded {
        failed: Vec<SourceKind>,
        message: String,
    },
    /// Every source failed; the previous score is kept
    Unavailable { message: String },
}

impl DataCondition {
    /// User-facing message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            DataCondition::Ok => None,
            DataCondition::Degraded { message, .. } | DataCondition::Unavailable { message } => {
                Some(message.as_str())
            }
        }
    }

    fn from_failures(failed: Vec<SourceKind>, total: usize) -> Self {
        if total == 0 || failed.len() == total {
            return DataCondition::Unavailable {
                message: ALL_UNAVAILABLE_MESSAGE.to_string(),
            };
        }
        if failed.is_empty() {
            return DataCondition::Ok;
        }
        let names: Vec<&str> = failed.iter().map(|k| k.display_name()).collect();
        DataCondition::Degraded {
            message: format!("Could not fetch {}. Showing cached data.", names.join(", ")),
            failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastStatus {
    pub loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub condition: DataCondition,
}

impl Default for ForecastStatus {
    fn default() -> Self {
        Self {
            loading: false,
            last_updated: None,
            condition: DataCondition::Ok,
        }
    }
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub succeeded: Vec<SourceKind>,
    pub failed: Vec<SourceKind>,
    /// Whether this cycle produced a new score
    pub recomputed: bool,
    /// Current score after the cycle (possibly from an earlier cycle)
    pub score: Option<AuroraScore>,
}

#[derive(Default)]
struct ControllerState {
    series: ForecastSeries,
    score: Option<AuroraScore>,
    status: ForecastStatus,
}

/// Raises the loading flag for its lifetime, so a dropped refresh clears it
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Aggregates every source into one aurora score for a fixed position
pub struct ForecastController {
    fetcher: ParallelFetcher,
    position: GeoPosition,
    state: RwLock<ControllerState>,
    loading: AtomicBool,
}

impl ForecastController {
    pub fn new(sources: Vec<Arc<dyn ForecastSource>>, position: GeoPosition) -> Self {
        Self {
            fetcher: ParallelFetcher::new(sources),
            position,
            state: RwLock::new(ControllerState::default()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn position(&self) -> GeoPosition {
        self.position
    }

    pub fn source_count(&self) -> usize {
        self.fetcher.count()
    }

    /// Latest score, `None` before the first successful cycle
    pub async fn score(&self) -> Option<AuroraScore> {
        self.state.read().await.score.clone()
    }

    pub async fn status(&self) -> ForecastStatus {
        let mut status = self.state.read().await.status.clone();
        status.loading = self.loading.load(Ordering::SeqCst);
        status
    }

    pub async fn series(&self) -> ForecastSeries {
        self.state.read().await.series.clone()
    }

    /// Run one cycle, scoring at the wall-clock time once all fetches settle
    pub async fn refresh(&self) -> RefreshReport {
        self.run_cycle(None).await
    }

    /// Run one cycle, scoring at `now`
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> RefreshReport {
        self.run_cycle(Some(now)).await
    }

    async fn run_cycle(&self, now: Option<DateTime<Utc>>) -> RefreshReport {
        let loading = LoadingGuard::raise(&self.loading);

        // No lock is held while sources are in flight
        let outcomes = self.fetcher.fetch_all().await;
        let now = now.unwrap_or_else(Utc::now);

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut state = self.state.write().await;

        for FetchOutcome { kind, result } in outcomes {
            match result {
                Ok(data) => {
                    state.series.apply(data);
                    succeeded.push(kind);
                }
                Err(_) => failed.push(kind),
            }
        }

        let recomputed = !succeeded.is_empty();
        if recomputed {
            let inputs = state.series.score_inputs(now);
            let score = calculate_aurora_score(&inputs, now, self.position);
            info!(
                total = score.total,
                verdict = %score.verdict,
                kp = inputs.kp,
                cloud_cover = inputs.cloud_cover,
                bz = inputs.bz,
                dark = score.darkness_gate,
                "Aurora score updated"
            );
            state.score = Some(score);
            state.status.last_updated = Some(now);
        }

        let condition = DataCondition::from_failures(failed.clone(), self.fetcher.count());
        if let Some(message) = condition.message() {
            warn!("{}", message);
        }
        state.status.condition = condition;
        let score = state.score.clone();
        drop(state);
        drop(loading);

        RefreshReport {
            succeeded,
            failed,
            recomputed,
            score,
        }
    }
}
