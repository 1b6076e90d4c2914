//! MET Norway locationforecast client
//!
//! Hourly cloud cover, temperature and wind for the observer position.
//! MET Norway's terms require an identifying User-Agent on every request.

use super::{FetchError, ForecastSource, SourceData, SourceKind, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nordlys_common::types::{GeoPosition, WeatherPoint};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// locationforecast 2.0 base URL
pub const MET_NORWAY_API_URL: &str = "https://api.met.no/weatherapi/locationforecast/2.0";

#[derive(Debug, Deserialize)]
pub struct LocationForecast {
    pub properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub timeseries: Vec<TimeseriesEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesEntry {
    pub time: DateTime<Utc>,
    pub data: TimeseriesData,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesData {
    pub instant: Instant,
    #[serde(default)]
    pub next_1_hours: Option<NextHours>,
}

#[derive(Debug, Deserialize)]
pub struct Instant {
    pub details: InstantDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstantDetails {
    #[serde(default)]
    pub cloud_area_fraction: Option<f64>,
    #[serde(default)]
    pub air_temperature: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct NextHours {
    pub summary: Summary,
}

#[derive(Debug, Deserialize)]
pub struct Summary {
    pub symbol_code: String,
}

/// Flatten a locationforecast response into weather points
///
/// Entries without a cloud fraction are dropped; cloud cover drives the
/// score, the other fields are informational.
pub fn parse_location_forecast(forecast: LocationForecast) -> Vec<WeatherPoint> {
    forecast
        .properties
        .timeseries
        .into_iter()
        .filter_map(|entry| {
            let details = entry.data.instant.details;
            Some(WeatherPoint {
                time: entry.time,
                cloud_cover: details.cloud_area_fraction.filter(|c| c.is_finite())?,
                temperature: details.air_temperature.unwrap_or(f64::NAN),
                wind_speed: details.wind_speed.unwrap_or(f64::NAN),
                symbol_code: entry.data.next_1_hours.map(|n| n.summary.symbol_code),
            })
        })
        .collect()
}

/// MET Norway weather source for a fixed position
pub struct MetNorwaySource {
    http_client: Client,
    base_url: String,
    position: GeoPosition,
}

impl MetNorwaySource {
    pub fn new(position: GeoPosition, user_agent: &str) -> Result<Self, FetchError> {
        Self::with_base_url(MET_NORWAY_API_URL, position, user_agent)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        position: GeoPosition,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Setup(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            position,
        })
    }

    /// Request URL; MET Norway asks for at most four decimals
    pub fn url(&self) -> String {
        format!(
            "{}/compact?lat={:.4}&lon={:.4}",
            self.base_url, self.position.lat, self.position.lon
        )
    }
}

#[async_trait]
impl ForecastSource for MetNorwaySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Weather
    }

    /// Forecast is per position, so the key carries the rounded coordinates
    fn cache_key(&self) -> String {
        format!(
            "{}:{:.4},{:.4}",
            SourceKind::Weather.cache_key(),
            self.position.lat,
            self.position.lon
        )
    }

    async fn fetch(&self) -> Result<SourceData, FetchError> {
        let url = self.url();
        debug!(url = %url, "Querying MET Norway");

        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                provider: "MET Norway",
                status: response.status().as_u16(),
            });
        }

        let forecast: LocationForecast = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("locationforecast: {}", e)))?;

        Ok(SourceData::Weather(parse_location_forecast(forecast)))
    }
}
