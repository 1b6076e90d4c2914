//! Upstream data sources
//!
//! Every upstream feed implements [`ForecastSource`] so the aggregation
//! controller can run them uniformly and in parallel.
//!
//! # Sources
//! 1. **noaa** - NOAA SWPC space-weather products (Kp, solar wind,
//!    hemispheric power, OVATION, storm scales)
//! 2. **met_norway** - MET Norway locationforecast (cloud cover)
//!
//! # Parallel Execution
//! All sources run independently. A failed source does not block the others;
//! its failure is reported back per source so the caller can name it.

pub mod met_norway;
pub mod noaa;

use async_trait::async_trait;
use futures::future::join_all;
use nordlys_common::ovation::OvationResponse;
use nordlys_common::types::{
    GeomagneticStormLevel, HemisphericPower, KpReading, SolarWind, WeatherPoint,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default timeout for upstream API requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default User-Agent (MET Norway rejects anonymous clients)
pub const DEFAULT_USER_AGENT: &str =
    concat!("nordlys-fc/", env!("CARGO_PKG_VERSION"), " (aurora forecast)");

/// Identity of one upstream feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    KpIndex,
    KpForecast,
    KpHighFrequency,
    SolarWindMag,
    SolarWindPlasma,
    PropagatedSolarWind,
    HemisphericPower,
    Ovation,
    StormScales,
    Weather,
}

impl SourceKind {
    pub const ALL: [SourceKind; 10] = [
        SourceKind::KpIndex,
        SourceKind::KpForecast,
        SourceKind::SolarWindMag,
        SourceKind::Weather,
        SourceKind::Ovation,
        SourceKind::SolarWindPlasma,
        SourceKind::HemisphericPower,
        SourceKind::KpHighFrequency,
        SourceKind::PropagatedSolarWind,
        SourceKind::StormScales,
    ];

    /// Name used in user-facing degraded-data messages
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::KpIndex => "Kp index",
            SourceKind::KpForecast => "Kp forecast",
            SourceKind::KpHighFrequency => "Kp 1-minute",
            SourceKind::SolarWindMag => "solar wind",
            SourceKind::SolarWindPlasma => "solar wind plasma",
            SourceKind::PropagatedSolarWind => "propagated solar wind",
            SourceKind::HemisphericPower => "hemispheric power",
            SourceKind::Ovation => "ovation",
            SourceKind::StormScales => "storm scales",
            SourceKind::Weather => "weather",
        }
    }

    /// Response cache key
    pub fn cache_key(&self) -> &'static str {
        match self {
            SourceKind::KpIndex => "kp-index",
            SourceKind::KpForecast => "kp-forecast",
            SourceKind::KpHighFrequency => "kp-1m",
            SourceKind::SolarWindMag => "solar-wind-mag",
            SourceKind::SolarWindPlasma => "solar-wind-plasma",
            SourceKind::PropagatedSolarWind => "solar-wind-propagated",
            SourceKind::HemisphericPower => "hemispheric-power",
            SourceKind::Ovation => "ovation",
            SourceKind::StormScales => "noaa-scales",
            SourceKind::Weather => "weather",
        }
    }

    /// How long a cached response stays fresh, matched to the feed cadence
    pub fn default_max_age(&self) -> Duration {
        let minutes = match self {
            SourceKind::KpHighFrequency
            | SourceKind::SolarWindMag
            | SourceKind::SolarWindPlasma
            | SourceKind::PropagatedSolarWind => 1,
            SourceKind::HemisphericPower | SourceKind::Ovation => 5,
            SourceKind::KpIndex | SourceKind::StormScales => 15,
            SourceKind::Weather => 30,
            SourceKind::KpForecast => 60,
        };
        Duration::from_secs(minutes * 60)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Parsed payload of one upstream feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SourceData {
    KpIndex(Vec<KpReading>),
    KpForecast(Vec<KpReading>),
    KpHighFrequency(Vec<KpReading>),
    SolarWindMag(Vec<SolarWind>),
    SolarWindPlasma(Vec<SolarWind>),
    PropagatedSolarWind(Vec<SolarWind>),
    HemisphericPower(Vec<HemisphericPower>),
    Ovation(OvationResponse),
    StormScales(GeomagneticStormLevel),
    Weather(Vec<WeatherPoint>),
}

impl SourceData {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceData::KpIndex(_) => SourceKind::KpIndex,
            SourceData::KpForecast(_) => SourceKind::KpForecast,
            SourceData::KpHighFrequency(_) => SourceKind::KpHighFrequency,
            SourceData::SolarWindMag(_) => SourceKind::SolarWindMag,
            SourceData::SolarWindPlasma(_) => SourceKind::SolarWindPlasma,
            SourceData::PropagatedSolarWind(_) => SourceKind::PropagatedSolarWind,
            SourceData::HemisphericPower(_) => SourceKind::HemisphericPower,
            SourceData::Ovation(_) => SourceKind::Ovation,
            SourceData::StormScales(_) => SourceKind::StormScales,
            SourceData::Weather(_) => SourceKind::Weather,
        }
    }
}

/// Transport-level failure of one fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("{provider} API error: {status}")]
    Status { provider: &'static str, status: u16 },

    /// Body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client could not be constructed
    #[error("Client setup error: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// One upstream feed
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Which feed this is
    fn kind(&self) -> SourceKind;

    /// Key under which responses are cached
    ///
    /// Feeds whose payload depends on more than the kind (e.g. the observer
    /// position) must override this so entries never collide.
    fn cache_key(&self) -> String {
        self.kind().cache_key().to_string()
    }

    /// Fetch and parse the latest series
    ///
    /// # Errors
    /// Any `FetchError` marks the source unavailable for this cycle only.
    async fn fetch(&self) -> Result<SourceData, FetchError>;
}

/// Outcome of one source within a parallel fetch
#[derive(Debug)]
pub struct FetchOutcome {
    pub kind: SourceKind,
    pub result: Result<SourceData, FetchError>,
}

/// Parallel source executor
///
/// Runs all sources concurrently and waits for every one to settle. Results
/// keep registration order; failures are returned, never propagated.
pub struct ParallelFetcher {
    sources: Vec<Arc<dyn ForecastSource>>,
}

impl ParallelFetcher {
    pub fn new(sources: Vec<Arc<dyn ForecastSource>>) -> Self {
        Self { sources }
    }

    /// Fetch from all sources concurrently
    pub async fn fetch_all(&self) -> Vec<FetchOutcome> {
        let futures = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                let kind = source.kind();
                let result = source.fetch().await;
                match &result {
                    Ok(_) => debug!(source = %kind, "Fetch successful"),
                    Err(e) => warn!(source = %kind, error = %e, "Fetch failed"),
                }
                FetchOutcome { kind, result }
            }
        });

        join_all(futures).await
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }
}

// ============================================================================
// Mock Source for Testing
// ============================================================================


#[cfg(test)]
mod tests {
    use super::mock::MockSource;
    use super::*;

    #[tokio::test]
    async fn test_fetch_all_keeps_order_and_failures() {
        let sources: Vec<Arc<dyn ForecastSource>> = vec![
            Arc::new(MockSource::ok(SourceData::KpIndex(vec![]))),
            Arc::new(MockSource::failing(SourceKind::Weather)),
            Arc::new(MockSource::ok(SourceData::SolarWindMag(vec![]))),
            Arc::new(MockSource::failing(SourceKind::Ovation)),
        ];

        let fetcher = ParallelFetcher::new(sources);
        let outcomes = fetcher.fetch_all().await;

        assert_eq!(outcomes.len(), 4, "Every source settles");
        let kinds: Vec<SourceKind> = outcomes.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SourceKind::KpIndex,
                SourceKind::Weather,
                SourceKind::SolarWindMag,
                SourceKind::Ovation
            ]
        );
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert!(outcomes[3].result.is_err());
    }

    #[test]
    fn test_fetcher_count() {
        let sources: Vec<Arc<dyn ForecastSource>> =
            vec![Arc::new(MockSource::failing(SourceKind::KpIndex))];
        let fetcher = ParallelFetcher::new(sources);
        assert_eq!(fetcher.count(), 1);
    }

    #[test]
    fn test_kind_metadata_is_distinct() {
        let mut keys: Vec<&str> = SourceKind::ALL.iter().map(|k| k.cache_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), SourceKind::ALL.len());

        assert_eq!(SourceKind::KpHighFrequency.to_string(), "Kp 1-minute");
        assert_eq!(SourceKind::Weather.default_max_age(), Duration::from_secs(1800));
    }

    #[test]
    fn test_source_data_json_round_trip_keeps_kind() {
        let data = SourceData::StormScales(GeomagneticStormLevel {
            scale: 2,
            text: "moderate".to_string(),
        });
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["kind"], "storm_scales");

        let back: SourceData = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), SourceKind::StormScales);
        assert_eq!(back, data);
    }
}
