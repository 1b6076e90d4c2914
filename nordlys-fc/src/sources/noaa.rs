//! NOAA SWPC client
//!
//! Fetches the space-weather products behind nine of the ten feeds.
//!
//! # Product formats
//! - "product" tables (`/products/...json`): array of rows, first row is the
//!   header. Columns are located by header name, so column reordering
//!   upstream does not shift values.
//! - `/json/...` feeds: arrays of objects.
//!
//! A row whose timestamp cannot be parsed is dropped. A value cell that is
//! not numeric becomes NaN/`None` and is later skipped by the readers, so a
//! single malformed reading never fails the whole fetch.

use super::{FetchError, ForecastSource, SourceData, SourceKind, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use nordlys_common::ovation::OvationResponse;
use nordlys_common::types::{
    GeomagneticStormLevel, Hemisphere, HemisphericPower, KpReading, KpSource, SolarWind,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// NOAA SWPC services base URL
pub const NOAA_API_URL: &str = "https://services.swpc.noaa.gov";

const KP_INDEX_PATH: &str = "/products/noaa-planetary-k-index.json";
const KP_FORECAST_PATH: &str = "/products/noaa-planetary-k-index-forecast.json";
const KP_1M_PATH: &str = "/json/planetary_k_index_1m.json";
const MAG_PATH: &str = "/products/solar-wind/mag-1-day.json";
const PLASMA_PATH: &str = "/products/solar-wind/plasma-1-day.json";
const PROPAGATED_PATH: &str = "/products/geospace/propagated-solar-wind-1-hour.json";
const HEMI_POWER_PATH: &str = "/json/hemispheric_power.json";
const OVATION_PATH: &str = "/json/ovation_aurora_latest.json";
const SCALES_PATH: &str = "/products/noaa-scales.json";

/// NOAA SWPC HTTP client
pub struct NoaaClient {
    http_client: Client,
    base_url: String,
}

impl NoaaClient {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        Self::with_base_url(NOAA_API_URL, user_agent)
    }

    /// Client against a different host (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>, user_agent: &str) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Setup(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Querying NOAA SWPC");

        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                provider: "NOAA",
                status: response.status().as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(format!("NOAA {}: {}", path, e)))
    }

    async fn fetch_table(&self, path: &str) -> Result<Vec<Vec<Value>>, FetchError> {
        self.fetch_json(path).await
    }

    /// Fetch and parse one NOAA product
    pub async fn fetch(&self, kind: SourceKind) -> Result<SourceData, FetchError> {
        let data = match kind {
            SourceKind::KpIndex => {
                SourceData::KpIndex(parse_kp_index(&self.fetch_table(KP_INDEX_PATH).await?)?)
            }
            SourceKind::KpForecast => SourceData::KpForecast(parse_kp_forecast(
                &self.fetch_table(KP_FORECAST_PATH).await?,
            )?),
            SourceKind::KpHighFrequency => {
                SourceData::KpHighFrequency(parse_kp_1m(self.fetch_json(KP_1M_PATH).await?))
            }
            SourceKind::SolarWindMag => {
                SourceData::SolarWindMag(parse_mag(&self.fetch_table(MAG_PATH).await?)?)
            }
            SourceKind::SolarWindPlasma => {
                SourceData::SolarWindPlasma(parse_plasma(&self.fetch_table(PLASMA_PATH).await?)?)
            }
            SourceKind::PropagatedSolarWind => SourceData::PropagatedSolarWind(parse_propagated(
                &self.fetch_table(PROPAGATED_PATH).await?,
            )?),
            SourceKind::HemisphericPower => SourceData::HemisphericPower(
                parse_hemispheric_power(self.fetch_json(HEMI_POWER_PATH).await?),
            ),
            SourceKind::Ovation => {
                SourceData::Ovation(self.fetch_json::<OvationResponse>(OVATION_PATH).await?)
            }
            SourceKind::StormScales => {
                SourceData::StormScales(parse_storm_level(&self.fetch_json(SCALES_PATH).await?)?)
            }
            SourceKind::Weather => {
                return Err(FetchError::Setup("weather is not a NOAA product".to_string()))
            }
        };
        Ok(data)
    }
}

/// One NOAA product exposed as a [`ForecastSource`]
pub struct NoaaSource {
    client: Arc<NoaaClient>,
    kind: SourceKind,
}

impl NoaaSource {
    pub fn new(client: Arc<NoaaClient>, kind: SourceKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl ForecastSource for NoaaSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<SourceData, FetchError> {
        self.client.fetch(self.kind).await
    }
}

/// Sources for every NOAA-backed feed, sharing one client
pub fn noaa_sources(client: Arc<NoaaClient>) -> Vec<Arc<dyn ForecastSource>> {
    SourceKind::ALL
        .iter()
        .filter(|kind| **kind != SourceKind::Weather)
        .map(|&kind| Arc::new(NoaaSource::new(Arc::clone(&client), kind)) as Arc<dyn ForecastSource>)
        .collect()
}

// ============================================================================
// Product table parsing
// ============================================================================

/// Header-indexed view over a NOAA product table
struct ProductTable<'a> {
    columns: HashMap<String, usize>,
    rows: &'a [Vec<Value>],
}

impl<'a> ProductTable<'a> {
    fn new(raw: &'a [Vec<Value>]) -> Result<Self, FetchError> {
        let (header, rows) = raw
            .split_first()
            .ok_or_else(|| FetchError::Parse("product table has no header row".to_string()))?;

        let columns = header
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_str().map(|name| (name.to_ascii_lowercase(), i)))
            .collect();

        Ok(Self { columns, rows })
    }

    fn column(&self, name: &str) -> Result<usize, FetchError> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| FetchError::Parse(format!("product table has no '{}' column", name)))
    }
}

fn cell<'v>(row: &'v [Value], index: usize) -> Option<&'v Value> {
    row.get(index).filter(|v| !v.is_null())
}

/// Numeric cell; strings are parsed, anything else becomes NaN
fn number(row: &[Value], index: usize) -> f64 {
    match cell(row, index) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn timestamp(row: &[Value], index: usize) -> Option<DateTime<Utc>> {
    cell(row, index).and_then(Value::as_str).and_then(parse_time)
}

/// Accepts RFC 3339 and the naive UTC forms NOAA uses
/// ("2025-01-15 03:00:00.000", "2025-01-15T03:00:00")
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn parse_kp_index(raw: &[Vec<Value>]) -> Result<Vec<KpReading>, FetchError> {
    let table = ProductTable::new(raw)?;
    let time = table.column("time_tag")?;
    let kp = table.column("kp")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some(KpReading {
                time: timestamp(row, time)?,
                kp: number(row, kp),
                source: KpSource::Observed,
            })
        })
        .collect())
}

pub fn parse_kp_forecast(raw: &[Vec<Value>]) -> Result<Vec<KpReading>, FetchError> {
    let table = ProductTable::new(raw)?;
    let time = table.column("time_tag")?;
    let kp = table.column("kp")?;
    let observed = table.column("observed")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some(KpReading {
                time: timestamp(row, time)?,
                kp: number(row, kp),
                source: cell(row, observed)
                    .and_then(Value::as_str)
                    .and_then(KpSource::parse)?,
            })
        })
        .collect())
}

pub fn parse_mag(raw: &[Vec<Value>]) -> Result<Vec<SolarWind>, FetchError> {
    let table = ProductTable::new(raw)?;
    let time = table.column("time_tag")?;
    let bz = table.column("bz_gsm")?;
    let bt = table.column("bt")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some(SolarWind::magnetic(
                timestamp(row, time)?,
                number(row, bz),
                number(row, bt),
            ))
        })
        .collect())
}

pub fn parse_plasma(raw: &[Vec<Value>]) -> Result<Vec<SolarWind>, FetchError> {
    let table = ProductTable::new(raw)?;
    let time = table.column("time_tag")?;
    let density = table.column("density")?;
    let speed = table.column("speed")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some(SolarWind::plasma(
                timestamp(row, time)?,
                finite(number(row, speed)),
                finite(number(row, density)),
            ))
        })
        .collect())
}

pub fn parse_propagated(raw: &[Vec<Value>]) -> Result<Vec<SolarWind>, FetchError> {
    let table = ProductTable::new(raw)?;
    let time = table.column("time_tag")?;
    let speed = table.column("speed")?;
    let density = table.column("density")?;
    let bz = table.column("bz")?;
    let bt = table.column("bt")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some(SolarWind {
                time: timestamp(row, time)?,
                bz: number(row, bz),
                bt: number(row, bt),
                speed: finite(number(row, speed)),
                density: finite(number(row, density)),
            })
        })
        .collect())
}

// ============================================================================
// Object feeds
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Kp1mEntry {
    time_tag: String,
    #[serde(default)]
    kp_index: Option<f64>,
    #[serde(default)]
    estimated_kp: Option<f64>,
}

/// One-minute Kp; the fractional estimate is preferred over the integer index
pub fn parse_kp_1m(entries: Vec<Kp1mEntry>) -> Vec<KpReading> {
    entries
        .into_iter()
        .filter_map(|entry| {
            Some(KpReading {
                time: parse_time(&entry.time_tag)?,
                kp: entry.estimated_kp.or(entry.kp_index).unwrap_or(f64::NAN),
                source: KpSource::Estimated,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct HemiPowerEntry {
    #[serde(rename = "Observation Time")]
    observation_time: String,
    #[serde(rename = "Hemisphere")]
    hemisphere: String,
    #[serde(rename = "Estimated Power", default)]
    estimated_power: Value,
}

pub fn parse_hemispheric_power(entries: Vec<HemiPowerEntry>) -> Vec<HemisphericPower> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let hemisphere = match entry.hemisphere.trim() {
                "North" => Hemisphere::North,
                "South" => Hemisphere::South,
                _ => return None,
            };
            let power = number(std::slice::from_ref(&entry.estimated_power), 0);
            Some(HemisphericPower {
                time: parse_time(&entry.observation_time)?,
                power: finite(power)?,
                hemisphere,
            })
        })
        .collect()
}

/// Current geomagnetic storm level from the `"0"` (now) entry of noaa-scales
pub fn parse_storm_level(
    scales: &HashMap<String, Value>,
) -> Result<GeomagneticStormLevel, FetchError> {
    let g = scales
        .get("0")
        .and_then(|now| now.get("G"))
        .ok_or_else(|| FetchError::Parse("noaa-scales has no current G entry".to_string()))?;

    // G-scale is 0..=5
    let scale = match g.get("Scale") {
        Some(Value::String(s)) => s.trim().parse::<u8>().unwrap_or(0).min(5),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0).min(5) as u8,
        _ => 0,
    };
    let text = g
        .get("Text")
        .and_then(Value::as_str)
        .unwrap_or("none")
        .to_string();

    Ok(GeomagneticStormLevel { scale, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn table(value: Value) -> Vec<Vec<Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 3, 0, 0).unwrap();
        assert_eq!(parse_time("2025-01-15 03:00:00.000"), Some(expected));
        assert_eq!(parse_time("2025-01-15 03:00:00"), Some(expected));
        assert_eq!(parse_time("2025-01-15T03:00:00"), Some(expected));
        assert_eq!(parse_time("2025-01-15T03:00:00Z"), Some(expected));
        assert_eq!(parse_time("2025-01-15T04:00:00+01:00"), Some(expected));
        assert_eq!(parse_time("2025-01-15T03:00"), Some(expected));
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn test_parse_kp_index() {
        let raw = table(json!([
            ["time_tag", "Kp", "a_running", "station_count"],
            ["2025-01-15 00:00:00.000", "2.33", "9", "8"],
            ["not a time", "5.00", "9", "8"],
            ["2025-01-15 03:00:00.000", "4.67", "32", "8"]
        ]));
        let readings = parse_kp_index(&raw).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].kp, 4.67);
        assert!(readings.iter().all(|r| r.source == KpSource::Observed));
    }

    #[test]
    fn test_parse_kp_index_missing_column() {
        let raw = table(json!([["time_tag", "a_running"], ["2025-01-15 00:00:00", "9"]]));
        assert!(matches!(parse_kp_index(&raw), Err(FetchError::Parse(_))));
        assert!(matches!(parse_kp_index(&[]), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_parse_kp_forecast_tags() {
        let raw = table(json!([
            ["time_tag", "kp", "observed", "noaa_scale"],
            ["2025-01-15 00:00:00", "3.00", "observed", null],
            ["2025-01-15 03:00:00", "4.33", "estimated", null],
            ["2025-01-15 06:00:00", "5.67", "predicted", "G1"],
            ["2025-01-15 09:00:00", "5.00", "unknown", null]
        ]));
        let readings = parse_kp_forecast(&raw).unwrap();

        let sources: Vec<KpSource> = readings.iter().map(|r| r.source).collect();
        assert_eq!(
            sources,
            vec![KpSource::Observed, KpSource::Estimated, KpSource::Predicted]
        );
    }

    #[test]
    fn test_parse_mag_keeps_malformed_bz_as_nan() {
        let raw = table(json!([
            ["time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"],
            ["2025-01-15 00:00:00.000", "1.0", "2.0", "-3.5", "10", "20", "5.1"],
            ["2025-01-15 00:01:00.000", "1.0", "2.0", null, "10", "20", "5.0"],
            ["2025-01-15 00:02:00.000", "1.0", "2.0", "abc", "10", "20", "4.9"]
        ]));
        let readings = parse_mag(&raw).unwrap();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].bz, -3.5);
        assert!(readings[1].bz.is_nan());
        assert!(readings[2].bz.is_nan());
        assert_eq!(readings[2].bt, 4.9);
    }

    #[test]
    fn test_parse_plasma() {
        let raw = table(json!([
            ["time_tag", "density", "speed", "temperature"],
            ["2025-01-15 00:00:00.000", "4.2", "512.3", "90000"],
            ["2025-01-15 00:01:00.000", "4.1", null, "90000"]
        ]));
        let readings = parse_plasma(&raw).unwrap();

        assert_eq!(readings[0].speed, Some(512.3));
        assert_eq!(readings[0].density, Some(4.2));
        assert!(readings[0].bz.is_nan());
        assert_eq!(readings[1].speed, None);
    }

    #[test]
    fn test_parse_propagated_by_header_name() {
        let raw = table(json!([
            ["time_tag", "speed", "density", "temperature", "bx", "by", "bz", "bt",
             "vx", "vy", "vz", "propagated_time_tag"],
            ["2025-01-15 00:00:00.000", 605.1, 3.3, 120000, 1.1, -2.2, -6.4, 7.0,
             -600, 10, 5, "2025-01-15 00:45:00.000"]
        ]));
        let readings = parse_propagated(&raw).unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].bz, -6.4);
        assert_eq!(readings[0].bt, 7.0);
        assert_eq!(readings[0].speed, Some(605.1));
        assert_eq!(readings[0].density, Some(3.3));
    }

    #[test]
    fn test_parse_kp_1m_prefers_estimate() {
        let entries: Vec<Kp1mEntry> = serde_json::from_value(json!([
            {"time_tag": "2025-01-15T00:00:00", "kp_index": 2, "estimated_kp": 2.33, "kp": "2P"},
            {"time_tag": "2025-01-15T00:01:00", "kp_index": 3, "kp": "3Z"},
            {"time_tag": "garbage", "kp_index": 9, "estimated_kp": 9.0}
        ]))
        .unwrap();
        let readings = parse_kp_1m(entries);

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].kp, 2.33);
        assert_eq!(readings[1].kp, 3.0);
        assert!(readings.iter().all(|r| r.source == KpSource::Estimated));
    }

    #[test]
    fn test_parse_hemispheric_power() {
        let entries: Vec<HemiPowerEntry> = serde_json::from_value(json!([
            {"Observation Time": "2025-01-15T00:00:00Z", "Data Format": "", "Hemisphere": "North", "Estimated Power": 31},
            {"Observation Time": "2025-01-15T00:00:00Z", "Data Format": "", "Hemisphere": "South", "Estimated Power": 22},
            {"Observation Time": "2025-01-15T00:05:00Z", "Data Format": "", "Hemisphere": "North", "Estimated Power": "n/a"},
            {"Observation Time": "2025-01-15T00:05:00Z", "Data Format": "", "Hemisphere": "East", "Estimated Power": 10}
        ]))
        .unwrap();
        let readings = parse_hemispheric_power(entries);

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].hemisphere, Hemisphere::North);
        assert_eq!(readings[0].power, 31.0);
        assert_eq!(readings[1].hemisphere, Hemisphere::South);
    }

    #[test]
    fn test_parse_storm_level() {
        let scales: HashMap<String, Value> = serde_json::from_value(json!({
            "-1": {"G": {"Scale": "0", "Text": "none"}},
            "0": {"DateStamp": "2025-01-15", "G": {"Scale": "2", "Text": "moderate"}},
            "1": {"G": {"Scale": null, "Text": null}}
        }))
        .unwrap();
        let level = parse_storm_level(&scales).unwrap();
        assert_eq!(level, GeomagneticStormLevel { scale: 2, text: "moderate".to_string() });

        let quiet: HashMap<String, Value> =
            serde_json::from_value(json!({"0": {"G": {"Scale": null, "Text": null}}})).unwrap();
        assert_eq!(parse_storm_level(&quiet).unwrap().scale, 0);

        assert!(parse_storm_level(&HashMap::new()).is_err());
    }

    #[test]
    fn test_storm_level_is_clamped() {
        for scale in [json!("7"), json!(9)] {
            let scales: HashMap<String, Value> =
                serde_json::from_value(json!({"0": {"G": {"Scale": scale, "Text": "extreme"}}}))
                    .unwrap();
            assert_eq!(parse_storm_level(&scales).unwrap().scale, 5);
        }
    }

    #[test]
    fn test_noaa_sources_cover_every_noaa_feed() {
        let client = Arc::new(NoaaClient::new("nordlys-test").unwrap());
        let sources = noaa_sources(client);

        assert_eq!(sources.len(), 9);
        assert!(sources.iter().all(|s| s.kind() != SourceKind::Weather));
    }
}
