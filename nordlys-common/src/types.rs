//! Domain types shared by the scoring engine and the forecast service
//!
//! All readings are immutable values created fresh on every aggregation cycle.
//! Series are kept in the order the upstream feed delivered them, which is
//! chronological per series but not across series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Space-weather readings
// ============================================================================

/// Provenance tag carried by every Kp reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpSource {
    Observed,
    Estimated,
    Predicted,
}

impl KpSource {
    /// Parse the tag used by NOAA forecast tables (case-insensitive)
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "observed" => Some(KpSource::Observed),
            "estimated" => Some(KpSource::Estimated),
            "predicted" => Some(KpSource::Predicted),
            _ => None,
        }
    }
}

/// Planetary Kp index reading (0-9 scale)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpReading {
    pub time: DateTime<Utc>,
    #[serde(with = "non_finite_as_null")]
    pub kp: f64,
    pub source: KpSource,
}

/// Solar-wind sample
///
/// Magnetometer feeds fill `bz`/`bt`, plasma feeds fill `speed`/`density`,
/// propagated feeds fill both. Missing or malformed magnetometer values are
/// carried as NaN so that readers can skip them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarWind {
    pub time: DateTime<Utc>,
    /// North-south IMF component in nT, negative = southward
    #[serde(with = "non_finite_as_null")]
    pub bz: f64,
    /// Total field strength in nT
    #[serde(with = "non_finite_as_null")]
    pub bt: f64,
    /// Bulk speed in km/s
    #[serde(default)]
    pub speed: Option<f64>,
    /// Proton density in p/cm³
    #[serde(default)]
    pub density: Option<f64>,
}

impl SolarWind {
    /// Magnetometer-only sample (no plasma data)
    pub fn magnetic(time: DateTime<Utc>, bz: f64, bt: f64) -> Self {
        Self {
            time,
            bz,
            bt,
            speed: None,
            density: None,
        }
    }

    /// Plasma-only sample (no magnetometer data)
    pub fn plasma(time: DateTime<Utc>, speed: Option<f64>, density: Option<f64>) -> Self {
        Self {
            time,
            bz: f64::NAN,
            bt: f64::NAN,
            speed,
            density,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

/// Estimated auroral hemispheric power
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HemisphericPower {
    pub time: DateTime<Utc>,
    /// Gigawatts
    pub power: f64,
    pub hemisphere: Hemisphere,
}

/// Current NOAA geomagnetic storm scale (G0-G5)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeomagneticStormLevel {
    pub scale: u8,
    pub text: String,
}

// ============================================================================
// Local weather
// ============================================================================

/// One point of a local weather forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherPoint {
    pub time: DateTime<Utc>,
    /// Cloud area fraction, 0-100 %
    pub cloud_cover: f64,
    /// Air temperature, °C (NaN when not reported)
    #[serde(with = "non_finite_as_null")]
    pub temperature: f64,
    /// Wind speed, m/s (NaN when not reported)
    #[serde(with = "non_finite_as_null")]
    pub wind_speed: f64,
    /// Summary symbol for the following hour (e.g. "clearsky_night")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_code: Option<String>,
}

// ============================================================================
// Location
// ============================================================================

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
    /// Horizontal accuracy in metres (0 for fixed/reference positions)
    #[serde(default)]
    pub accuracy: f64,
}

impl GeoPosition {
    /// Reference location: Tromsø city centre
    pub const TROMSO: GeoPosition = GeoPosition {
        lat: 69.6492,
        lon: 18.9553,
        accuracy: 0.0,
    };

    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            accuracy: 0.0,
        }
    }

    /// Check that the coordinates are usable
    ///
    /// Longitude is accepted in either -180..180 or 0..360 convention.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(crate::Error::InvalidInput(format!(
                "latitude out of range: {}",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..360.0).contains(&self.lon) {
            return Err(crate::Error::InvalidInput(format!(
                "longitude out of range: {}",
                self.lon
            )));
        }
        Ok(())
    }
}

impl Default for GeoPosition {
    fn default() -> Self {
        GeoPosition::TROMSO
    }
}

// ============================================================================
// Viewing spots
// ============================================================================

/// Sky-glow rating of a viewing spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPollution {
    Low,
    Medium,
    High,
}

/// Named place to watch from, either curated or added by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewingSpot {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub description: String,
    pub light_pollution: LightPollution,
    /// How to get there (road, parking, hike)
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub user_added: bool,
}

impl ViewingSpot {
    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.lat, self.lon)
    }

    /// Require an id, a name and usable coordinates
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.trim().is_empty() {
            return Err(crate::Error::InvalidInput("spot id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "spot {} has no name",
                self.id
            )));
        }
        self.position().validate()
    }
}

// ============================================================================
// Aurora score
// ============================================================================

/// Verdict band derived from the total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuroraVerdict {
    None,
    Unlikely,
    Possible,
    Likely,
    High,
    Storm,
}

impl AuroraVerdict {
    /// Map a 0-100 total onto its band. Upper bounds are inclusive.
    pub fn from_total(total: u8) -> Self {
        match total {
            0..=10 => AuroraVerdict::None,
            11..=25 => AuroraVerdict::Unlikely,
            26..=45 => AuroraVerdict::Possible,
            46..=65 => AuroraVerdict::Likely,
            66..=85 => AuroraVerdict::High,
            _ => AuroraVerdict::Storm,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AuroraVerdict::None => "No Aurora",
            AuroraVerdict::Unlikely => "Unlikely",
            AuroraVerdict::Possible => "Possible",
            AuroraVerdict::Likely => "Likely",
            AuroraVerdict::High => "High Chance",
            AuroraVerdict::Storm => "Geomagnetic Storm",
        }
    }
}

impl fmt::Display for AuroraVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            AuroraVerdict::None => "none",
            AuroraVerdict::Unlikely => "unlikely",
            AuroraVerdict::Possible => "possible",
            AuroraVerdict::Likely => "likely",
            AuroraVerdict::High => "high",
            AuroraVerdict::Storm => "storm",
        };
        write!(f, "{}", tag)
    }
}

/// Aurora visibility score with every contribution reported
///
/// Contributions are always filled in, even when the darkness gate forces
/// `total` to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuroraScore {
    /// 0-100
    pub total: u8,
    pub verdict: AuroraVerdict,
    /// 0..=30
    pub kp_contribution: i32,
    /// -40..=0
    pub cloud_penalty: i32,
    /// true = sun below civil twilight
    pub darkness_gate: bool,
    /// 0..=15
    pub solar_wind_bonus: i32,
    /// 0..=10
    pub speed_bonus: i32,
    /// 0..=15
    pub hemispheric_power_bonus: i32,
    /// Raw Kp input
    pub kp: f64,
    /// Raw cloud cover input
    pub cloud_cover: f64,
    /// Solar elevation in degrees at `timestamp`
    pub solar_elevation: f64,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Serialize NaN/inf as `null` and read `null` back as NaN.
///
/// JSON has no NaN, and a missing magnetometer value must survive a cache
/// round trip without turning the whole series into a decode error.
mod non_finite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
