//! Configuration loading and location resolution
//!
//! A missing or unreadable TOML file never stops a service: it is reported
//! and compiled defaults are used instead.
//!
//! Location priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variables `NORDLYS_LAT` / `NORDLYS_LON`
//! 3. TOML `[location]` table
//! 4. Reference location (Tromsø)

use crate::types::GeoPosition;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the latitude
pub const LAT_ENV_VAR: &str = "NORDLYS_LAT";
/// Environment variable overriding the longitude
pub const LON_ENV_VAR: &str = "NORDLYS_LON";

/// On-disk TOML configuration
///
/// Every key is optional; absent keys fall back to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Observer location
    #[serde(default)]
    pub location: Option<LocationConfig>,
    /// HTTP listen port
    #[serde(default)]
    pub port: Option<u16>,
    /// Seconds between automatic refresh cycles
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
    /// User-Agent sent to upstream providers
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub spots: SpotsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "nordlys_fc=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Upstream response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// SQLite file; defaults to `<data folder>/nordlys.db`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Viewing spot settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotsConfig {
    /// JSON array of curated spots; the built-in list is used when unset
    #[serde(default)]
    pub curated_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// Compiled-in fallback values
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub port: u16,
    pub refresh_interval_secs: u64,
    pub log_level: String,
    pub data_folder: PathBuf,
    pub position: GeoPosition,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            port: 5740,
            refresh_interval_secs: 300,
            log_level: default_log_level(),
            data_folder: default_data_folder(),
            position: GeoPosition::TROMSO,
        }
    }
}

/// OS-dependent data folder (`~/.local/share/nordlys` on Linux)
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("nordlys"))
        .unwrap_or_else(|| PathBuf::from("./nordlys_data"))
}

/// Default TOML path for a module, e.g. `~/.config/nordlys/nordlys-fc.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nordlys").join(format!("{}.toml", module_name)))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config, falling back to defaults on any problem
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        info!("No config file location available, using compiled defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        info!("Config file {} not found, using compiled defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Where the resolved location came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationOrigin {
    CommandLine,
    Environment,
    ConfigFile,
    Default,
}

/// Resolves the observer location across CLI, environment, TOML and default
pub struct LocationResolver {
    cli: Option<GeoPosition>,
    toml: Option<LocationConfig>,
}

impl LocationResolver {
    pub fn new(cli: Option<GeoPosition>, toml: Option<LocationConfig>) -> Self {
        Self { cli, toml }
    }

    /// Resolve the location; invalid candidates are skipped with a warning
    pub fn resolve(&self) -> (GeoPosition, LocationOrigin) {
        if let Some(position) = self.cli {
            match position.validate() {
                Ok(()) => return (position, LocationOrigin::CommandLine),
                Err(e) => warn!("Ignoring command-line location: {}", e),
            }
        }

        match position_from_env() {
            Ok(Some(position)) => return (position, LocationOrigin::Environment),
            Ok(None) => {}
            Err(e) => warn!("Ignoring environment location: {}", e),
        }

        if let Some(loc) = self.toml {
            let position = GeoPosition::new(loc.lat, loc.lon);
            match position.validate() {
                Ok(()) => return (position, LocationOrigin::ConfigFile),
                Err(e) => warn!("Ignoring config file location: {}", e),
            }
        }

        (GeoPosition::TROMSO, LocationOrigin::Default)
    }
}

/// Both variables must be set for the environment to supply a location
fn position_from_env() -> Result<Option<GeoPosition>> {
    let (lat, lon) = match (std::env::var(LAT_ENV_VAR), std::env::var(LON_ENV_VAR)) {
        (Ok(lat), Ok(lon)) => (lat, lon),
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
            return Err(Error::Config(format!(
                "both {} and {} must be set",
                LAT_ENV_VAR, LON_ENV_VAR
            )))
        }
        (Err(_), Err(_)) => return Ok(None),
    };

    let parse = |name: &str, raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidInput(format!("{}={:?} is not a number", name, raw)))
    };

    let position = GeoPosition::new(
        parse(LAT_ENV_VAR, lat.as_str())?,
        parse(LON_ENV_VAR, lon.as_str())?,
    );
    position.validate()?;
    Ok(Some(position))
}
