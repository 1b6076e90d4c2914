//! Service configuration for nordlys-fc
//!
//! The log filter is not part of it: main resolves that before tracing starts.
//!
//! Every value resolves CLI → environment → TOML → compiled default.
//! Environment fallbacks for CLI flags are handled by clap.

use nordlys_common::config::{CompiledDefaults, LocationOrigin, LocationResolver, TomlConfig};
use nordlys_common::GeoPosition;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::sources::DEFAULT_USER_AGENT;

/// Shortest allowed automatic refresh interval
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Cache database file name inside the data folder
const CACHE_FILE_NAME: &str = "nordlys.db";

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub refresh_interval_secs: Option<u64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Fully resolved service settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    pub refresh_interval: Duration,
    pub position: GeoPosition,
    pub position_origin: LocationOrigin,
    pub user_agent: String,
    /// Service database (response cache and user spots); `None` disables it
    pub cache_path: Option<PathBuf>,
    /// Curated spot list; `None` uses the built-in list
    pub curated_spots_path: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let cli_position = match (cli.lat, cli.lon) {
            (Some(lat), Some(lon)) => Some(GeoPosition::new(lat, lon)),
            (None, None) => None,
            _ => {
                warn!("Both --lat and --lon are required; ignoring command-line location");
                None
            }
        };
        let (position, position_origin) =
            LocationResolver::new(cli_position, toml.location).resolve();

        let interval_secs = cli
            .refresh_interval_secs
            .or(toml.refresh_interval_secs)
            .unwrap_or(defaults.refresh_interval_secs);
        let mut refresh_interval = Duration::from_secs(interval_secs);
        if refresh_interval < MIN_REFRESH_INTERVAL {
            warn!(
                "Refresh interval {}s too short, using {}s",
                interval_secs,
                MIN_REFRESH_INTERVAL.as_secs()
            );
            refresh_interval = MIN_REFRESH_INTERVAL;
        }

        let cache_path = toml.cache.enabled.then(|| {
            toml.cache
                .path
                .clone()
                .unwrap_or_else(|| defaults.data_folder.join(CACHE_FILE_NAME))
        });

        Self {
            port: cli.port.or(toml.port).unwrap_or(defaults.port),
            refresh_interval,
            position,
            position_origin,
            user_agent: toml
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            cache_path,
            curated_spots_path: toml.spots.curated_path.clone(),
        }
    }
}
