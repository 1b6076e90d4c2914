//! nordlys-fc (Aurora Forecast) - main entry point
//!
//! Resolves configuration, wires the upstream sources (optionally behind the
//! SQLite response cache), refreshes the score on a fixed interval and
//! serves it over HTTP together with the viewing spots.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nordlys_common::config::{
    default_config_path, load_toml_config, load_toml_config_or_default, CompiledDefaults,
};
use nordlys_common::human_time::format_clock;
use nordlys_common::GeoPosition;
use tokio::signal;
use tracing::{debug, error, info, warn};

use nordlys_fc::cache::{with_cache, SqliteCache};
use nordlys_fc::config::{CliOverrides, ServiceConfig};
use nordlys_fc::location::{locate_or_default, FixedPosition, DEFAULT_LOCATE_TIMEOUT};
use nordlys_fc::sources::met_norway::MetNorwaySource;
use nordlys_fc::sources::noaa::{noaa_sources, NoaaClient};
use nordlys_fc::sources::{ForecastSource, SourceKind};
use nordlys_fc::spots::{builtin_spots, load_curated, SpotRegistry};
use nordlys_fc::{build_router, AppState, ForecastController};

/// Command-line arguments for nordlys-fc
#[derive(Parser, Debug)]
#[command(name = "nordlys-fc")]
#[command(about = "Aurora visibility forecast service")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/nordlys/nordlys-fc.toml)
    #[arg(short, long, env = "NORDLYS_CONFIG")]
    config: Option<PathBuf>,

    /// Observer latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Observer longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Port to listen on
    #[arg(short, long, env = "NORDLYS_FC_PORT")]
    port: Option<u16>,

    /// Seconds between automatic refreshes
    #[arg(long, env = "NORDLYS_REFRESH_INTERVAL")]
    refresh_interval: Option<u64>,

    /// Log filter when RUST_LOG is not set (e.g. "info", "nordlys_fc=debug")
    #[arg(long, env = "NORDLYS_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path("nordlys-fc"));

    // Logging level is needed before the config load can be reported
    let log_level = args.log_level.clone().unwrap_or_else(|| {
        config_path
            .as_deref()
            .and_then(|path| load_toml_config(path).ok())
            .map(|config| config.logging.level)
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    info!(
        "Starting Nordlys Aurora Forecast (nordlys-fc) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_config = load_toml_config_or_default(config_path.as_deref());
    let cli = CliOverrides {
        port: args.port,
        refresh_interval_secs: args.refresh_interval,
        lat: args.lat,
        lon: args.lon,
    };
    let config = ServiceConfig::resolve(&cli, &toml_config);

    let position = locate_or_default(
        Some(&FixedPosition(config.position)),
        DEFAULT_LOCATE_TIMEOUT,
    )
    .await;
    info!(
        "Location: {:.4}, {:.4} (from {:?})",
        position.lat, position.lon, config.position_origin
    );

    let database = open_database(&config).await;

    let sources = build_sources(&config, position, database.clone())?;
    let controller = Arc::new(ForecastController::new(sources, position));
    info!("{} data sources registered", controller.source_count());

    let spots = Arc::new(build_spots(&config, database).await);
    info!(
        "{} curated viewing spots, {} user spots",
        spots.curated().len(),
        spots.user_added().await.len()
    );

    let state = AppState::new(controller, spots);
    spawn_refresh_loop(state.clone(), config.refresh_interval);

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("nordlys-fc listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Open the service database, or run without one if it is disabled or broken
async fn open_database(config: &ServiceConfig) -> Option<Arc<SqliteCache>> {
    let Some(path) = &config.cache_path else {
        info!("Response cache disabled");
        return None;
    };

    match SqliteCache::open(path).await {
        Ok(cache) => {
            info!("Database: {}", path.display());
            Some(Arc::new(cache))
        }
        Err(e) => {
            warn!("Database unavailable ({}), running uncached", e);
            None
        }
    }
}

/// NOAA feeds plus MET Norway weather, wrapped in the response cache when enabled
fn build_sources(
    config: &ServiceConfig,
    position: GeoPosition,
    database: Option<Arc<SqliteCache>>,
) -> Result<Vec<Arc<dyn ForecastSource>>> {
    let noaa = Arc::new(NoaaClient::new(&config.user_agent).context("NOAA client")?);
    let mut sources = noaa_sources(noaa);

    let weather: Arc<dyn ForecastSource> = Arc::new(
        MetNorwaySource::new(position, &config.user_agent).context("MET Norway client")?,
    );
    let weather_slot = SourceKind::ALL
        .iter()
        .position(|kind| *kind == SourceKind::Weather)
        .unwrap_or(sources.len())
        .min(sources.len());
    sources.insert(weather_slot, weather);

    Ok(match database {
        Some(cache) => with_cache(sources, cache),
        None => sources,
    })
}

/// Curated list from the configured file (built-in list otherwise), with
/// user spots persisted in the service database when there is one
async fn build_spots(config: &ServiceConfig, database: Option<Arc<SqliteCache>>) -> SpotRegistry {
    let curated = match &config.curated_spots_path {
        Some(path) => load_curated(path).unwrap_or_else(|e| {
            warn!("{:#} - using built-in viewing spots", e);
            builtin_spots()
        }),
        None => builtin_spots(),
    };

    let Some(database) = database else {
        return SpotRegistry::new(curated);
    };

    match SpotRegistry::with_pool(curated.clone(), database.pool()).await {
        Ok(registry) => registry,
        Err(e) => {
            warn!("User spots will not be saved ({})", e);
            SpotRegistry::new(curated)
        }
    }
}

/// Refresh immediately, then every `interval`
fn spawn_refresh_loop(state: AppState, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let Ok(_guard) = state.refresh_lock.try_lock() else {
                debug!("Refresh already running, skipping tick");
                continue;
            };

            let report = state.controller.refresh().await;
            if let Some(score) = report.score.filter(|_| report.recomputed) {
                info!(
                    "Aurora score {} ({}) at {} UTC",
                    score.total,
                    score.verdict.label(),
                    format_clock(score.timestamp)
                );
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
