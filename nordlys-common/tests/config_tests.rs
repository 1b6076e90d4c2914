//! Configuration loading and location resolution tests
//!
//! Tests that touch NORDLYS_LAT / NORDLYS_LON are marked #[serial] so they
//! never race on process environment.

use nordlys_common::config::{
    load_toml_config, load_toml_config_or_default, LocationConfig, LocationOrigin,
    LocationResolver, TomlConfig, LAT_ENV_VAR, LON_ENV_VAR,
};
use nordlys_common::GeoPosition;
use serial_test::serial;
use std::env;
use std::io::Write;

fn clear_env() {
    env::remove_var(LAT_ENV_VAR);
    env::remove_var(LON_ENV_VAR);
}

// =============================================================================
// TOML loading
// =============================================================================

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = load_toml_config_or_default(Some(path.as_path()));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_no_path_uses_defaults() {
    assert_eq!(load_toml_config_or_default(None), TomlConfig::default());
}

#[test]
fn test_malformed_file_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    assert!(load_toml_config(file.path()).is_err());
    assert_eq!(
        load_toml_config_or_default(Some(file.path())),
        TomlConfig::default()
    );
}

#[test]
fn test_valid_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 5999\n[location]\nlat = 70.0\nlon = 25.5").unwrap();

    let config = load_toml_config_or_default(Some(file.path()));
    assert_eq!(config.port, Some(5999));
    assert_eq!(config.location, Some(LocationConfig { lat: 70.0, lon: 25.5 }));
}

// =============================================================================
// Location priority
// =============================================================================

#[test]
#[serial]
fn test_no_overrides_resolves_to_tromso() {
    clear_env();

    let (position, origin) = LocationResolver::new(None, None).resolve();
    assert_eq!(position, GeoPosition::TROMSO);
    assert_eq!(origin, LocationOrigin::Default);
}

#[test]
#[serial]
fn test_cli_takes_precedence() {
    env::set_var(LAT_ENV_VAR, "60.0");
    env::set_var(LON_ENV_VAR, "10.0");

    let cli = GeoPosition::new(68.0, 16.0);
    let toml = LocationConfig { lat: 65.0, lon: 12.0 };
    let (position, origin) = LocationResolver::new(Some(cli), Some(toml)).resolve();

    assert_eq!(position, cli);
    assert_eq!(origin, LocationOrigin::CommandLine);

    clear_env();
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(LAT_ENV_VAR, "60.5");
    env::set_var(LON_ENV_VAR, "10.25");

    let toml = LocationConfig { lat: 65.0, lon: 12.0 };
    let (position, origin) = LocationResolver::new(None, Some(toml)).resolve();

    assert_eq!(position, GeoPosition::new(60.5, 10.25));
    assert_eq!(origin, LocationOrigin::Environment);

    clear_env();
}

#[test]
#[serial]
fn test_partial_env_is_ignored() {
    clear_env();
    env::set_var(LAT_ENV_VAR, "60.5");

    let toml = LocationConfig { lat: 65.0, lon: 12.0 };
    let (position, origin) = LocationResolver::new(None, Some(toml)).resolve();

    assert_eq!(position, GeoPosition::new(65.0, 12.0));
    assert_eq!(origin, LocationOrigin::ConfigFile);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_fall_through() {
    env::set_var(LAT_ENV_VAR, "north");
    env::set_var(LON_ENV_VAR, "10.0");

    let cli = GeoPosition::new(123.0, 16.0);
    let toml = LocationConfig { lat: 65.0, lon: 999.0 };
    let (position, origin) = LocationResolver::new(Some(cli), Some(toml)).resolve();

    assert_eq!(position, GeoPosition::TROMSO);
    assert_eq!(origin, LocationOrigin::Default);

    clear_env();
}
