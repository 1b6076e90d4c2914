//! Solar position
//!
//! Simplified solar elevation, accurate to about ±1°. That is plenty for a
//! civil-twilight gate and needs no ephemeris tables.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Civil twilight: the sun must be below this elevation for the sky to be dark
pub const CIVIL_TWILIGHT_DEG: f64 = -6.0;

/// Solar elevation angle in degrees for a UTC instant and position
///
/// Always finite for finite inputs.
pub fn solar_elevation(time: DateTime<Utc>, lat: f64, lon: f64) -> f64 {
    let day_of_year = time.ordinal() as f64;
    let hours = time.hour() as f64 + time.minute() as f64 / 60.0;

    // Single-cosine declination approximation
    let declination = -23.44 * ((360.0 / 365.0) * (day_of_year + 10.0)).to_radians().cos();

    // 15° per hour away from local solar noon
    let solar_noon_utc = 12.0 - lon / 15.0;
    let hour_angle = (hours - solar_noon_utc) * 15.0;

    let lat_rad = lat.to_radians();
    let dec_rad = declination.to_radians();
    let ha_rad = hour_angle.to_radians();

    let sin_elev =
        lat_rad.sin() * dec_rad.sin() + lat_rad.cos() * dec_rad.cos() * ha_rad.cos();

    sin_elev.clamp(-1.0, 1.0).asin().to_degrees()
}

/// True when the sun is below civil twilight
pub fn is_dark_enough(time: DateTime<Utc>, lat: f64, lon: f64) -> bool {
    solar_elevation(time, lat, lon) < CIVIL_TWILIGHT_DEG
}
