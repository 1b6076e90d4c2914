//! "Latest value" readers over upstream series
//!
//! Upstream feeds append readings in chronological order, so the last element
//! that passes a reader's filter is the most recent valid reading. Readers scan
//! from the back and never sort: ties are broken by position, not by value or
//! timestamp.

use crate::types::{HemisphericPower, Hemisphere, KpReading, KpSource, SolarWind, WeatherPoint};
use chrono::{DateTime, Utc};

/// Value of the last element for which `extract` yields something
fn latest_where<T, V>(series: &[T], extract: impl Fn(&T) -> Option<V>) -> Option<V> {
    series.iter().rev().find_map(extract)
}

/// Most recent observed 3-hourly Kp, or 0
pub fn latest_kp(readings: &[KpReading]) -> f64 {
    latest_where(readings, |r| (r.source == KpSource::Observed).then_some(r.kp)).unwrap_or(0.0)
}

/// Most recent high-frequency Kp regardless of source tag, or 0
pub fn latest_kp_high_frequency(readings: &[KpReading]) -> f64 {
    readings.last().map(|r| r.kp).unwrap_or(0.0)
}

/// Most recent finite Bz, or 0
pub fn latest_bz(readings: &[SolarWind]) -> f64 {
    latest_where(readings, |r| r.bz.is_finite().then_some(r.bz)).unwrap_or(0.0)
}

/// Most recent present and finite solar-wind speed, or 0
pub fn latest_speed(readings: &[SolarWind]) -> f64 {
    latest_where(readings, |r| r.speed.filter(|s| s.is_finite())).unwrap_or(0.0)
}

/// Most recent northern-hemisphere power, or 0
pub fn latest_hemispheric_power(readings: &[HemisphericPower]) -> f64 {
    latest_where(readings, |r| {
        (r.hemisphere == Hemisphere::North).then_some(r.power)
    })
    .unwrap_or(0.0)
}

/// Weather point nearest to `time`
///
/// Distance is absolute, so a point in the past can win over one in the
/// future. Equal distances resolve to the earlier index.
pub fn weather_at(points: &[WeatherPoint], time: DateTime<Utc>) -> Option<&WeatherPoint> {
    let mut closest: Option<(&WeatherPoint, i64)> = None;

    for point in points {
        let diff = (point.time - time).num_milliseconds().abs();
        match closest {
            Some((_, best)) if diff >= best => {}
            _ => closest = Some((point, diff)),
        }
    }

    closest.map(|(point, _)| point)
}

/// First candidate that is not a placeholder, else `fallback`
///
/// Redundant feeds are listed in preference order (e.g. propagated solar wind
/// before raw L1 data); a reader's documented default counts as a placeholder.
pub fn first_available<T: Copy>(
    candidates: impl IntoIterator<Item = T>,
    is_usable: impl Fn(T) -> bool,
    fallback: T,
) -> T {
    candidates
        .into_iter()
        .find(|&candidate| is_usable(candidate))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, m, 0).unwrap()
    }

    fn kp(h: u32, value: f64, source: KpSource) -> KpReading {
        KpReading {
            time: at(h, 0),
            kp: value,
            source,
        }
    }

    fn bz(h: u32, value: f64) -> SolarWind {
        SolarWind::magnetic(at(h, 0), value, 5.0)
    }

    fn speed(h: u32, value: Option<f64>) -> SolarWind {
        SolarWind::plasma(at(h, 0), value, None)
    }

    fn power(h: u32, value: f64, hemisphere: Hemisphere) -> HemisphericPower {
        HemisphericPower {
            time: at(h, 0),
            power: value,
            hemisphere,
        }
    }

    fn weather(time: DateTime<Utc>, cloud_cover: f64) -> WeatherPoint {
        WeatherPoint {
            time,
            cloud_cover,
            temperature: -5.0,
            wind_speed: 3.0,
            symbol_code: None,
        }
    }

    // ------------------------------------------------------------------
    // Kp
    // ------------------------------------------------------------------

    #[test]
    fn test_latest_kp_empty() {
        assert_eq!(latest_kp(&[]), 0.0);
    }

    #[test]
    fn test_latest_kp_no_observed() {
        let readings = [
            kp(0, 5.0, KpSource::Predicted),
            kp(3, 3.0, KpSource::Estimated),
        ];
        assert_eq!(latest_kp(&readings), 0.0);
    }

    #[test]
    fn test_latest_kp_skips_estimated_and_predicted() {
        let readings = [
            kp(0, 2.0, KpSource::Observed),
            kp(3, 8.0, KpSource::Predicted),
            kp(6, 5.0, KpSource::Observed),
            kp(9, 9.0, KpSource::Estimated),
        ];
        assert_eq!(latest_kp(&readings), 5.0);
    }

    #[test]
    fn test_latest_kp_high_frequency_ignores_source() {
        assert_eq!(latest_kp_high_frequency(&[]), 0.0);

        let readings = [
            kp(0, 5.0, KpSource::Observed),
            kp(1, 6.2, KpSource::Estimated),
        ];
        assert_eq!(latest_kp_high_frequency(&readings), 6.2);
    }

    // ------------------------------------------------------------------
    // Solar wind
    // ------------------------------------------------------------------

    #[test]
    fn test_latest_bz_all_nan() {
        assert_eq!(latest_bz(&[]), 0.0);
        assert_eq!(latest_bz(&[bz(0, f64::NAN), bz(1, f64::NAN)]), 0.0);
    }

    #[test]
    fn test_latest_bz_skips_nan_tail() {
        let readings = [bz(0, -3.5), bz(1, f64::NAN), bz(2, -7.1), bz(3, f64::NAN)];
        assert_eq!(latest_bz(&readings), -7.1);
    }

    #[test]
    fn test_latest_bz_uses_position_not_timestamp() {
        // Out-of-order timestamps: the last element still wins
        let readings = [bz(5, -9.0), bz(1, 2.8)];
        assert_eq!(latest_bz(&readings), 2.8);
    }

    #[test]
    fn test_latest_speed() {
        assert_eq!(latest_speed(&[]), 0.0);
        assert_eq!(latest_speed(&[bz(0, -3.0), bz(1, -1.0)]), 0.0);

        let readings = [
            speed(0, Some(500.0)),
            speed(1, Some(f64::NAN)),
            speed(2, Some(650.0)),
            speed(3, None),
        ];
        assert_eq!(latest_speed(&readings), 650.0);
    }

    // ------------------------------------------------------------------
    // Hemispheric power
    // ------------------------------------------------------------------

    #[test]
    fn test_latest_hemispheric_power_north_only() {
        assert_eq!(latest_hemispheric_power(&[]), 0.0);
        assert_eq!(
            latest_hemispheric_power(&[power(0, 50.0, Hemisphere::South)]),
            0.0
        );

        let readings = [
            power(0, 30.0, Hemisphere::North),
            power(1, 45.0, Hemisphere::South),
            power(2, 55.0, Hemisphere::North),
            power(3, 70.0, Hemisphere::South),
        ];
        assert_eq!(latest_hemispheric_power(&readings), 55.0);
    }

    // ------------------------------------------------------------------
    // Weather
    // ------------------------------------------------------------------

    #[test]
    fn test_weather_at_empty() {
        assert!(weather_at(&[], at(12, 0)).is_none());
    }

    #[test]
    fn test_weather_at_single_point() {
        let points = [weather(at(12, 0), 10.0)];
        assert_eq!(weather_at(&points, at(18, 0)), Some(&points[0]));
    }

    #[test]
    fn test_weather_at_nearest() {
        let points = [
            weather(at(6, 0), 10.0),
            weather(at(12, 0), 20.0),
            weather(at(18, 0), 30.0),
        ];
        let found = weather_at(&points, at(13, 0)).unwrap();
        assert_eq!(found.cloud_cover, 20.0);
    }

    #[test]
    fn test_weather_at_tie_prefers_earlier_index() {
        let points = [weather(at(10, 0), 10.0), weather(at(14, 0), 90.0)];
        let found = weather_at(&points, at(12, 0)).unwrap();
        assert_eq!(found.cloud_cover, 10.0);

        // Same distance, reversed order: index still decides
        let reversed = [weather(at(14, 0), 90.0), weather(at(10, 0), 10.0)];
        let found = weather_at(&reversed, at(12, 0)).unwrap();
        assert_eq!(found.cloud_cover, 90.0);
    }

    // ------------------------------------------------------------------
    // Preference helper
    // ------------------------------------------------------------------

    #[test]
    fn test_first_available_prefers_earlier_candidate() {
        assert_eq!(first_available([4.7, 3.0], |kp| kp > 0.0, 0.0), 4.7);
        assert_eq!(first_available([0.0, 3.0], |kp| kp > 0.0, 0.0), 3.0);
        assert_eq!(first_available([0.0, 0.0], |kp| kp > 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_first_available_nonzero_bz() {
        assert_eq!(first_available([-4.0, 2.0], |bz| bz != 0.0, 0.0), -4.0);
        assert_eq!(first_available([0.0, 2.0], |bz| bz != 0.0, 0.0), 2.0);
        assert_eq!(first_available(Vec::<f64>::new(), |bz| bz != 0.0, 0.0), 0.0);
    }
}
