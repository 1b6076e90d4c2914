//! Aurora visibility scoring
//!
//! Combines six factors into a 0-100 score for a given place and time:
//!
//! 1. Kp contribution (0 to 30): Kp 1 gives nothing, Kp 5+ saturates
//! 2. Cloud cover penalty (0 to -40): linear in cloud fraction
//! 3. Darkness gate (binary): sun must be below -6° elevation
//! 4. Solar wind Bz bonus (0 to 15): southward IMF only
//! 5. Solar wind speed bonus (0 to 10): 400 km/s to 700 km/s
//! 6. Hemispheric power bonus (0 to 15): 20 GW to 100 GW
//!
//! Every contribution is computed before gating so diagnostics always see the
//! full breakdown. The engine is pure: the clock is an argument.

use crate::sun::{solar_elevation, CIVIL_TWILIGHT_DEG};
use crate::types::{AuroraScore, AuroraVerdict, GeoPosition};
use chrono::{DateTime, Utc};

const KP_POINTS_PER_UNIT: f64 = 7.5;
const KP_MAX: f64 = 30.0;
const CLOUD_PENALTY_MAX: f64 = 40.0;
const BZ_BONUS_MAX: f64 = 15.0;
const SPEED_THRESHOLD_KMS: f64 = 400.0;
const SPEED_RANGE_KMS: f64 = 300.0;
const SPEED_BONUS_MAX: f64 = 10.0;
const POWER_THRESHOLD_GW: f64 = 20.0;
const POWER_RANGE_GW: f64 = 80.0;
const POWER_BONUS_MAX: f64 = 15.0;

/// Fused inputs for one scoring pass
///
/// `wind_speed` and `hemispheric_power` default to 0 (no bonus) when the
/// corresponding feeds are unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreInputs {
    /// Planetary Kp index
    pub kp: f64,
    /// Cloud cover, 0-100 %
    pub cloud_cover: f64,
    /// IMF Bz in nT
    pub bz: f64,
    /// Solar wind speed in km/s
    pub wind_speed: f64,
    /// Northern hemispheric power in GW
    pub hemispheric_power: f64,
}

/// Calculate the aurora visibility score at `time` for `position`
pub fn calculate_aurora_score(
    inputs: &ScoreInputs,
    time: DateTime<Utc>,
    position: GeoPosition,
) -> AuroraScore {
    let kp = finite_or_zero(inputs.kp);
    let cloud_cover = finite_or_zero(inputs.cloud_cover);
    let bz = finite_or_zero(inputs.bz);
    let wind_speed = finite_or_zero(inputs.wind_speed);
    let hemispheric_power = finite_or_zero(inputs.hemispheric_power);

    let kp_contribution = ((kp - 1.0) * KP_POINTS_PER_UNIT).clamp(0.0, KP_MAX);

    let cloud_penalty = -(cloud_cover / 100.0) * CLOUD_PENALTY_MAX;

    let elevation = solar_elevation(time, position.lat, position.lon);
    let darkness_gate = elevation < CIVIL_TWILIGHT_DEG;

    let solar_wind_bonus = if bz < 0.0 {
        bz.abs().min(BZ_BONUS_MAX)
    } else {
        0.0
    };

    let speed_bonus = if wind_speed > SPEED_THRESHOLD_KMS {
        ((wind_speed - SPEED_THRESHOLD_KMS) / SPEED_RANGE_KMS * SPEED_BONUS_MAX)
            .clamp(0.0, SPEED_BONUS_MAX)
    } else {
        0.0
    };

    let hemispheric_power_bonus = if hemispheric_power > POWER_THRESHOLD_GW {
        ((hemispheric_power - POWER_THRESHOLD_GW) / POWER_RANGE_GW * POWER_BONUS_MAX)
            .clamp(0.0, POWER_BONUS_MAX)
    } else {
        0.0
    };

    let raw_total = if darkness_gate {
        kp_contribution + cloud_penalty + solar_wind_bonus + speed_bonus + hemispheric_power_bonus
    } else {
        0.0
    };
    let total = round_half_up(raw_total.clamp(0.0, 100.0)) as u8;

    AuroraScore {
        total,
        verdict: AuroraVerdict::from_total(total),
        kp_contribution: round_half_up(kp_contribution) as i32,
        cloud_penalty: round_half_up(cloud_penalty) as i32,
        darkness_gate,
        solar_wind_bonus: round_half_up(solar_wind_bonus) as i32,
        speed_bonus: round_half_up(speed_bonus) as i32,
        hemispheric_power_bonus: round_half_up(hemispheric_power_bonus) as i32,
        kp: inputs.kp,
        cloud_cover: inputs.cloud_cover,
        solar_elevation: elevation,
        timestamp: time,
    }
}

/// Round halves toward +infinity (`-0.5 → 0`, `7.5 → 8`)
pub fn round_half_up(value: f64) -> f64 {
    let rounded = (value + 0.5).floor();
    // Avoid reporting -0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
