//! Human-readable time formatting
//!
//! Short relative ("5m ago") and clock ("23:05") strings for status output.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Relative age of `then` as seen from `now`
///
/// Under a minute (including timestamps slightly in the future) reads as
/// "just now"; otherwise the largest whole unit is used.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use nordlys_common::human_time::time_ago;
///
/// let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
/// assert_eq!(time_ago(now, now), "just now");
/// assert_eq!(time_ago(now - chrono::Duration::minutes(2), now), "2m ago");
/// assert_eq!(time_ago(now - chrono::Duration::hours(3), now), "3h ago");
/// assert_eq!(time_ago(now - chrono::Duration::days(2), now), "2d ago");
/// ```
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < MINUTE {
        return "just now".to_string();
    }
    if seconds < HOUR {
        return format!("{}m ago", seconds / MINUTE);
    }
    if seconds < DAY {
        return format!("{}h ago", seconds / HOUR);
    }
    format!("{}d ago", seconds / DAY)
}

/// `HH:MM` in UTC
pub fn format_clock(time: DateTime<Utc>) -> String {
    time.format("%H:%M").to_string()
}

/// `Mon DD, HH:MM` in UTC (e.g. "Jan 15, 23:05")
pub fn format_date_time(time: DateTime<Utc>) -> String {
    time.format("%b %-d, %H:%M").to_string()
}
