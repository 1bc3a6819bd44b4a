use chrono::{DateTime, Local, Utc};
use num_traits::ToPrimitive;

/// Formats a number of seconds as `HH:MM:SS`. Hours are not wrapped at 24.
#[must_use]
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Whole seconds from `from` to `to`, zero if `to` is not after `from`
#[must_use]
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().to_u64().unwrap_or(0)
}

/// Short local time representation used in listings and comment prefixes
#[must_use]
pub fn to_local_string(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
