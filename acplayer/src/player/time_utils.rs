//! Time formatting and parsing utilities for the player screens.
//!
//! Positions and durations travel as milliseconds; screens show them as
//! `MM:SS` (minutes are not wrapped at 60, so a 75 minute book reads `75:00`).

use crate::errors::PlaybackError;

/// Formats milliseconds as MM:SS.
///
/// # Examples
/// ```
/// # use acplayer::time_utils::format_mmss;
/// assert_eq!(format_mmss(0), "00:00");
/// assert_eq!(format_mmss(61_000), "01:01");
/// assert_eq!(format_mmss(4_500_000), "75:00");
/// ```
pub fn format_mmss(milliseconds: u64) -> String {
    let total_secs = ms_to_seconds(milliseconds);
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Parses a time string in HH:MM:SS, MM:SS, or SS format to seconds.
///
/// # Examples
/// ```
/// # use acplayer::time_utils::parse_time_flexible;
/// assert_eq!(parse_time_flexible("01:02:03").unwrap(), 3723);
/// assert_eq!(parse_time_flexible("02:03").unwrap(), 123);
/// assert_eq!(parse_time_flexible("42").unwrap(), 42);
/// ```
///
/// # Errors
/// Returns an error if the input has more than 3 parts, if any part is
/// not a valid number, or if the total does not fit in a `u64`.
pub fn parse_time_flexible(input: &str) -> Result<u64, PlaybackError> {
    let input = input.trim();
    let parts: Vec<&str> = input.split(':').collect();

    if parts.len() > 3 {
        return Err(PlaybackError::InvalidTimeFormat(format!(
            "Invalid time format '{}': expected HH:MM:SS, MM:SS, or SS",
            input
        )));
    }

    let mut total = 0u64;
    for part in parts {
        let value = part.parse::<u64>().map_err(|_| {
            PlaybackError::InvalidTimeFormat(format!(
                "Invalid numeric value '{}' in time string '{}'",
                part, input
            ))
        })?;
        total = total
            .checked_mul(60)
            .and_then(|minutes| minutes.checked_add(value))
            .ok_or_else(|| {
                PlaybackError::InvalidTimeFormat(format!("Time '{}' is out of range", input))
            })?;
    }

    Ok(total)
}

/// Converts milliseconds to seconds (rounding down).
#[inline]
pub fn ms_to_seconds(milliseconds: u64) -> u64 {
    milliseconds / 1000
}

/// Converts seconds to milliseconds, saturating at `u64::MAX`.
#[inline]
pub fn seconds_to_ms(seconds: u64) -> u64 {
    seconds.saturating_mul(1000)
}
