//! Conversion between decimal seconds and clock strings.
//!
//! Cue times are held as whole milliseconds; every conversion in and out of
//! the crate goes through the helpers here so that formatting and parsing
//! agree to the millisecond.

use crate::error::{Result, SubforgeError};

/// Clamp a duration in seconds to whole, non-negative milliseconds.
///
/// Negative, NaN and infinite inputs become zero.
pub fn seconds_to_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

pub fn millis_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Hours are always zero-padded to at least two digits; parsing also accepts
/// the unpadded `H:MM:SS.fff` form.
pub fn seconds_to_timecode(seconds: f64) -> String {
    format_millis(seconds_to_millis(seconds), '.')
}

/// Format seconds as `H:MM:SS.cc`, the clock used by ASS event lines.
pub fn seconds_to_centi_timecode(seconds: f64) -> String {
    format_centis(seconds_to_millis(seconds))
}

/// Parse a clock string leniently: malformed input yields `0.0`.
pub fn timecode_to_seconds(input: &str) -> f64 {
    parse_timecode(input).unwrap_or(0.0)
}

/// Parse `[[H:]MM:]SS[.fff]` (comma or dot separator) into seconds.
pub fn parse_timecode(input: &str) -> Result<f64> {
    parse_timecode_millis(input).map(millis_to_seconds)
}

/// Parse a clock string into whole milliseconds.
///
/// Fractions longer than three digits are rounded to the nearest millisecond.
pub fn parse_timecode_millis(input: &str) -> Result<u64> {
    let invalid = || SubforgeError::Validation(format!("Invalid time code '{}'", input.trim()));

    let normalized = input.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err(invalid());
    }

    let (clock, fraction) = match normalized.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (normalized.as_str(), None),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let mut whole_secs: u64 = 0;
    for part in parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = part.parse().map_err(|_| invalid())?;
        whole_secs = whole_secs
            .checked_mul(60)
            .and_then(|secs| secs.checked_add(value))
            .ok_or_else(invalid)?;
    }

    let frac_ms = match fraction {
        None => 0,
        Some(digits) => {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            fraction_to_millis(digits)
        }
    };

    whole_secs
        .checked_mul(1000)
        .and_then(|ms| ms.checked_add(frac_ms))
        .ok_or_else(invalid)
}

fn fraction_to_millis(digits: &str) -> u64 {
    let padded: String = digits.chars().chain("000".chars()).take(3).collect();
    let mut ms: u64 = padded.parse().unwrap_or(0);
    if let Some(next) = digits.chars().nth(3).and_then(|c| c.to_digit(10)) {
        if next >= 5 {
            ms += 1;
        }
    }
    ms
}

pub(crate) fn format_millis(ms: u64, separator: char) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, seconds, separator, millis)
}

pub(crate) fn format_centis(ms: u64) -> String {
    let centis = (ms + 5) / 10;
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6000;
    let seconds = (centis % 6000) / 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_timecode() {
        assert_eq!(seconds_to_timecode(0.0), "00:00:00.000");
        assert_eq!(seconds_to_timecode(1.5), "00:00:01.500");
        assert_eq!(seconds_to_timecode(3661.123), "01:01:01.123");
    }

    #[test]
    fn test_negative_and_nan_clamp_to_zero() {
        assert_eq!(seconds_to_timecode(-4.2), "00:00:00.000");
        assert_eq!(seconds_to_millis(f64::NAN), 0);
        assert_eq!(timecode_to_seconds("-00:00:01.000"), 0.0);
    }

    #[test]
    fn test_centi_timecode() {
        assert_eq!(seconds_to_centi_timecode(1.5), "0:00:01.50");
        assert_eq!(seconds_to_centi_timecode(3600.0), "1:00:00.00");
        assert_eq!(seconds_to_centi_timecode(59.996), "0:01:00.00");
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(parse_timecode_millis("00:00:01,500").unwrap(), 1500);
        assert_eq!(parse_timecode_millis("00:01.250").unwrap(), 61_250);
        assert_eq!(parse_timecode_millis("1:02:03.4").unwrap(), 3_723_400);
        assert_eq!(parse_timecode_millis("12").unwrap(), 12_000);
        assert_eq!(parse_timecode_millis("0:00:00.12345").unwrap(), 123);
        assert_eq!(parse_timecode_millis("0:00:00.9996").unwrap(), 1000);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("aa:bb:cc").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
        assert!(parse_timecode("00:00:01.").is_err());
        assert_eq!(timecode_to_seconds("garbage"), 0.0);
    }

    #[test]
    fn test_round_trip_within_a_millisecond() {
        let mut d = 0.0;
        while d < 7200.0 {
            let back = timecode_to_seconds(&seconds_to_timecode(d));
            assert!((back - d).abs() <= 0.001, "{d} came back as {back}");
            d += 123.4567;
        }
    }
}
