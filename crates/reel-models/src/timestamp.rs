//! Timestamp parsing and derivation utilities.
//!
//! Model responses carry timestamps as loose strings (`HH:MM:SS`, `MM:SS`,
//! bare seconds, optional milliseconds). This module converts them to and
//! from numeric seconds and derives frame numbers for downstream renderers.

use thiserror::Error;

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_VIDEO_DURATION_SECS: f64 = 86_400.0;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS, or SS")]
    InvalidFormat(String),
}

/// Parse a timestamp string to total seconds.
///
/// Supports `HH:MM:SS`, `MM:SS`, and `SS`, each with an optional `.mmm`
/// fractional part.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let components: Vec<f64> = match parts.len() {
        1..=3 => {
            let names = ["hours", "minutes", "seconds"];
            let offset = 3 - parts.len();
            parts
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    p.trim()
                        .parse::<f64>()
                        .map_err(|_| TimestampError::InvalidValue(names[offset + i], p.to_string()))
                })
                .collect::<Result<_, _>>()?
        }
        _ => return Err(TimestampError::InvalidFormat(ts.to_string())),
    };

    if components.iter().any(|&c| c < 0.0) {
        return Err(TimestampError::Negative);
    }

    Ok(components
        .iter()
        .fold(0.0, |total, &c| total * 60.0 + c))
}

/// Format seconds as zero-padded `HH:MM:SS`, rounded to the whole second.
pub fn format_seconds(total_secs: f64) -> String {
    let s = total_secs.max(0.0).round() as u64;
    let hours = s / 3600;
    let mins = (s % 3600) / 60;
    let secs = s % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Frame number at the given timestamp, rounded to the nearest frame.
pub fn frame_at(seconds: f64, fps: f64) -> u64 {
    (seconds.max(0.0) * fps.max(0.0)).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_hh_mm_ss() {
        assert_eq!(parse_timestamp("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_timestamp("00:01:00").unwrap(), 60.0);
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timestamp_mm_ss() {
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("53:53").unwrap(), 3233.0);
    }

    #[test]
    fn test_parse_timestamp_ss() {
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert_eq!(parse_timestamp("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_timestamp_with_milliseconds() {
        let result = parse_timestamp("00:00:30.500").unwrap();
        assert!((result - 30.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert!(matches!(parse_timestamp(""), Err(TimestampError::Empty)));
        assert!(matches!(parse_timestamp("  "), Err(TimestampError::Empty)));
        assert!(matches!(
            parse_timestamp("abc"),
            Err(TimestampError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_timestamp("-5"),
            Err(TimestampError::Negative)
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(90.0), "00:01:30");
        assert_eq!(format_seconds(3661.0), "01:01:01");
        // Whole-second rounding
        assert_eq!(format_seconds(29.6), "00:00:30");
        assert_eq!(format_seconds(-1.0), "00:00:00");
    }

    #[test]
    fn test_frame_at() {
        assert_eq!(frame_at(0.0, 30.0), 0);
        assert_eq!(frame_at(1.0, 29.97), 30);
        assert_eq!(frame_at(10.5, 24.0), 252);
    }
}
