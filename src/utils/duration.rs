//! Duration parsing utilities.
//!
//! This module parses duration strings such as "500ms", "5s" or "2m"
//! used by timeout options.

use std::time::Duration;

/// Parse a duration string (e.g., "500ms", "5s", "2m") into a [`Duration`]
///
/// Supports:
/// - Raw seconds: "30"
/// - Milliseconds: "500ms", "500msec", "500millis"
/// - Seconds: "30s", "30sec", "30secs", "30second", "30seconds"
/// - Minutes: "2m", "2min", "2mins", "2minute", "2minutes"
///
/// # Examples
/// ```
/// use nodemesh::utils::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30"), Ok(Duration::from_secs(30)));
/// assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
/// assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
/// assert!(parse_duration("soon").is_err());
/// ```
pub fn parse_duration(duration: &str) -> Result<Duration, String> {
    let duration = duration.trim();
    let (number, unit) = duration.split_at(number_len(duration));

    let value: u64 = number
        .parse()
        .map_err(|_| format!("Invalid duration format: {}", duration))?;

    match unit {
        "" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "millis" => Ok(Duration::from_millis(value)),
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "m" | "min" | "mins" | "minute" | "minutes" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("Duration too large: {}", duration)),
        _ => Err(format!("Invalid duration format: {}", duration)),
    }
}

/// Parse a timeout: a duration as accepted by [`parse_duration`] that is
/// not zero.
///
/// ```
/// use nodemesh::utils::duration::parse_timeout;
/// use std::time::Duration;
///
/// assert_eq!(parse_timeout("5s"), Ok(Duration::from_secs(5)));
/// assert!(parse_timeout("0ms").is_err());
/// ```
pub fn parse_timeout(timeout: &str) -> Result<Duration, String> {
    let duration = parse_duration(timeout)?;
    if duration.is_zero() {
        return Err(format!("Timeout must be greater than zero: {}", timeout.trim()));
    }
    Ok(duration)
}

/// Length of the leading run of ASCII digits
fn number_len(duration: &str) -> usize {
    duration
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(duration.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));

        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("250millis"), Ok(Duration::from_millis(250)));

        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("5sec"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("5seconds"), Ok(Duration::from_secs(5)));

        assert_eq!(parse_duration("3m"), Ok(Duration::from_secs(180)));
        assert_eq!(parse_duration("3minutes"), Ok(Duration::from_secs(180)));
        assert_eq!(parse_duration(" 3min "), Ok(Duration::from_secs(180)));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("5secondsx").is_err());
    }

    #[test]
    fn test_minutes_overflow_is_an_error() {
        assert!(parse_duration("307445734561825861m").is_err());
        assert_eq!(
            parse_duration("307445734561825860m"),
            Ok(Duration::from_secs(307445734561825860 * 60))
        );
        assert!(parse_duration("99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_timeout_rejects_zero() {
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("0m").is_err());
        assert_eq!(parse_timeout("1ms"), Ok(Duration::from_millis(1)));
        assert!(parse_timeout("later").is_err());
    }
}
