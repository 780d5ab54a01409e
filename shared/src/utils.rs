//! Utility functions for the connection load generator
//!
//! Duration parsing/formatting for the hold option and host:port handling
//! shared by configuration validation and the transport layer.

use crate::ConfigError;
use std::time::Duration;

/// Parse a duration such as "5m", "30s", "1m30s", "250ms", "1.5s" or "2h"
///
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ConfigError::Config("empty duration".to_string()));
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let invalid = || ConfigError::Config(format!("invalid duration '{}'", input));

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_len] {
            "h" => 3_600_000_000_000.0,
            "m" => 60_000_000_000.0,
            "s" => 1_000_000_000.0,
            "ms" => 1_000_000.0,
            "us" | "µs" => 1_000.0,
            "ns" => 1.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let nanos = (value * unit_nanos).round();
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            return Err(invalid());
        }
        total = total
            .checked_add(Duration::from_nanos(nanos as u64))
            .ok_or_else(invalid)?;
    }

    Ok(total)
}

/// Format a duration compactly, e.g. "5m", "1m30s", "1.5s", "250ms", "0s"
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    if duration < Duration::from_secs(1) {
        return format!("{}ms", trim_fraction(duration.as_secs_f64() * 1000.0));
    }

    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 || duration.subsec_nanos() != 0 {
        let seconds = seconds as f64 + f64::from(duration.subsec_nanos()) / 1e9;
        out.push_str(&format!("{}s", trim_fraction(seconds)));
    }
    out
}

/// Three decimals at most, trailing zeros dropped
fn trim_fraction(value: f64) -> String {
    let s = format!("{:.3}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Split "host:port" into its parts, accepting bracketed IPv6 hosts ("[::1]:443")
///
/// Returns `None` when there is no port separator. The host is returned
/// without brackets.
pub fn split_host_port(address: &str) -> Option<(&str, &str)> {
    let address = address.trim();
    if let Some(rest) = address.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = after.strip_prefix(':')?;
        return Some((host, port));
    }

    let (host, port) = address.rsplit_once(':')?;
    // An unbracketed IPv6 literal has no unambiguous port
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("m5").is_err());
        assert!(parse_duration("10").is_ok());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h1m1s");
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("example.com:443"),
            Some(("example.com", "443"))
        );
        assert_eq!(split_host_port("[::1]:8443"), Some(("::1", "8443")));
        assert_eq!(split_host_port("example.com"), None);
        assert_eq!(split_host_port("::1"), None);
        assert_eq!(split_host_port("[::1]"), None);
    }
}
