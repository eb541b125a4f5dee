//! Retention window parsing.
//!
//! Accepts the usual duration grammar (`300ms`, `1.5h`, `2h45m`, `-1h`) plus a
//! trailing `d` for days, so operators can write `LOG_RETENTION_MCP=7d`.

use std::fmt;
use std::time::SystemTime;

use chrono::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Errors produced while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("duration {0:?} is out of range")]
    OutOfRange(String),
}

/// How long log artifacts are kept before a sweep may delete them.
///
/// Zero or negative windows disable pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetentionWindow(Duration);

impl RetentionWindow {
    pub fn new(window: Duration) -> Self {
        Self(window)
    }

    pub fn disabled() -> Self {
        Self(Duration::zero())
    }

    pub fn hours(hours: i64) -> Self {
        Self(Duration::hours(hours))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_enabled(&self) -> bool {
        self.0 > Duration::zero()
    }

    /// The oldest modification time a file may have and still be kept.
    ///
    /// Returns `None` when pruning is disabled.
    pub fn cutoff(&self, now: SystemTime) -> Option<SystemTime> {
        if !self.is_enabled() {
            return None;
        }
        let window = self.0.to_std().ok()?;
        Some(now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH))
    }
}

/// Renders as `12h0m0s`; sub-second precision is dropped.
impl fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.num_seconds();
        if secs == 0 {
            return f.write_str("0s");
        }
        let sign = if secs < 0 { "-" } else { "" };
        let secs = secs.unsigned_abs();
        let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
        if h > 0 {
            write!(f, "{sign}{h}h{m}m{s}s")
        } else if m > 0 {
            write!(f, "{sign}{m}m{s}s")
        } else {
            write!(f, "{sign}{s}s")
        }
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Parse a retention string such as `""`, `"12h"`, `"90m"` or `"7d"`.
///
/// An empty string means "no retention" and is not an error.
pub fn parse_retention(input: &str) -> Result<RetentionWindow, DurationError> {
    if input.is_empty() {
        return Ok(RetentionWindow::disabled());
    }

    let nanos = match input.strip_suffix('d') {
        Some(days) => parse_nanos(&format!("{days}h"), input)?
            .checked_mul(24)
            .ok_or_else(|| DurationError::OutOfRange(input.to_string()))?,
        None => parse_nanos(input, input)?,
    };

    Ok(RetentionWindow(Duration::nanoseconds(nanos)))
}

/// Parse the standard grammar: an optionally signed sequence of decimal
/// numbers, each with an optional fraction and a mandatory unit.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    parse_nanos(input, input).map(Duration::nanoseconds)
}

/// `typed` is only used for error messages, so day-suffixed input reports
/// what the operator actually wrote.
fn parse_nanos(input: &str, typed: &str) -> Result<i64, DurationError> {
    let invalid = || DurationError::Invalid(typed.to_string());
    let out_of_range = || DurationError::OutOfRange(typed.to_string());

    let mut rest = input;
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        if !rest.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = leading_digits(rest);
        let whole = &rest[..digits];
        rest = &rest[digits..];

        let mut fraction = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let len = leading_digits(after_dot);
            fraction = &after_dot[..len];
            rest = &after_dot[len..];
        }
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(DurationError::MissingUnit(typed.to_string()));
        }
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: typed.to_string(),
        })?;

        let mut value: u128 = 0;
        for b in whole.bytes() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u128::from(b - b'0')))
                .filter(|v| *v <= i64::MAX as u128 + 1)
                .ok_or_else(out_of_range)?;
        }
        value = value.checked_mul(scale).ok_or_else(out_of_range)?;
        value += fraction_nanos(fraction, scale);

        total = total.checked_add(value).ok_or_else(out_of_range)?;
        if total > i64::MAX as u128 + 1 {
            return Err(out_of_range());
        }
    }

    if negative {
        // -2^63 is representable, +2^63 is not.
        Ok((total as i128).wrapping_neg() as i64)
    } else if total > i64::MAX as u128 {
        Err(out_of_range())
    } else {
        Ok(total as i64)
    }
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Nanoseconds contributed by the fractional digits, truncated.
fn fraction_nanos(fraction: &str, scale: u128) -> u128 {
    let mut numerator: u128 = 0;
    let mut denominator: u128 = 1;
    // Digits past this point cannot change the result at nanosecond resolution.
    for b in fraction.bytes().take(24) {
        numerator = numerator * 10 + u128::from(b - b'0');
        denominator *= 10;
    }
    numerator * scale / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_disabled() {
        let window = parse_retention("").unwrap();
        assert_eq!(window.as_duration(), Duration::zero());
        assert!(!window.is_enabled());
    }

    #[test]
    fn test_hours_and_days() {
        assert_eq!(parse_retention("24h").unwrap(), RetentionWindow::hours(24));
        assert_eq!(parse_retention("12h").unwrap(), RetentionWindow::hours(12));
        assert_eq!(parse_retention("7d").unwrap(), RetentionWindow::hours(168));
        assert_eq!(parse_retention("1.5d").unwrap(), RetentionWindow::hours(36));
    }

    #[test]
    fn test_standard_grammar() {
        assert_eq!(parse_duration("300ms").unwrap(), Duration::milliseconds(300));
        assert_eq!(parse_duration("2h45m").unwrap(), Duration::minutes(165));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::milliseconds(500));
        assert_eq!(parse_duration("10us").unwrap(), Duration::microseconds(10));
        assert_eq!(parse_duration("10µs").unwrap(), Duration::microseconds(10));
        assert_eq!(parse_duration("-1h").unwrap(), Duration::hours(-1));
        assert_eq!(parse_duration("+5s").unwrap(), Duration::seconds(5));
        assert_eq!(parse_duration("0").unwrap(), Duration::zero());
    }

    #[test]
    fn test_negative_window_is_disabled() {
        let window = parse_retention("-3h").unwrap();
        assert!(!window.is_enabled());
        assert!(window.cutoff(SystemTime::now()).is_none());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse_retention("bogus"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_retention("12"), Err(DurationError::MissingUnit(_))));
        assert!(matches!(parse_retention("5y"), Err(DurationError::UnknownUnit { .. })));
        assert!(parse_retention("d").is_err());
        assert!(parse_retention("-").is_err());
        assert!(parse_retention(".h").is_err());
        assert!(parse_retention("h").is_err());
    }

    #[test]
    fn test_day_error_reports_original_input() {
        let err = parse_retention("xd").unwrap_err();
        assert_eq!(err, DurationError::Invalid("xd".to_string()));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            parse_duration("9223372036854775808ns"),
            Err(DurationError::OutOfRange(_))
        ));
        assert!(parse_duration("-9223372036854775808ns").is_ok());
        assert!(matches!(parse_retention("200000d"), Err(DurationError::OutOfRange(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(RetentionWindow::hours(12).to_string(), "12h0m0s");
        assert_eq!(parse_retention("90s").unwrap().to_string(), "1m30s");
        assert_eq!(parse_retention("-2h").unwrap().to_string(), "-2h0m0s");
        assert_eq!(RetentionWindow::disabled().to_string(), "0s");
    }

    #[test]
    fn test_cutoff() {
        let now = SystemTime::now();
        let cutoff = RetentionWindow::hours(1).cutoff(now).unwrap();
        assert_eq!(now.duration_since(cutoff).unwrap().as_secs(), 3600);
    }
}
