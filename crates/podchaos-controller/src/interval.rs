//! Experiment interval parsing
//!
//! Intervals use the duration syntax familiar from Kubernetes manifests: a
//! sequence of decimal numbers, each with a unit suffix, such as "30s",
//! "1.5h" or "1h30m". Each whole-number term is handed to `humantime`, so
//! its unit names ("ms", "min", "hours", ...) are accepted too. A zero
//! interval means the experiment is not repeated on a timer.

use crate::error::{ControllerError, Result};
use std::time::Duration;

/// Interval used when a Monkey does not declare one
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Resolve a Monkey's interval text, substituting the default when empty
pub fn resolve_interval(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(DEFAULT_INTERVAL);
    }
    parse_duration(text)
}

/// Parse a non-empty duration expression
pub fn parse_duration(text: &str) -> Result<Duration> {
    let invalid = |reason: &str| ControllerError::invalid_interval(text, reason);

    let rest = text.strip_prefix('+').unwrap_or(text);
    if rest.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let terms = split_terms(rest);
    if terms.is_empty() {
        return Err(invalid("empty duration"));
    }

    terms.into_iter().try_fold(Duration::ZERO, |total, term| {
        let value = parse_term(term).map_err(|reason| invalid(&reason))?;
        total
            .checked_add(value)
            .ok_or_else(|| invalid("value out of range"))
    })
}

/// Split "1h30m" or "1h 30m" into its "<number><unit>" terms
fn split_terms(text: &str) -> Vec<&str> {
    let is_numeric = |c: char| c.is_ascii_digit() || c == '.';
    let mut terms = Vec::new();
    for chunk in text.split_whitespace() {
        let mut start = 0;
        let mut prev: Option<char> = None;
        for (idx, c) in chunk.char_indices() {
            if is_numeric(c) && prev.is_some_and(|p| !is_numeric(p)) {
                terms.push(&chunk[start..idx]);
                start = idx;
            }
            prev = Some(c);
        }
        terms.push(&chunk[start..]);
    }
    terms
}

fn parse_term(term: &str) -> std::result::Result<Duration, String> {
    let unit_start = term
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(term.len());
    let (number, unit) = term.split_at(unit_start);
    if number.is_empty() {
        return Err("expected a number".to_string());
    }
    if unit.is_empty() {
        return Err("missing unit".to_string());
    }
    let unit = match unit {
        "µs" | "μs" => "us",
        other => other,
    };

    if !number.contains('.') {
        return humantime::parse_duration(&format!("{}{}", number, unit))
            .map_err(|e| e.to_string());
    }

    // Fractional terms such as "1.5h" are scaled from the unit's length
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number '{}'", number))?;
    let scale = humantime::parse_duration(&format!("1{}", unit)).map_err(|e| e.to_string())?;
    Duration::try_from_secs_f64(scale.as_secs_f64() * value)
        .map_err(|_| "value out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_interval_table() {
        let cases = [
            ("5m", Duration::from_secs(5 * 60)),
            ("", Duration::from_secs(30)),
            ("15s", Duration::from_secs(15)),
            ("  ", DEFAULT_INTERVAL),
            ("1h30m", Duration::from_secs(90 * 60)),
            ("1h 30m", Duration::from_secs(90 * 60)),
            ("1.5h", Duration::from_secs(90 * 60)),
            ("250ms", Duration::from_millis(250)),
            ("1m0.5s", Duration::from_millis(60_500)),
            ("10us", Duration::from_micros(10)),
            ("10µs", Duration::from_micros(10)),
            ("42ns", Duration::from_nanos(42)),
            ("+2s", Duration::from_secs(2)),
            (".5s", Duration::from_millis(500)),
            ("2min", Duration::from_secs(120)),
            ("0", Duration::ZERO),
            ("0s", Duration::ZERO),
        ];

        for (input, want) in cases {
            let got = resolve_interval(input)
                .unwrap_or_else(|e| panic!("'{}' should parse: {}", input, e));
            assert_eq!(got, want, "input '{}'", input);
        }
    }

    #[test]
    fn test_malformed_intervals_fail() {
        for input in [
            "not-a-duration",
            "5",
            "5x",
            "m",
            ".",
            ".s",
            "1.2.3s",
            "-5m",
            "1h-30m",
            "99999999999999999999999h",
            "340282366920938463463374607431.9s",
            "1e300h",
            "18446744073709551615s 18446744073709551615s",
        ] {
            let result = resolve_interval(input);
            assert!(
                matches!(result, Err(ControllerError::InvalidInterval { .. })),
                "'{}' should be rejected, got {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn test_error_names_the_input() {
        let err = resolve_interval("soon").unwrap_err();
        assert!(err.to_string().contains("'soon'"));
    }
}
