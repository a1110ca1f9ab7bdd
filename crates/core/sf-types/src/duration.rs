//! Human-readable durations for configuration values.
//!
//! Accepts `"500ms"`, `"2s"`, `"1.5s"`, `"1m"`, `"1h"`, `"250us"`, `"100ns"`
//! or a bare `"0"`. Numeric configuration values are milliseconds.

use std::time::Duration;

/// Parses a duration string such as `"500ms"` or `"2s"`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| format!("missing unit in duration '{input}'"))?;
    let (number, unit) = input.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number in duration '{input}'"))?;

    let nanos_per_unit: f64 = match unit.trim() {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        other => return Err(format!("unknown unit '{other}' in duration '{input}'")),
    };

    let nanos = (value * nanos_per_unit).round();
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(format!("duration '{input}' is out of range"));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Formats a duration the way [`parse_duration`] reads it back.
pub fn format_duration(duration: &Duration) -> String {
    if duration.is_zero() {
        "0".to_string()
    } else if duration.subsec_nanos() % 1_000_000 != 0 {
        format!("{}ns", duration.as_nanos())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Serde helper for Duration serialization.
pub mod humantime_serde {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}
