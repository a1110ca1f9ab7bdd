//! Formatting helpers for CLI summaries.

use std::time::Duration;

/// Format a count with thousands separators.
///
/// # Examples
///
/// ```
/// use sf_cli_common::format_number;
///
/// assert_eq!(format_number(0), "0");
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// ```
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}

/// Format a throughput such as `"1,250 events/sec"`.
///
/// Returns `"n/a"` when no time has elapsed.
pub fn format_rate(count: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        return "n/a".to_string();
    }
    let rate = (count as f64 / secs).round() as u64;
    format!("{} events/sec", format_number(rate))
}
