// Normalization helpers shared by the source adapters and evaluators
use crate::types::Observation;

/// Markers upstream services use in place of a number
const MISSING_VALUE_MARKERS: [&str; 4] = [".", "N/E", "NaN", "-"];

/// Parse an upstream numeric string ("19,875.50", "4.33")
///
/// Returns `None` for missing-value markers and anything non-finite.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || MISSING_VALUE_MARKERS.contains(&trimmed) {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Copy of `series` sorted oldest first, without non-finite values
pub fn chronological(series: &[Observation]) -> Vec<Observation> {
    let mut sorted: Vec<Observation> = series
        .iter()
        .copied()
        .filter(|o| o.value.is_finite())
        .collect();
    sorted.sort_by_key(|o| o.timestamp);
    sorted
}

/// Value `window - 1` steps before the latest one, if the series is long enough
///
/// With `window = 5` on daily data this is the same weekday one week back.
pub fn lookback_value(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    values.get(values.len() - window).copied()
}

/// Percentage change from `previous` to `current`
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Round to a fixed number of decimal places for reporting
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Strip the anti-JSON-hijacking prefix some endpoints prepend
pub fn strip_xssi_prefix(body: &str) -> &str {
    let trimmed = body.trim_start();
    match trimmed.strip_prefix(")]}'") {
        Some(rest) => rest.trim_start_matches(',').trim_start(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_number_handles_thousands_separator() {
        assert_eq!(parse_number("19,875.50"), Some(19875.5));
        assert_eq!(parse_number(" 4.33 "), Some(4.33));
    }

    #[test]
    fn test_parse_number_rejects_markers() {
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("N/E"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_chronological_sorts_and_drops_nan() {
        let newer = Observation::new(Utc.with_ymd_and_hms(2024, 10, 2, 0, 0, 0).unwrap(), 2.0);
        let older = Observation::new(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap(), 1.0);
        let bad = Observation::new(Utc.with_ymd_and_hms(2024, 10, 3, 0, 0, 0).unwrap(), f64::NAN);

        let sorted = chronological(&[newer, bad, older]);
        assert_eq!(sorted, vec![older, newer]);
    }

    #[test]
    fn test_lookback_value() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(lookback_value(&values, 5), Some(2.0));
        assert_eq!(lookback_value(&values, 6), Some(1.0));
        assert_eq!(lookback_value(&values, 7), None);
        assert_eq!(lookback_value(&values, 0), None);
    }

    #[test]
    fn test_pct_change_guards_zero_base() {
        assert_eq!(pct_change(105.0, 100.0), Some(5.0));
        assert_eq!(pct_change(1.0, 0.0), None);
    }

    #[test]
    fn test_strip_xssi_prefix() {
        assert_eq!(strip_xssi_prefix(")]}',\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_xssi_prefix("{\"a\":1}"), "{\"a\":1}");
    }
}
