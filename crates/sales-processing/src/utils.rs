//! Shared utilities for the sales pipeline.
//!
//! This module contains helper functions used across the cleaning, analysis
//! and output stages.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds calendar dates or timestamps.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Check if a DataType holds labels (text, booleans or categories).
#[inline]
pub fn is_label_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Boolean | DataType::Categorical(_, _)
    )
}

/// The dtype every coerced or filled date column ends up with.
pub fn datetime_ms() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 5] = [',', '$', '€', '£', ' '];

/// Placeholder values that dirty exports write instead of leaving a cell empty.
pub const ERROR_MARKERS: [&str; 8] = [
    "error", "unknown", "n/a", "na", "null", "missing", "none", "#n/a",
];

/// Date and datetime layouts accepted in text columns.
pub const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

pub const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// ```rust,ignore
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a number.
///
/// Handles currency symbols and thousands separators. `NaN` and infinities
/// are rejected so that they never pass for real measurements.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Try to parse a string as a date or timestamp.
pub fn parse_datetime_string(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a date string straight to epoch milliseconds.
pub fn parse_datetime_millis(s: &str) -> Option<i64> {
    parse_datetime_string(s).map(|dt| dt.and_utc().timestamp_millis())
}

/// Render epoch milliseconds the way the cleaned outputs store dates.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

// =============================================================================
// Series Value Extraction
// =============================================================================

/// Numeric values of a Series as `f64`, nulls preserved.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Epoch milliseconds of a Date or Datetime Series, nulls preserved.
pub fn series_to_millis(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    let cast = series.cast(&datetime_ms())?.cast(&DataType::Int64)?;
    Ok(cast.i64()?.into_iter().collect())
}

/// Values of a Series rendered as text, nulls preserved.
///
/// Temporal columns render as `YYYY-MM-DD HH:MM:SS`.
pub fn series_to_strings(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    if is_temporal_dtype(series.dtype()) {
        return Ok(series_to_millis(series)?
            .into_iter()
            .map(|v| v.map(format_timestamp))
            .collect());
    }
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Non-null values sorted ascending.
pub fn sorted_non_null(values: &[Option<f64>]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().flatten().copied().collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

// =============================================================================
// Statistics Helpers
// =============================================================================

/// Quantile of sorted values with linear interpolation between closest ranks.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

/// Most frequent value. Ties go to the value seen first.
pub fn first_mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for value in values.into_iter().flatten() {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series, producing a Float64 Series.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = series_to_f64(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a text Series.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let str_series = series.str()?;
    let values: Vec<Option<&str>> = str_series
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_temporal_dtype() {
        assert!(is_temporal_dtype(&DataType::Date));
        assert!(is_temporal_dtype(&datetime_ms()));
        assert!(!is_temporal_dtype(&DataType::String));
    }

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("€100"), "100");
        assert_eq!(clean_numeric_string(" 1 000 "), "1000");
    }

    #[test]
    fn test_is_error_marker() {
        assert!(is_error_marker("ERROR"));
        assert!(is_error_marker("UNKNOWN"));
        assert!(is_error_marker("  n/a "));
        assert!(!is_error_marker("42"));
        assert!(!is_error_marker("Cash"));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("-3.5"), Some(-3.5));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("ERROR"), None);
        assert_eq!(parse_numeric_string("NaN"), None);
    }

    #[test]
    fn test_parse_datetime_string() {
        let expected = NaiveDate::from_ymd_opt(2023, 9, 8)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime_string("2023-09-08"), Some(expected));
        assert_eq!(parse_datetime_string("09/08/2023"), Some(expected));
        assert_eq!(parse_datetime_string("2023-09-08 00:00:00"), Some(expected));
        assert_eq!(parse_datetime_string("2023-09-08T00:00:00.000"), Some(expected));
        assert_eq!(parse_datetime_string("ERROR"), None);
        assert_eq!(parse_datetime_string("2023-13-45"), None);
    }

    #[test]
    fn test_format_timestamp_round_trip() {
        let ms = parse_datetime_millis("2023-01-31").unwrap();
        assert_eq!(format_timestamp(ms), "2023-01-31 00:00:00");
    }

    #[test]
    fn test_quantile_sorted_linear() {
        let values: Vec<f64> = (1..=9).map(f64::from).chain([100.0]).collect();
        assert!((quantile_sorted(&values, 0.25) - 3.25).abs() < 1e-12);
        assert!((quantile_sorted(&values, 0.75) - 7.75).abs() < 1e-12);
        assert_eq!(quantile_sorted(&values, 0.0), 1.0);
        assert_eq!(quantile_sorted(&values, 1.0), 100.0);
        assert_eq!(quantile_sorted(&[], 0.5), 0.0);
    }

    #[test]
    fn test_first_mode_tie_goes_to_first_seen() {
        let values = [Some("b"), Some("a"), None, Some("a"), Some("b")];
        assert_eq!(first_mode(values), Some("b".to_string()));

        let values = [Some("x"), Some("y"), Some("y")];
        assert_eq!(first_mode(values), Some("y".to_string()));

        let values: [Option<&str>; 2] = [None, None];
        assert_eq!(first_mode(values), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1i64), None, Some(3)]);
        let filled = fill_numeric_nulls(&series, 2.0).unwrap();

        assert_eq!(filled.dtype(), &DataType::Float64);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 2.0);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("test".into(), &[Some("a"), None, Some("b")]);
        let filled = fill_string_nulls(&series, "a").unwrap();
        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("a"), Some("a"), Some("b")]);
    }

    #[test]
    fn test_series_to_strings_formats_dates() {
        let series = Series::new("d".into(), &[Some(0i64), None])
            .cast(&datetime_ms())
            .unwrap();
        let values = series_to_strings(&series).unwrap();
        assert_eq!(values, vec![Some("1970-01-01 00:00:00".to_string()), None]);
    }
}
