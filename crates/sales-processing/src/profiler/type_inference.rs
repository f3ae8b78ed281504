//! Column type classification.

use crate::types::ColumnType;
use crate::utils::{
    is_label_dtype, is_numeric_dtype, is_temporal_dtype, parse_datetime_string,
    parse_numeric_string,
};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Date-like prefixes - compiled once at startup
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}[-/.]\d{1,2}[-/.]\d{4}").expect("Invalid regex: MM/DD/YYYY"),
        Regex::new(r"^\d{8}$").expect("Invalid regex: YYYYMMDD"),
    ]
});

/// Limits under which a label column counts as categorical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoricalLimits {
    /// Maximum number of distinct non-missing values.
    pub max_cardinality: usize,
    /// Maximum distinct / non-missing ratio.
    pub max_ratio: f64,
}

impl Default for CategoricalLimits {
    fn default() -> Self {
        Self {
            max_cardinality: 50,
            max_ratio: 0.5,
        }
    }
}

/// Classify a column from its current contents.
///
/// Checked in order: no values at all is unknown; native or fully parseable
/// numbers are numeric; native or fully parseable dates are datetime; labels
/// with few distinct values are categorical; everything else is unknown.
pub fn classify_column(series: &Series, limits: &CategoricalLimits) -> ColumnType {
    let non_null = series.len() - series.null_count();
    if non_null == 0 {
        return ColumnType::Unknown;
    }

    let dtype = series.dtype();
    if is_numeric_dtype(dtype) {
        return ColumnType::Numeric;
    }
    if is_temporal_dtype(dtype) {
        return ColumnType::Datetime;
    }

    if let Ok(values) = series.str() {
        if all_present(values, |v| parse_numeric_string(v).is_some()) {
            return ColumnType::Numeric;
        }
        if all_present(values, is_date_text) {
            return ColumnType::Datetime;
        }
    }

    if dtype == &DataType::Boolean {
        return ColumnType::Categorical;
    }

    if is_label_dtype(dtype) && is_low_cardinality(series, non_null, limits) {
        return ColumnType::Categorical;
    }

    ColumnType::Unknown
}

fn all_present(values: &StringChunked, check: impl Fn(&str) -> bool) -> bool {
    values.into_iter().flatten().all(check)
}

/// Check if a string looks like and parses as a date.
fn is_date_text(value: &str) -> bool {
    let trimmed = value.trim();
    DATE_PATTERNS.iter().any(|p| p.is_match(trimmed)) && parse_datetime_string(trimmed).is_some()
}

fn is_low_cardinality(series: &Series, non_null: usize, limits: &CategoricalLimits) -> bool {
    let distinct = match series.drop_nulls().n_unique() {
        Ok(n) => n,
        Err(_) => return false,
    };
    distinct <= limits.max_cardinality && (distinct as f64 / non_null as f64) <= limits.max_ratio
}
