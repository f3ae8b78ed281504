//! Pearson correlation with a trend label and significance.

use crate::error::{PipelineError, Result};
use crate::run_log::RunLog;
use crate::types::{CorrelationReport, Trend};
use crate::utils::{is_numeric_dtype, series_to_f64};
use anofox_statistics::correlation::pearson;
use polars::prelude::*;
use std::ops::{Bound, RangeBounds};
use tracing::debug;

/// Trend bands, evaluated top to bottom. Anything unmatched has no trend.
pub const TREND_BANDS: [(Bound<f64>, Bound<f64>, Trend); 8] = [
    (Bound::Included(0.9), Bound::Unbounded, Trend::VeryStrongPositive),
    (Bound::Excluded(0.7), Bound::Excluded(0.9), Trend::StrongPositive),
    (Bound::Excluded(0.3), Bound::Included(0.7), Trend::ModeratePositive),
    (Bound::Excluded(0.0), Bound::Included(0.3), Trend::WeakPositive),
    (Bound::Unbounded, Bound::Included(-0.9), Trend::VeryStrongNegative),
    (Bound::Excluded(-0.9), Bound::Excluded(-0.7), Trend::StrongNegative),
    (Bound::Included(-0.7), Bound::Excluded(-0.3), Trend::ModerateNegative),
    (Bound::Included(-0.3), Bound::Excluded(0.0), Trend::WeakNegative),
];

/// Label a correlation coefficient.
pub fn classify_trend(r: f64) -> Trend {
    if !r.is_finite() {
        return Trend::NoTrend;
    }
    TREND_BANDS
        .iter()
        .find(|(lower, upper, _)| (*lower, *upper).contains(&r))
        .map(|(_, _, trend)| *trend)
        .unwrap_or(Trend::NoTrend)
}

/// Pearson r and two-sided p-value for paired observations.
///
/// Two points always lie on a line, so they get r = ±1 with p = 1. From three
/// points on the test is delegated to `anofox_statistics`; an exact fit has
/// p = 0. Returns `None` when the test cannot be computed.
pub(crate) fn pearson_test(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    match x.len().min(y.len()) {
        0 | 1 => None,
        2 => {
            let slope = (x[1] - x[0]) * (y[1] - y[0]);
            (slope != 0.0).then(|| (slope.signum(), 1.0))
        }
        _ => {
            let result = pearson(x, y, Some(0.95)).ok()?;
            let r = result.estimate.clamp(-1.0, 1.0);
            if !r.is_finite() {
                return None;
            }
            let p_value = if r.abs() >= 1.0 {
                0.0
            } else {
                result.p_value.clamp(0.0, 1.0)
            };
            Some((r, p_value))
        }
    }
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn numeric_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let series = df
        .column(name)
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?
        .as_materialized_series();
    if !is_numeric_dtype(series.dtype()) {
        return Err(PipelineError::NotNumeric(name.to_string()));
    }
    Ok(series)
}

/// Correlate two numeric columns over the rows where both are present.
pub fn correlation_analysis(
    df: &DataFrame,
    column_a: &str,
    column_b: &str,
    log: &mut RunLog,
) -> Option<CorrelationReport> {
    log.info(format!(
        "Running correlation analysis for '{}' and '{}'",
        column_a, column_b
    ));

    let pairs = match paired_values(df, column_a, column_b) {
        Ok(pairs) => pairs,
        Err(PipelineError::ColumnNotFound(name)) => {
            log.error(format!("Column '{}' not found in the dataset.", name));
            return None;
        }
        Err(PipelineError::NotNumeric(name)) => {
            log.error(format!(
                "Correlation requires both columns to be numeric; '{}' is not.",
                name
            ));
            return None;
        }
        Err(e) => {
            log.error(format!("Correlation failed: {}", e));
            return None;
        }
    };

    if pairs.0.len() < 2 {
        log.warn("Not enough non-missing data points for correlation calculation.");
        return None;
    }

    if is_constant(&pairs.0) || is_constant(&pairs.1) {
        log.warn(format!(
            "'{}' or '{}' is constant; correlation is undefined.",
            column_a, column_b
        ));
        return None;
    }

    let Some((r, p_value)) = pearson_test(&pairs.0, &pairs.1) else {
        log.warn(format!(
            "Correlation between '{}' and '{}' could not be computed.",
            column_a, column_b
        ));
        return None;
    };

    let report = CorrelationReport {
        column_a: column_a.to_string(),
        column_b: column_b.to_string(),
        observations: pairs.0.len(),
        r,
        p_value,
        trend: classify_trend(r),
    };
    debug!("Correlation {} vs {}: r = {}", column_a, column_b, r);
    log.plain(report.to_string());
    Some(report)
}

fn paired_values(df: &DataFrame, a: &str, b: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let xs = series_to_f64(numeric_column(df, a)?)?;
    let ys = series_to_f64(numeric_column(df, b)?)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        })
        .unzip())
}
