//! IQR outlier detection.

use crate::run_log::RunLog;
use crate::types::OutlierReport;
use crate::utils::{is_numeric_dtype, quantile_sorted, series_to_f64, sorted_non_null};
use polars::prelude::*;
use tracing::debug;

/// Fence multiplier applied to the IQR.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Number of outlying values kept as samples.
pub const MAX_SAMPLES: usize = 5;

/// Flag values strictly outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
pub fn detect_outliers(df: &DataFrame, column: &str, log: &mut RunLog) -> Option<OutlierReport> {
    log.info(format!("Detecting outliers in column '{}' using IQR", column));

    let Ok(col) = df.column(column) else {
        log.error(format!("Column '{}' not found in the dataset.", column));
        return None;
    };
    let series = col.as_materialized_series();
    if !is_numeric_dtype(series.dtype()) {
        log.error(format!(
            "Outlier detection requires column '{}' to be numeric.",
            column
        ));
        return None;
    }

    let values = match series_to_f64(series) {
        Ok(values) => values,
        Err(e) => {
            log.error(format!("Failed to read '{}': {}", column, e));
            return None;
        }
    };
    let sorted = sorted_non_null(&values);
    if sorted.is_empty() {
        log.warn("Column is empty after dropping missing values. Cannot detect outliers.");
        return None;
    }

    let report = iqr_report(column, &values, &sorted);
    debug!(
        "'{}': {} outliers outside [{}, {}]",
        column, report.outlier_count, report.lower_bound, report.upper_bound
    );
    log.plain(report.to_string());
    Some(report)
}

fn iqr_report(column: &str, values: &[Option<f64>], sorted: &[f64]) -> OutlierReport {
    let q1 = quantile_sorted(sorted, 0.25);
    let q3 = quantile_sorted(sorted, 0.75);
    let iqr = q3 - q1;
    let lower_bound = q1 - IQR_MULTIPLIER * iqr;
    let upper_bound = q3 + IQR_MULTIPLIER * iqr;

    let outliers: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| *v < lower_bound || *v > upper_bound)
        .collect();

    OutlierReport {
        column: column.to_string(),
        q1,
        q3,
        iqr,
        lower_bound,
        upper_bound,
        outlier_count: outliers.len(),
        non_missing: sorted.len(),
        percentage: outliers.len() as f64 / sorted.len() as f64 * 100.0,
        samples: outliers.into_iter().take(MAX_SAMPLES).collect(),
    }
}
