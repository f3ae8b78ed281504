//! Table transformations applied before analysis.
//!
//! Every operation takes ownership of the table and returns the new one. A
//! failing operation is reported in the run log and hands back the input
//! unchanged.

use crate::cleaner::TypeCoercer;
use crate::config::TargetType;
use crate::error::{PipelineError, Result};
use crate::run_log::RunLog;
use crate::utils::{is_numeric_dtype, series_to_f64};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Aggregation applied to each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggMethod {
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl AggMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggMethod::Sum => "sum",
            AggMethod::Mean => "mean",
            AggMethod::Count => "count",
            AggMethod::Min => "min",
            AggMethod::Max => "max",
        }
    }

    fn expr(&self, column: &str) -> Expr {
        let c = col(column);
        match self {
            AggMethod::Sum => c.sum(),
            AggMethod::Mean => c.mean(),
            AggMethod::Count => c.count(),
            AggMethod::Min => c.min(),
            AggMethod::Max => c.max(),
        }
    }
}

impl fmt::Display for AggMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggMethod::Sum),
            "mean" | "avg" => Ok(AggMethod::Mean),
            "count" => Ok(AggMethod::Count),
            "min" => Ok(AggMethod::Min),
            "max" => Ok(AggMethod::Max),
            other => Err(PipelineError::InvalidConfig(format!(
                "Unsupported aggregation method: '{}'",
                other
            ))),
        }
    }
}

/// Keep the rows where `mask` is true. Null mask entries drop the row.
pub fn filter_rows(df: DataFrame, mask: &BooleanChunked, log: &mut RunLog) -> DataFrame {
    if mask.len() != df.height() {
        log.error(format!(
            "Filter mask has {} entries but the table has {} rows",
            mask.len(),
            df.height()
        ));
        return df;
    }

    match df.filter(mask) {
        Ok(filtered) => {
            log.info(format!(
                "Filtered rows: kept {} of {}",
                filtered.height(),
                df.height()
            ));
            filtered
        }
        Err(e) => {
            log.error(format!("Failed to filter rows: {}", e));
            df
        }
    }
}

/// Add a Float64 column computed row by row from numeric input columns.
///
/// `derive` receives the inputs of one row in the order given; a missing input
/// arrives as `None`. An existing column of the same name is replaced.
pub fn add_derived_column<F>(
    df: DataFrame,
    name: &str,
    inputs: &[&str],
    derive: F,
    log: &mut RunLog,
) -> DataFrame
where
    F: Fn(&[Option<f64>]) -> Option<f64>,
{
    let mut df = df;
    match derive_values(&df, name, inputs, derive).and_then(|s| {
        df.with_column(s)?;
        Ok(())
    }) {
        Ok(()) => log.success(format!("Added column '{}' from {}", name, inputs.join(", "))),
        Err(e) => log.error(format!("Failed to add column '{}': {}", name, e)),
    }
    df
}

fn derive_values<F>(df: &DataFrame, name: &str, inputs: &[&str], derive: F) -> Result<Series>
where
    F: Fn(&[Option<f64>]) -> Option<f64>,
{
    let columns = inputs
        .iter()
        .map(|input| {
            let series = df
                .column(input)
                .map_err(|_| PipelineError::ColumnNotFound(input.to_string()))?
                .as_materialized_series();
            if !is_numeric_dtype(series.dtype()) {
                return Err(PipelineError::NotNumeric(input.to_string()));
            }
            Ok(series_to_f64(series)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut row = Vec::with_capacity(columns.len());
    let values: Vec<Option<f64>> = (0..df.height())
        .map(|idx| {
            row.clear();
            row.extend(columns.iter().map(|c| c[idx]));
            derive(&row)
        })
        .collect();

    Ok(Series::new(name.into(), values))
}

/// Sort by one column. Nulls go last and ties keep their original order.
pub fn sort_by(df: DataFrame, column: &str, ascending: bool, log: &mut RunLog) -> DataFrame {
    if df.column(column).is_err() {
        log.warn(format!("Column '{}' not found; table left unsorted", column));
        return df;
    }

    let sorted = df
        .clone()
        .lazy()
        .sort_by_exprs(
            [col(column)],
            SortMultipleOptions::default()
                .with_order_descending(!ascending)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect();

    match sorted {
        Ok(sorted) => {
            let order = if ascending { "ascending" } else { "descending" };
            log.info(format!("Sorted by '{}' ({})", column, order));
            sorted
        }
        Err(e) => {
            log.error(format!("Failed to sort by '{}': {}", column, e));
            df
        }
    }
}

/// Group by one column and aggregate another.
///
/// Groups appear in order of first appearance. The result has two columns:
/// the group key and the aggregated column under its original name.
pub fn aggregate(
    df: &DataFrame,
    group_by: &str,
    agg_column: &str,
    method: AggMethod,
    log: &mut RunLog,
) -> Option<DataFrame> {
    match try_aggregate(df, group_by, agg_column, method) {
        Ok(grouped) => {
            log.success(format!(
                "Aggregated '{}' by '{}' using {} ({} groups)",
                agg_column,
                group_by,
                method,
                grouped.height()
            ));
            Some(grouped)
        }
        Err(e) => {
            log.error(format!(
                "Failed to aggregate '{}' by '{}': {}",
                agg_column, group_by, e
            ));
            None
        }
    }
}

fn try_aggregate(
    df: &DataFrame,
    group_by: &str,
    agg_column: &str,
    method: AggMethod,
) -> Result<DataFrame> {
    df.column(group_by)
        .map_err(|_| PipelineError::ColumnNotFound(group_by.to_string()))?;
    let target = df
        .column(agg_column)
        .map_err(|_| PipelineError::ColumnNotFound(agg_column.to_string()))?;
    if method != AggMethod::Count && !is_numeric_dtype(target.dtype()) {
        return Err(PipelineError::NotNumeric(agg_column.to_string()));
    }

    debug!("Aggregating '{}' by '{}' with {}", agg_column, group_by, method);

    Ok(df
        .clone()
        .lazy()
        .group_by_stable([col(group_by)])
        .agg([method.expr(agg_column)])
        .collect()?)
}

/// Parse a column into millisecond datetimes; unparseable cells become missing.
pub fn standardize_date_column(df: DataFrame, column: &str, log: &mut RunLog) -> DataFrame {
    TypeCoercer.coerce_column(df, column, TargetType::Datetime, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_log::Severity;
    use crate::utils::datetime_ms;
    use pretty_assertions::assert_eq;

    fn sales() -> DataFrame {
        df![
            "Location" => ["In-store", "Takeaway", "In-store", "Takeaway", "In-store"],
            "Quantity" => [Some(2.0), Some(1.0), None, Some(4.0), Some(3.0)],
            "Price Per Unit" => [1.5, 3.0, 2.0, 1.0, 4.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_filter_rows() {
        let mask = BooleanChunked::from_slice("mask".into(), &[true, false, true, false, true]);
        let mut log = RunLog::silent();

        let out = filter_rows(sales(), &mask, &mut log);

        assert_eq!(out.height(), 3);
        assert!(log.lines()[0].contains("kept 3 of 5"));
    }

    #[test]
    fn test_filter_rows_length_mismatch() {
        let mask = BooleanChunked::from_slice("mask".into(), &[true]);
        let mut log = RunLog::silent();

        let out = filter_rows(sales(), &mask, &mut log);

        assert_eq!(out.height(), 5);
        assert_eq!(log.count(Severity::Error), 1);
    }

    #[test]
    fn test_add_derived_column() {
        let mut log = RunLog::silent();

        let out = add_derived_column(
            sales(),
            "Total Spent",
            &["Quantity", "Price Per Unit"],
            |row| Some(row[0]? * row[1]?),
            &mut log,
        );

        let total: Vec<Option<f64>> = out
            .column("Total Spent")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(total, vec![Some(3.0), Some(3.0), None, Some(4.0), Some(12.0)]);
        assert_eq!(log.count(Severity::Success), 1);
    }

    #[test]
    fn test_add_derived_column_rejects_text_input() {
        let mut log = RunLog::silent();
        let out = add_derived_column(sales(), "x", &["Location"], |row| row[0], &mut log);
        assert!(out.column("x").is_err());
        assert_eq!(log.count(Severity::Error), 1);
    }

    #[test]
    fn test_sort_by_descending_nulls_last() {
        let mut log = RunLog::silent();

        let out = sort_by(sales(), "Quantity", false, &mut log);

        let quantity: Vec<Option<f64>> = out
            .column("Quantity")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(quantity, vec![Some(4.0), Some(3.0), Some(2.0), Some(1.0), None]);
    }

    #[test]
    fn test_sort_by_missing_column() {
        let mut log = RunLog::silent();
        let out = sort_by(sales(), "Nope", true, &mut log);
        assert_eq!(out.height(), 5);
        assert_eq!(log.count(Severity::Warn), 1);
    }

    #[test]
    fn test_aggregate_sum_keeps_group_order() {
        let mut log = RunLog::silent();

        let out = aggregate(&sales(), "Location", "Price Per Unit", AggMethod::Sum, &mut log).unwrap();

        let groups: Vec<Option<&str>> = out.column("Location").unwrap().str().unwrap().into_iter().collect();
        let sums: Vec<Option<f64>> = out
            .column("Price Per Unit")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(groups, vec![Some("In-store"), Some("Takeaway")]);
        assert_eq!(sums, vec![Some(7.5), Some(4.0)]);
    }

    #[test]
    fn test_aggregate_rejects_text_sum() {
        let mut log = RunLog::silent();
        let out = aggregate(&sales(), "Quantity", "Location", AggMethod::Sum, &mut log);
        assert!(out.is_none());
        assert_eq!(log.count(Severity::Error), 1);
    }

    #[test]
    fn test_agg_method_from_str() {
        assert_eq!("AVG".parse::<AggMethod>().unwrap(), AggMethod::Mean);
        assert!("median".parse::<AggMethod>().is_err());
    }

    #[test]
    fn test_standardize_date_column() {
        let df = df![
            "Transaction Date" => ["2023-09-08", "09/10/2023", "ERROR"],
        ]
        .unwrap();
        let mut log = RunLog::silent();

        let out = standardize_date_column(df, "Transaction Date", &mut log);

        let col = out.column("Transaction Date").unwrap();
        assert_eq!(col.dtype(), &datetime_ms());
        assert_eq!(col.null_count(), 1);
    }
}
