//! Missing value report, descriptive statistics and dataset overview.

use crate::profiler::{CategoricalLimits, classify_column};
use crate::run_log::RunLog;
use crate::types::{
    ColumnOverview, DatasetOverview, DistinctCount, MissingColumn, MissingReport, NumericSummary,
    SummaryReport,
};
use crate::utils::{is_numeric_dtype, quantile_sorted, series_to_f64, sorted_non_null};
use polars::prelude::*;
use tracing::debug;

/// Missing cells per column, most affected first.
///
/// Only columns with at least one missing cell are listed; ties keep column order.
pub fn missing_report(df: &DataFrame) -> MissingReport {
    let total_rows = df.height();
    let mut columns: Vec<MissingColumn> = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| {
            let missing = c.null_count();
            MissingColumn {
                column: c.name().to_string(),
                missing,
                percentage: if total_rows > 0 {
                    missing as f64 / total_rows as f64 * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();
    columns.sort_by(|a, b| b.missing.cmp(&a.missing));

    MissingReport {
        total_rows,
        columns,
    }
}

/// Descriptive statistics of one numeric column.
pub(crate) fn describe_numeric(series: &Series) -> PolarsResult<NumericSummary> {
    let values = series_to_f64(series)?;
    let sorted = sorted_non_null(&values);
    let count = sorted.len();

    let mean = (count > 0).then(|| sorted.iter().sum::<f64>() / count as f64);
    let variance = match (mean, count) {
        (Some(mean), n) if n >= 2 => {
            Some(sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0))
        }
        _ => None,
    };

    Ok(NumericSummary {
        column: series.name().to_string(),
        count,
        mean,
        median: (count > 0).then(|| quantile_sorted(&sorted, 0.5)),
        variance,
        std_dev: variance.map(f64::sqrt),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
    })
}

/// Statistics for every numeric column plus distinct counts for every column.
pub fn summary_statistics(df: &DataFrame, log: &mut RunLog) -> SummaryReport {
    log.info("Calculating summary statistics");

    let mut report = SummaryReport::default();

    for column in df.get_columns() {
        let series = column.as_materialized_series();

        if is_numeric_dtype(series.dtype()) {
            match describe_numeric(series) {
                Ok(summary) => report.numeric.push(summary),
                Err(e) => log.error(format!("Failed to summarise '{}': {}", series.name(), e)),
            }
        }

        match series.n_unique() {
            Ok(distinct) => report.distinct_counts.push(DistinctCount {
                column: series.name().to_string(),
                distinct,
            }),
            Err(e) => log.error(format!(
                "Failed to count distinct values in '{}': {}",
                series.name(),
                e
            )),
        }
    }

    if report.numeric.is_empty() {
        log.warn("No numeric columns found for full statistical summaries.");
    }

    debug!(
        "Summarised {} numeric columns out of {}",
        report.numeric.len(),
        df.width()
    );
    log.plain(report.to_string());
    report
}

/// Shape, per-column types and missing value overview.
pub fn dataset_overview(
    df: &DataFrame,
    limits: &CategoricalLimits,
    log: &mut RunLog,
) -> DatasetOverview {
    log.info("Generating dataset overview");

    let column_types = df
        .get_columns()
        .iter()
        .map(|c| {
            let series = c.as_materialized_series();
            ColumnOverview {
                name: series.name().to_string(),
                dtype: series.dtype().to_string(),
                inferred_type: classify_column(series, limits),
            }
        })
        .collect();

    let overview = DatasetOverview {
        rows: df.height(),
        columns: df.width(),
        column_types,
        missing: missing_report(df),
    };
    log.plain(overview.to_string());
    overview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_log::Severity;
    use crate::types::ColumnType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_report_sorted_descending() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "b" => [Some("x"), Some("y"), Some("z"), Some("w")],
            "c" => [None::<f64>, None, Some(1.0), Some(2.0)],
            "d" => [None::<i64>, Some(1), Some(2), Some(3)],
        ]
        .unwrap();

        let report = missing_report(&df);

        let names: Vec<&str> = report.columns.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "d"]);
        assert_eq!(report.columns[0].percentage, 50.0);
        assert_eq!(report.total_missing(), 4);
    }

    #[test]
    fn test_missing_report_clean() {
        let df = df!["a" => [1, 2]].unwrap();
        let report = missing_report(&df);
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "  No missing values detected.");
    }

    #[test]
    fn test_describe_numeric() {
        let series = Series::new("v".into(), &[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)]);
        let summary = describe_numeric(&series).unwrap();

        assert_eq!(summary.count, 5);
        assert_eq!(summary.mean, Some(3.0));
        assert_eq!(summary.median, Some(3.0));
        assert_eq!(summary.variance, Some(2.5));
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(5.0));
        assert!((summary.std_dev.unwrap() - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_describe_single_value_has_no_spread() {
        let series = Series::new("v".into(), &[7.0]);
        let summary = describe_numeric(&series).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.variance, None);
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.min, summary.max);
    }

    #[test]
    fn test_summary_invariants() {
        let df = df![
            "Quantity" => [Some(1.0), Some(5.0), Some(3.0), None, Some(2.0)],
            "Item" => [Some("Tea"), Some("Cake"), None, Some("Tea"), None],
        ]
        .unwrap();
        let mut log = RunLog::silent();

        let report = summary_statistics(&df, &mut log);

        assert_eq!(report.numeric.len(), 1);
        let q = &report.numeric[0];
        assert!(q.min.unwrap() <= q.median.unwrap() && q.median.unwrap() <= q.max.unwrap());
        assert!(q.min.unwrap() <= q.mean.unwrap() && q.mean.unwrap() <= q.max.unwrap());
        assert!(q.count <= df.height());
        assert!(q.variance.unwrap() >= 0.0);

        let item = report.distinct_counts.iter().find(|d| d.column == "Item").unwrap();
        assert_eq!(item.distinct, 3);
        assert_eq!(log.count(Severity::Warn), 0);
    }

    #[test]
    fn test_summary_warns_without_numeric_columns() {
        let df = df!["Item" => ["Tea", "Cake"]].unwrap();
        let mut log = RunLog::silent();

        let report = summary_statistics(&df, &mut log);

        assert!(report.numeric.is_empty());
        assert_eq!(report.distinct_counts.len(), 1);
        assert_eq!(log.count(Severity::Warn), 1);
    }

    #[test]
    fn test_dataset_overview() {
        let df = df![
            "Total Spent" => [Some(4.0), None, Some(2.0), Some(1.0)],
            "Payment Method" => ["Cash", "Cash", "Card", "Card"],
        ]
        .unwrap();
        let mut log = RunLog::silent();

        let overview = dataset_overview(&df, &CategoricalLimits::default(), &mut log);

        assert_eq!(overview.rows, 4);
        assert_eq!(overview.columns, 2);
        assert_eq!(overview.column_types[0].inferred_type, ColumnType::Numeric);
        assert_eq!(overview.column_types[1].inferred_type, ColumnType::Categorical);
        assert_eq!(overview.missing.total_missing(), 1);
    }
}
