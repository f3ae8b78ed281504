//! Shared report and classification types.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Column classification
// ============================================================================

/// Inferred kind of a column, recomputed from its contents whenever needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Datetime,
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Datetime => "datetime",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Missing values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingColumn {
    pub column: String,
    pub missing: usize,
    /// Share of rows missing, in percent.
    pub percentage: f64,
}

/// Columns with at least one missing cell, most missing first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MissingReport {
    pub total_rows: usize,
    pub columns: Vec<MissingColumn>,
}

impl MissingReport {
    pub fn is_clean(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }
}

impl fmt::Display for MissingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "  No missing values detected.");
        }
        let lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("  - {}: {} ({:.2}%)", c.column, c.missing, c.percentage))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

// ============================================================================
// Summary statistics
// ============================================================================

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample variance (N-1 denominator). None below two values.
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinctCount {
    pub column: String,
    /// Distinct values, counting the missing marker as one value.
    pub distinct: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SummaryReport {
    pub numeric: Vec<NumericSummary>,
    pub distinct_counts: Vec<DistinctCount>,
}

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "NaN".to_string())
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.numeric.is_empty() {
            let width = self
                .numeric
                .iter()
                .map(|s| s.column.len())
                .max()
                .unwrap_or(0)
                .max(6);
            writeln!(
                f,
                "{:<width$} {:>8} {:>12} {:>12} {:>14} {:>12} {:>12} {:>12}",
                "column", "count", "mean", "median", "variance", "std_dev", "min", "max",
            )?;
            for s in &self.numeric {
                writeln!(
                    f,
                    "{:<width$} {:>8} {:>12} {:>12} {:>14} {:>12} {:>12} {:>12}",
                    s.column,
                    s.count,
                    fmt_opt(s.mean),
                    fmt_opt(s.median),
                    fmt_opt(s.variance),
                    fmt_opt(s.std_dev),
                    fmt_opt(s.min),
                    fmt_opt(s.max),
                )?;
            }
        }
        writeln!(f, "Unique values per column:")?;
        for d in &self.distinct_counts {
            writeln!(f, "  {:<24} {}", d.column, d.distinct)?;
        }
        Ok(())
    }
}

// ============================================================================
// Correlation
// ============================================================================

/// Direction and strength of a linear relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    VeryStrongPositive,
    StrongPositive,
    ModeratePositive,
    WeakPositive,
    VeryStrongNegative,
    StrongNegative,
    ModerateNegative,
    WeakNegative,
    NoTrend,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryStrongPositive => "very-strong-positive",
            Self::StrongPositive => "strong-positive",
            Self::ModeratePositive => "moderate-positive",
            Self::WeakPositive => "weak-positive",
            Self::VeryStrongNegative => "very-strong-negative",
            Self::StrongNegative => "strong-negative",
            Self::ModerateNegative => "moderate-negative",
            Self::WeakNegative => "weak-negative",
            Self::NoTrend => "no-trend",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub column_a: String,
    pub column_b: String,
    /// Paired observations left after dropping missing rows.
    pub observations: usize,
    pub r: f64,
    /// Two-sided p-value of the null hypothesis r = 0.
    pub p_value: f64,
    pub trend: Trend,
}

impl fmt::Display for CorrelationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Correlation Results ({} vs {}) ---", self.column_a, self.column_b)?;
        writeln!(f, "  Observations: {}", self.observations)?;
        writeln!(f, "  Pearson Coefficient (r): {:.4}", self.r)?;
        writeln!(f, "  p-value: {:.4e}", self.p_value)?;
        write!(f, "  Interpretation: {}", self.trend)
    }
}

// ============================================================================
// Outliers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub outlier_count: usize,
    pub non_missing: usize,
    /// Outliers as a share of non-missing values, in percent.
    pub percentage: f64,
    /// First few outlying values in row order.
    pub samples: Vec<f64>,
}

impl fmt::Display for OutlierReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- IQR Outlier Detection Results ({}) ---", self.column)?;
        writeln!(f, "  Q1 (25th percentile): {:.2}", self.q1)?;
        writeln!(f, "  Q3 (75th percentile): {:.2}", self.q3)?;
        writeln!(f, "  IQR (Q3 - Q1): {:.2}", self.iqr)?;
        writeln!(f, "  Lower Bound: {:.2}", self.lower_bound)?;
        writeln!(f, "  Upper Bound: {:.2}", self.upper_bound)?;
        write!(
            f,
            "  Number of Outliers Detected: {} ({:.2}%)",
            self.outlier_count, self.percentage
        )?;
        if !self.samples.is_empty() {
            let samples: Vec<String> = self.samples.iter().map(|v| format!("{}", v)).collect();
            write!(f, "\n  Sample Outliers: {}", samples.join(", "))?;
        }
        Ok(())
    }
}

// ============================================================================
// Overview
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    /// Physical polars dtype, e.g. `f64` or `str`.
    pub dtype: String,
    pub inferred_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub columns: usize,
    pub column_types: Vec<ColumnOverview>,
    pub missing: MissingReport,
}

impl fmt::Display for DatasetOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  > Number of Rows (Records): {}", self.rows)?;
        writeln!(f, "  > Number of Columns (Features): {}", self.columns)?;
        writeln!(f, "--- Data Types per Column ---")?;
        for c in &self.column_types {
            writeln!(f, "  {:<24} {:<16} {}", c.name, c.dtype, c.inferred_type)?;
        }
        writeln!(f, "--- Missing Value Overview ---")?;
        write!(f, "{}", self.missing)
    }
}

/// Everything the statistics stage computed in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub source: String,
    pub overview: Option<DatasetOverview>,
    pub summary: Option<SummaryReport>,
    pub correlations: Vec<CorrelationReport>,
    pub outliers: Vec<OutlierReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_report_display_empty() {
        let report = MissingReport::default();
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "  No missing values detected.");
    }

    #[test]
    fn test_missing_report_display_rows() {
        let report = MissingReport {
            total_rows: 4,
            columns: vec![
                MissingColumn {
                    column: "Item".to_string(),
                    missing: 2,
                    percentage: 50.0,
                },
                MissingColumn {
                    column: "Location".to_string(),
                    missing: 1,
                    percentage: 25.0,
                },
            ],
        };
        assert_eq!(
            report.to_string(),
            "  - Item: 2 (50.00%)\n  - Location: 1 (25.00%)"
        );
        assert_eq!(report.total_missing(), 3);
    }

    #[test]
    fn test_trend_serializes_as_label() {
        let json = serde_json::to_string(&Trend::VeryStrongPositive).unwrap();
        assert_eq!(json, "\"very-strong-positive\"");
        assert_eq!(Trend::NoTrend.to_string(), "no-trend");
    }

    #[test]
    fn test_outlier_report_lists_samples() {
        let report = OutlierReport {
            column: "v".to_string(),
            q1: 3.25,
            q3: 7.75,
            iqr: 4.5,
            lower_bound: -3.5,
            upper_bound: 14.5,
            outlier_count: 1,
            non_missing: 10,
            percentage: 10.0,
            samples: vec![100.0],
        };
        let text = report.to_string();
        assert!(text.contains("Lower Bound: -3.50"));
        assert!(text.contains("Number of Outliers Detected: 1 (10.00%)"));
        assert!(text.contains("Sample Outliers: 100"));
    }
}
