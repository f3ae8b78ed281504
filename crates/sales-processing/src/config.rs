//! Configuration types for the sales pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! The defaults reproduce the cafe sales run: the dataset under
//! `data/raw/`, cleaned output under `data/processed/`, charts under `plots/`.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of source the loader reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Delimited text with a header row
    Csv,
    /// Record array or column-oriented JSON document
    Json,
    /// SQLite database file queried with SQL
    Sql,
}

impl SourceKind {
    /// Guess the source kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "db" | "sqlite" | "sqlite3" => Some(Self::Sql),
            _ => None,
        }
    }
}

impl FromStr for SourceKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "sql" | "sqlite" => Ok(Self::Sql),
            other => Err(PipelineError::UnsupportedSource(other.to_string())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
            Self::Sql => write!(f, "sql"),
        }
    }
}

/// Strategy for filling missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericFill {
    /// Use the mean of non-null values
    #[default]
    Mean,
    /// Use the median of non-null values
    Median,
}

/// Strategy for filling missing date values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatetimeFill {
    /// Use the earliest date in the column
    #[default]
    Earliest,
    /// Use the latest date in the column
    Latest,
}

/// Target type of a forced column coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Numeric,
    Datetime,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Datetime => write!(f, "datetime"),
        }
    }
}

/// A named column forced into a target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCoercion {
    pub column: String,
    pub target: TargetType,
}

impl ColumnCoercion {
    pub fn new(column: impl Into<String>, target: TargetType) -> Self {
        Self {
            column: column.into(),
            target,
        }
    }
}

/// A chart to render after the table has been cleaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartTask {
    /// Mean of `y` per category of `x`
    Bar { x: String, y: String },
    /// `y` against `x`, sorted by `x`
    Line { x: String, y: String },
    /// Distribution of one numeric column
    Hist { column: String, bins: usize },
}

impl ChartTask {
    /// Output file name, e.g. `Total Spent_by_Location_bar.png`.
    pub fn file_name(&self) -> String {
        match self {
            Self::Bar { x, y } => format!("{}_by_{}_bar.png", y, x),
            Self::Line { x, y } => format!("{}_over_{}_line.png", y, x),
            Self::Hist { column, .. } => format!("{}_histogram.png", column),
        }
    }

    /// Columns the chart reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Bar { x, y } | Self::Line { x, y } => vec![x.as_str(), y.as_str()],
            Self::Hist { column, .. } => vec![column.as_str()],
        }
    }
}

/// Configuration for the sales pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use sales_processing::config::{PipelineConfig, NumericFill};
///
/// let config = PipelineConfig::builder()
///     .input_path("data/raw/dirty_cafe_sales.csv")
///     .numeric_fill(NumericFill::Median)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset location (file path, or database path for SQL sources).
    /// Default: "data/raw/dirty_cafe_sales.csv"
    pub input_path: PathBuf,

    /// Source kind. None detects it from the file extension.
    /// Default: None
    pub source_kind: Option<SourceKind>,

    /// Query used for SQL sources. None runs `SELECT * FROM sales`.
    /// Default: None
    pub sql_query: Option<String>,

    /// Directory for the cleaned dataset, the analysis report and the run log.
    /// Default: "data/processed"
    pub processed_dir: PathBuf,

    /// Directory for chart images.
    /// Default: "plots"
    pub plots_dir: PathBuf,

    /// File name (without extension) of the cleaned CSV and JSON outputs.
    /// Default: "cleaned_cafe_sales"
    pub output_name: String,

    /// File name of the persisted run log.
    /// Default: "summary.txt"
    pub log_file_name: String,

    /// Fill policy for numeric columns, applied on every resolver pass.
    /// Default: Mean
    pub numeric_fill: NumericFill,

    /// Fill policy for date columns, applied on every resolver pass.
    /// Default: Earliest
    pub datetime_fill: DatetimeFill,

    /// A text column with at most this many distinct values is categorical.
    /// Default: 50
    pub max_categorical_cardinality: usize,

    /// A text column whose distinct/non-null ratio is at most this is categorical.
    /// Default: 0.5
    pub max_categorical_ratio: f64,

    /// Columns forced into numeric or datetime after the first fill pass.
    pub coercions: Vec<ColumnCoercion>,

    /// Column pairs for Pearson correlation.
    pub correlation_pairs: Vec<(String, String)>,

    /// Columns checked for IQR outliers.
    pub outlier_columns: Vec<String>,

    /// Charts rendered at the end of the run.
    pub charts: Vec<ChartTask>,

    /// Rows shown in each table preview.
    /// Default: 10
    pub preview_rows: usize,

    /// Echo run log entries to stdout as they are recorded.
    /// Default: true
    pub echo_console: bool,

    /// Write outputs to disk. When false the run is kept in memory.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/raw/dirty_cafe_sales.csv"),
            source_kind: None,
            sql_query: None,
            processed_dir: PathBuf::from("data/processed"),
            plots_dir: PathBuf::from("plots"),
            output_name: "cleaned_cafe_sales".to_string(),
            log_file_name: "summary.txt".to_string(),
            numeric_fill: NumericFill::default(),
            datetime_fill: DatetimeFill::default(),
            max_categorical_cardinality: 50,
            max_categorical_ratio: 0.5,
            coercions: default_coercions(),
            correlation_pairs: vec![
                ("Quantity".to_string(), "Total Spent".to_string()),
                ("Price Per Unit".to_string(), "Total Spent".to_string()),
            ],
            outlier_columns: vec!["Total Spent".to_string()],
            charts: default_charts(),
            preview_rows: 10,
            echo_console: true,
            save_to_disk: true,
        }
    }
}

fn default_coercions() -> Vec<ColumnCoercion> {
    vec![
        ColumnCoercion::new("Quantity", TargetType::Numeric),
        ColumnCoercion::new("Price Per Unit", TargetType::Numeric),
        ColumnCoercion::new("Total Spent", TargetType::Numeric),
        ColumnCoercion::new("Transaction Date", TargetType::Datetime),
    ]
}

fn default_charts() -> Vec<ChartTask> {
    vec![
        ChartTask::Bar {
            x: "Location".to_string(),
            y: "Total Spent".to_string(),
        },
        ChartTask::Line {
            x: "Transaction Date".to_string(),
            y: "Total Spent".to_string(),
        },
        ChartTask::Hist {
            column: "Total Spent".to_string(),
            bins: 10,
        },
    ]
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.max_categorical_ratio) {
            return Err(ConfigValidationError::InvalidRatio {
                field: "max_categorical_ratio".to_string(),
                value: self.max_categorical_ratio,
            });
        }

        if self.max_categorical_cardinality == 0 {
            return Err(ConfigValidationError::InvalidCardinality(
                self.max_categorical_cardinality,
            ));
        }

        if self.output_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyName("output_name".to_string()));
        }

        if self.log_file_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyName("log_file_name".to_string()));
        }

        for chart in &self.charts {
            if let ChartTask::Hist { column, bins: 0 } = chart {
                return Err(ConfigValidationError::InvalidBins(column.clone()));
            }
        }

        Ok(())
    }

    /// Source kind to load with: the configured one or the one the extension implies.
    pub fn resolved_source_kind(&self) -> Option<SourceKind> {
        self.source_kind
            .or_else(|| SourceKind::from_path(&self.input_path))
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid ratio for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidRatio { field: String, value: f64 },

    #[error("Invalid categorical cardinality: {0} (must be at least 1)")]
    InvalidCardinality(usize),

    #[error("'{0}' must not be empty")]
    EmptyName(String),

    #[error("Histogram of '{0}' needs at least one bin")]
    InvalidBins(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    input_path: Option<PathBuf>,
    source_kind: Option<SourceKind>,
    sql_query: Option<String>,
    processed_dir: Option<PathBuf>,
    plots_dir: Option<PathBuf>,
    output_name: Option<String>,
    log_file_name: Option<String>,
    numeric_fill: Option<NumericFill>,
    datetime_fill: Option<DatetimeFill>,
    max_categorical_cardinality: Option<usize>,
    max_categorical_ratio: Option<f64>,
    coercions: Option<Vec<ColumnCoercion>>,
    correlation_pairs: Option<Vec<(String, String)>>,
    outlier_columns: Option<Vec<String>>,
    charts: Option<Vec<ChartTask>>,
    preview_rows: Option<usize>,
    echo_console: Option<bool>,
    save_to_disk: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the dataset location.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Force a source kind instead of detecting it from the extension.
    pub fn source_kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = Some(kind);
        self
    }

    /// Set the query for SQL sources.
    pub fn sql_query(mut self, query: impl Into<String>) -> Self {
        self.sql_query = Some(query.into());
        self
    }

    /// Set the directory for the cleaned dataset, report and run log.
    pub fn processed_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.processed_dir = Some(path.into());
        self
    }

    /// Set the directory for chart images.
    pub fn plots_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.plots_dir = Some(path.into());
        self
    }

    /// Set the file name (without extension) of the cleaned outputs.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Set the file name of the run log.
    pub fn log_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = Some(name.into());
        self
    }

    pub fn numeric_fill(mut self, fill: NumericFill) -> Self {
        self.numeric_fill = Some(fill);
        self
    }

    pub fn datetime_fill(mut self, fill: DatetimeFill) -> Self {
        self.datetime_fill = Some(fill);
        self
    }

    /// Set the distinct-value limit for categorical classification.
    pub fn max_categorical_cardinality(mut self, limit: usize) -> Self {
        self.max_categorical_cardinality = Some(limit);
        self
    }

    /// Set the distinct-ratio limit for categorical classification.
    ///
    /// # Arguments
    /// * `ratio` - Value between 0.0 and 1.0
    pub fn max_categorical_ratio(mut self, ratio: f64) -> Self {
        self.max_categorical_ratio = Some(ratio);
        self
    }

    pub fn coercions(mut self, coercions: Vec<ColumnCoercion>) -> Self {
        self.coercions = Some(coercions);
        self
    }

    pub fn correlation_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.correlation_pairs = Some(pairs);
        self
    }

    pub fn outlier_columns(mut self, columns: Vec<String>) -> Self {
        self.outlier_columns = Some(columns);
        self
    }

    pub fn charts(mut self, charts: Vec<ChartTask>) -> Self {
        self.charts = Some(charts);
        self
    }

    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Enable or disable echoing run log entries to stdout.
    pub fn echo_console(mut self, echo: bool) -> Self {
        self.echo_console = Some(echo);
        self
    }

    /// Enable or disable writing outputs to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration, validating all values.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let default = PipelineConfig::default();

        let config = PipelineConfig {
            input_path: self.input_path.unwrap_or(default.input_path),
            source_kind: self.source_kind.or(default.source_kind),
            sql_query: self.sql_query.or(default.sql_query),
            processed_dir: self.processed_dir.unwrap_or(default.processed_dir),
            plots_dir: self.plots_dir.unwrap_or(default.plots_dir),
            output_name: self.output_name.unwrap_or(default.output_name),
            log_file_name: self.log_file_name.unwrap_or(default.log_file_name),
            numeric_fill: self.numeric_fill.unwrap_or(default.numeric_fill),
            datetime_fill: self.datetime_fill.unwrap_or(default.datetime_fill),
            max_categorical_cardinality: self
                .max_categorical_cardinality
                .unwrap_or(default.max_categorical_cardinality),
            max_categorical_ratio: self
                .max_categorical_ratio
                .unwrap_or(default.max_categorical_ratio),
            coercions: self.coercions.unwrap_or(default.coercions),
            correlation_pairs: self.correlation_pairs.unwrap_or(default.correlation_pairs),
            outlier_columns: self.outlier_columns.unwrap_or(default.outlier_columns),
            charts: self.charts.unwrap_or(default.charts),
            preview_rows: self.preview_rows.unwrap_or(default.preview_rows),
            echo_console: self.echo_console.unwrap_or(default.echo_console),
            save_to_disk: self.save_to_disk.unwrap_or(default.save_to_disk),
        };

        config.validate()?;
        Ok(config)
    }
}
