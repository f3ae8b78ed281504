//! Sales Data Processing Library
//!
//! Cleaning, typing and descriptive analysis for tabular sales datasets, built
//! on Polars.
//!
//! # Overview
//!
//! A run goes through these steps:
//!
//! - **Loading**: CSV, JSON or SQLite sources into a [`polars::prelude::DataFrame`]
//! - **Missing Values**: per-column fill by inferred type (mean/median, mode, earliest/latest)
//! - **Type Coercion**: configured columns to floating point or datetime, unparseable cells to missing
//! - **Analysis**: missing counts, summaries, Pearson correlation with a trend label, IQR outliers
//! - **Output**: cleaned CSV and JSON, a JSON analysis report, PNG charts and a plain text run log
//!
//! Every step reports into a [`RunLog`]. Recoverable problems become `[WARN]` or
//! `[ERROR]` entries and the run carries on.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sales_processing::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .input_path("data/raw/dirty_cafe_sales.csv")
//!     .processed_dir("data/processed")
//!     .plots_dir("plots")
//!     .build()?;
//!
//! let result = Pipeline::builder().config(config).build()?.run();
//!
//! println!("{} rows, {} errors", result.rows, result.error_count());
//! for path in &result.written {
//!     println!("wrote {}", path.display());
//! }
//! ```
//!
//! # In-memory tables
//!
//! ```rust,ignore
//! use sales_processing::{Pipeline, PipelineConfig};
//! use polars::prelude::*;
//!
//! let df = df!["Quantity" => [Some(1.0), None, Some(3.0)]]?;
//! let config = PipelineConfig::builder()
//!     .save_to_disk(false)
//!     .echo_console(false)
//!     .build()?;
//!
//! let result = Pipeline::builder().config(config).build()?.process(df);
//! assert_eq!(result.data.column("Quantity")?.null_count(), 0);
//! ```

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod profiler;
pub mod run_log;
pub mod transform;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{DataCleaner, FillValue, TypeCoercer};
pub use config::{
    ChartTask, ColumnCoercion, ConfigValidationError, DatetimeFill, NumericFill, PipelineConfig,
    PipelineConfigBuilder, SourceKind, TargetType,
};
pub use error::{PipelineError, ResultExt};
pub use imputers::{FillPolicy, MissingValueResolver};
pub use loader::DataLoader;
pub use output::{ChartImage, OutputWriter};
pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineResult, PipelineStage, StageOutcome, StageStatus,
};
pub use profiler::{CategoricalLimits, classify_column};
pub use run_log::{LogEntry, RunLog, Severity};
pub use transform::AggMethod;
pub use types::{
    AnalysisReport, ColumnType, CorrelationReport, DatasetOverview, MissingReport,
    NumericSummary, OutlierReport, SummaryReport, Trend,
};
