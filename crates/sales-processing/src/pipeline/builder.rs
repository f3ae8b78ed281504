//! Main pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating load, cleaning, analysis and output.

use super::stages::{PipelineStage, StageTracker};
use super::PipelineResult;
use crate::analysis::{correlation_analysis, dataset_overview, detect_outliers, summary_statistics};
use crate::cleaner::TypeCoercer;
use crate::config::{ChartTask, ConfigValidationError, PipelineConfig};
use crate::imputers::{FillPolicy, MissingValueResolver};
use crate::loader::DataLoader;
use crate::output::{OutputWriter, render_bar, render_histogram, render_line};
use crate::run_log::RunLog;
use crate::types::AnalysisReport;
use polars::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// File name of the persisted analysis report.
pub const REPORT_FILE_NAME: &str = "analysis_report.json";

/// The sales cleaning and analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use sales_processing::{Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .input_path("data/raw/dirty_cafe_sales.csv")
///     .build()?;
///
/// let result = Pipeline::builder().config(config).build()?.run();
/// println!("{} rows x {} columns", result.rows, result.columns);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    resolver: MissingValueResolver,
    coercer: TypeCoercer,
    writer: OutputWriter,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured input and run every stage on it.
    pub fn run(&self) -> PipelineResult {
        let mut log = RunLog::new().with_echo(self.config.echo_console);
        let mut tracker = StageTracker::default();
        let path = &self.config.input_path;

        let df = tracker.run(PipelineStage::Loading, &mut log, |log| {
            match self.config.resolved_source_kind() {
                Some(kind) => DataLoader::load(kind, path, self.config.sql_query.as_deref(), log),
                None => DataLoader::load_auto(path, log),
            }
        });

        self.execute(df, path.display().to_string(), log, tracker)
    }

    /// Run every stage after loading on a table the caller already holds.
    pub fn process(&self, df: DataFrame) -> PipelineResult {
        let log = RunLog::new().with_echo(self.config.echo_console);
        let mut tracker = StageTracker::default();
        tracker.skip(PipelineStage::Loading);
        self.execute(df, "<in-memory>".to_string(), log, tracker)
    }

    fn execute(
        &self,
        df: DataFrame,
        source: String,
        mut log: RunLog,
        mut tracker: StageTracker,
    ) -> PipelineResult {
        let start_time = Instant::now();
        let mut written: Vec<PathBuf> = Vec::new();

        if df.width() == 0 {
            log.warn("No data loaded; nothing to clean or analyse.");
            for stage in [
                PipelineStage::Resolving,
                PipelineStage::Coercing,
                PipelineStage::Saving,
                PipelineStage::Analysis,
                PipelineStage::Charts,
            ] {
                tracker.skip(stage);
            }
            self.flush_log(&mut log, &mut tracker, &mut written);
            return PipelineResult {
                data: df,
                rows: 0,
                columns: 0,
                stage_outcomes: tracker.into_outcomes(),
                report: AnalysisReport {
                    generated_at: chrono::Local::now().to_rfc3339(),
                    source,
                    ..AnalysisReport::default()
                },
                written,
                log,
            };
        }

        self.preview(&df, "Original Data", &mut log);

        let df = tracker.run(PipelineStage::Resolving, &mut log, |log| {
            let df = self.resolver.resolve_missing(df, log);
            self.preview(&df, "Cleaned Data", log);
            df
        });

        let mut df = tracker.run(PipelineStage::Coercing, &mut log, |log| {
            let df = self.coercer.coerce_columns(df, &self.config.coercions, log);
            let df = self.resolver.resolve_missing(df, log);
            self.preview(&df, "Cleaned & Typed Data", log);
            df
        });

        if self.config.save_to_disk {
            tracker.run(PipelineStage::Saving, &mut log, |log| {
                let name = &self.config.output_name;
                written.extend(self.writer.write_csv(&mut df, &format!("{}.csv", name), log));
                written.extend(self.writer.write_json(&df, &format!("{}.json", name), log));
            });
        } else {
            tracker.skip(PipelineStage::Saving);
        }

        let report = tracker.run(PipelineStage::Analysis, &mut log, |log| {
            let report = self.analyse(&df, source, log);
            if self.config.save_to_disk {
                written.extend(self.writer.write_report(&report, REPORT_FILE_NAME, log));
            }
            report
        });

        if self.config.save_to_disk && !self.config.charts.is_empty() {
            tracker.run(PipelineStage::Charts, &mut log, |log| {
                for task in &self.config.charts {
                    written.extend(self.chart(&df, task, log));
                }
            });
        } else {
            tracker.skip(PipelineStage::Charts);
        }

        info!("Pipeline finished in {:?}", start_time.elapsed());
        self.flush_log(&mut log, &mut tracker, &mut written);

        PipelineResult {
            rows: df.height(),
            columns: df.width(),
            data: df,
            stage_outcomes: tracker.into_outcomes(),
            report,
            written,
            log,
        }
    }

    fn flush_log(&self, log: &mut RunLog, tracker: &mut StageTracker, written: &mut Vec<PathBuf>) {
        if self.config.save_to_disk {
            tracker.run(PipelineStage::LogFlush, log, |log| {
                written.extend(self.writer.write_log(log, &self.config.log_file_name));
            });
        } else {
            tracker.skip(PipelineStage::LogFlush);
        }
    }

    fn preview(&self, df: &DataFrame, title: &str, log: &mut RunLog) {
        if self.config.preview_rows == 0 {
            return;
        }
        log.plain(format!("--- {} ---", title));
        log.plain(df.head(Some(self.config.preview_rows)).to_string());
    }

    fn analyse(&self, df: &DataFrame, source: String, log: &mut RunLog) -> AnalysisReport {
        let limits = self.resolver.policy().limits;

        let overview = dataset_overview(df, &limits, log);
        let summary = summary_statistics(df, log);
        let correlations = self
            .config
            .correlation_pairs
            .iter()
            .filter_map(|(a, b)| correlation_analysis(df, a, b, log))
            .collect();
        let outliers = self
            .config
            .outlier_columns
            .iter()
            .filter_map(|column| detect_outliers(df, column, log))
            .collect();

        AnalysisReport {
            generated_at: chrono::Local::now().to_rfc3339(),
            source,
            overview: Some(overview),
            summary: Some(summary),
            correlations,
            outliers,
        }
    }

    fn chart(&self, df: &DataFrame, task: &ChartTask, log: &mut RunLog) -> Option<PathBuf> {
        let file_name = task.file_name();

        let missing: Vec<&str> = task
            .columns()
            .into_iter()
            .filter(|c| df.column(c).is_err())
            .collect();
        if !missing.is_empty() {
            log.warn(format!(
                "Skipping {}: column(s) {} not found",
                file_name,
                missing.join(", ")
            ));
            return None;
        }

        let rendered = match task {
            ChartTask::Bar { x, y } => render_bar(df, x, y),
            ChartTask::Line { x, y } => render_line(df, x, y),
            ChartTask::Hist { column, bins } => render_histogram(df, column, *bins),
        };

        match rendered {
            Ok(image) => self.writer.write_chart(&image, &file_name, log),
            Err(e) => {
                log.error(format!("Failed to render {}: {}", file_name, e));
                None
            }
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            resolver: MissingValueResolver::new(FillPolicy::from(&config)),
            coercer: TypeCoercer,
            writer: OutputWriter::from_config(&config),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumericFill;
    use crate::pipeline::{StageOutcome, StageStatus};
    use crate::run_log::Severity;
    use crate::utils::datetime_ms;
    use pretty_assertions::assert_eq;

    fn in_memory_config() -> PipelineConfig {
        PipelineConfig::builder()
            .save_to_disk(false)
            .echo_console(false)
            .preview_rows(3)
            .build()
            .unwrap()
    }

    fn dirty_sales() -> DataFrame {
        df![
            "Transaction ID" => ["TXN_1", "TXN_2", "TXN_3", "TXN_4", "TXN_5", "TXN_6"],
            "Item" => [Some("Coffee"), Some("Cake"), None, Some("Coffee"), Some("Coffee"), Some("Cake")],
            "Quantity" => [Some("2"), Some("ERROR"), Some("4"), None, Some("1"), Some("3")],
            "Price Per Unit" => [Some("2.0"), Some("3.0"), Some("UNKNOWN"), Some("2.0"), Some("2.0"), Some("3.0")],
            "Total Spent" => [Some("4.0"), Some("9.0"), Some("8.0"), Some("ERROR"), Some("2.0"), None],
            "Location" => [Some("In-store"), None, Some("Takeaway"), Some("In-store"), Some("In-store"), Some("Takeaway")],
            "Transaction Date" => [Some("2023-09-08"), Some("2023-05-16"), Some("UNKNOWN"), None, Some("2023-05-16"), Some("2023-09-08")],
        ]
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().output_name, "cleaned_cafe_sales");
        assert_eq!(pipeline.resolver.policy().numeric, NumericFill::Mean);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            max_categorical_ratio: 2.0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_cleans_and_types() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();

        let result = pipeline.process(dirty_sales());

        assert_eq!(result.rows, 6);
        assert_eq!(result.columns, 7);
        let df = &result.data;
        assert_eq!(df.column("Quantity").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Transaction Date").unwrap().dtype(), &datetime_ms());
        for name in ["Quantity", "Price Per Unit", "Total Spent", "Item", "Location", "Transaction Date"] {
            assert_eq!(df.column(name).unwrap().null_count(), 0, "{name} still has nulls");
        }
        assert!(result.written.is_empty());
    }

    #[test]
    fn test_process_reports_statistics() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();

        let result = pipeline.process(dirty_sales());

        let report = &result.report;
        assert_eq!(report.source, "<in-memory>");
        assert_eq!(report.overview.as_ref().unwrap().rows, 6);
        assert_eq!(report.summary.as_ref().unwrap().numeric.len(), 3);
        assert_eq!(report.correlations.len(), 2);
        assert_eq!(report.outliers.len(), 1);
    }

    #[test]
    fn test_process_stage_outcomes() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();

        let result = pipeline.process(dirty_sales());

        let stages: Vec<(PipelineStage, StageStatus)> = result
            .stage_outcomes
            .iter()
            .map(|o: &StageOutcome| (o.stage, o.status))
            .collect();
        assert_eq!(
            stages,
            vec![
                (PipelineStage::Loading, StageStatus::Skipped),
                (PipelineStage::Resolving, StageStatus::Completed),
                (PipelineStage::Coercing, StageStatus::Completed),
                (PipelineStage::Saving, StageStatus::Skipped),
                (PipelineStage::Analysis, StageStatus::Completed),
                (PipelineStage::Charts, StageStatus::Skipped),
                (PipelineStage::LogFlush, StageStatus::Skipped),
            ]
        );
    }

    #[test]
    fn test_process_empty_table_stops_early() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();

        let result = pipeline.process(DataFrame::empty());

        assert_eq!(result.rows, 0);
        assert_eq!(result.log.count(Severity::Error), 0);
        assert_eq!(result.log.count(Severity::Warn), 1);
        assert!(result.report.overview.is_none());
        assert!(
            result
                .stage_outcomes
                .iter()
                .skip(1)
                .all(|o| o.status == StageStatus::Skipped)
        );
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let pipeline = Pipeline::builder().config(in_memory_config()).build().unwrap();

        let first = pipeline.process(dirty_sales());
        let second = pipeline.process(first.data.clone());

        assert!(second.data.equals_missing(&first.data));
    }
}
