//! Integration tests for the sales processing pipeline.
//!
//! These tests verify end-to-end behavior against the fixture datasets and
//! temporary output directories.

use polars::prelude::*;
use rusqlite::Connection;
use sales_processing::utils::{datetime_ms, is_numeric_dtype};
use sales_processing::{
    ChartTask, DataLoader, Pipeline, PipelineConfig, PipelineStage, RunLog, Severity, SourceKind,
    StageStatus, Trend,
};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn quiet_config(input: &Path, out: &Path) -> PipelineConfig {
    PipelineConfig::builder()
        .input_path(input)
        .processed_dir(out.join("processed"))
        .plots_dir(out.join("plots"))
        .echo_console(false)
        .build()
        .expect("valid config")
}

fn in_memory_config() -> PipelineConfig {
    PipelineConfig::builder()
        .save_to_disk(false)
        .echo_console(false)
        .preview_rows(0)
        .build()
        .expect("valid config")
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_missing_csv_reports_one_error() {
    let mut log = RunLog::silent();

    let df = DataLoader::load(
        SourceKind::Csv,
        fixtures_path().join("does_not_exist.csv"),
        None,
        &mut log,
    );

    assert_eq!(df.width(), 0);
    assert_eq!(df.height(), 0);
    assert_eq!(log.count(Severity::Error), 1);
}

#[test]
fn test_load_unsupported_selector() {
    let mut log = RunLog::silent();

    let df = DataLoader::load_from(
        "parquet",
        fixtures_path().join("dirty_cafe_sales_sample.csv"),
        None,
        &mut log,
    );

    assert_eq!(df.width(), 0);
    assert_eq!(log.count(Severity::Error), 1);
}

#[test]
fn test_load_csv_fixture() {
    let mut log = RunLog::silent();

    let df = DataLoader::load_auto(fixtures_path().join("dirty_cafe_sales_sample.csv"), &mut log);

    assert_eq!(df.shape(), (20, 8));
    assert_eq!(log.count(Severity::Success), 1);
    // Error markers keep these columns textual
    assert_eq!(df.column("Quantity").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("Total Spent").unwrap().dtype(), &DataType::String);
    assert!(df.column("Item").unwrap().null_count() > 0);
}

#[test]
fn test_load_json_records() {
    let mut log = RunLog::silent();

    let df = DataLoader::load_auto(fixtures_path().join("sales.json"), &mut log);

    assert_eq!(df.shape(), (4, 5));
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(
        names,
        vec!["Item", "Quantity", "Price Per Unit", "Total Spent", "Transaction Date"]
    );
    assert_eq!(df.column("Quantity").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("Quantity").unwrap().null_count(), 1);
    assert_eq!(df.column("Total Spent").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_load_sqlite_default_query() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("sales.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales (item TEXT, quantity INTEGER, total REAL);
         INSERT INTO sales VALUES ('Coffee', 2, 4.0);
         INSERT INTO sales VALUES ('Cake', NULL, 12.5);
         INSERT INTO sales VALUES (NULL, 3, 9.0);",
    )
    .unwrap();
    drop(conn);

    let mut log = RunLog::silent();
    let df = DataLoader::load(SourceKind::Sql, &db, None, &mut log);

    assert_eq!(df.shape(), (3, 3));
    assert_eq!(df.column("quantity").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("total").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("item").unwrap().null_count(), 1);
    assert_eq!(log.count(Severity::Error), 0);
}

#[test]
fn test_load_sqlite_bad_query() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("sales.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch("CREATE TABLE sales (item TEXT);")
        .unwrap();

    let mut log = RunLog::silent();
    let df = DataLoader::load(SourceKind::Sql, &db, Some("SELECT * FROM missing"), &mut log);

    assert_eq!(df.width(), 0);
    assert_eq!(log.count(Severity::Error), 1);
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline_writes_all_outputs() {
    let dir = tempdir().unwrap();
    let config = quiet_config(&fixtures_path().join("dirty_cafe_sales_sample.csv"), dir.path());

    let result = Pipeline::builder().config(config).build().unwrap().run();

    assert!(result.has_data());
    assert_eq!(result.rows, 20);
    assert_eq!(result.columns, 8);

    let processed = dir.path().join("processed");
    let plots = dir.path().join("plots");
    let expected = [
        processed.join("cleaned_cafe_sales.csv"),
        processed.join("cleaned_cafe_sales.json"),
        processed.join("analysis_report.json"),
        plots.join("Total Spent_by_Location_bar.png"),
        plots.join("Total Spent_over_Transaction Date_line.png"),
        plots.join("Total Spent_histogram.png"),
        processed.join("summary.txt"),
    ];
    for path in &expected {
        assert!(path.exists(), "missing output {}", path.display());
    }
    assert_eq!(result.written.len(), expected.len());

    let summary = std::fs::read_to_string(processed.join("summary.txt")).unwrap();
    assert!(summary.contains("=== Loading Data ==="));
    assert!(summary.contains("[SUCCESS] Loaded 20 rows x 8 columns"));
}

#[test]
fn test_full_pipeline_cleans_and_types_columns() {
    let dir = tempdir().unwrap();
    let config = quiet_config(&fixtures_path().join("dirty_cafe_sales_sample.csv"), dir.path());

    let result = Pipeline::builder().config(config).build().unwrap().run();
    let df = &result.data;

    for name in ["Quantity", "Price Per Unit", "Total Spent"] {
        let column = df.column(name).unwrap();
        assert_eq!(column.dtype(), &DataType::Float64, "{}", name);
        assert_eq!(column.null_count(), 0, "{}", name);
    }
    let dates = df.column("Transaction Date").unwrap();
    assert_eq!(dates.dtype(), &datetime_ms());
    assert_eq!(dates.null_count(), 0);
    assert_eq!(df.column("Item").unwrap().null_count(), 0);

    let coercing = result
        .stage_outcomes
        .iter()
        .find(|o| o.stage == PipelineStage::Coercing)
        .unwrap();
    assert_eq!(coercing.status, StageStatus::Completed);
}

#[test]
fn test_full_pipeline_report_contents() {
    let dir = tempdir().unwrap();
    let config = quiet_config(&fixtures_path().join("dirty_cafe_sales_sample.csv"), dir.path());

    let result = Pipeline::builder().config(config).build().unwrap().run();
    let report = &result.report;

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.numeric.len(), 3);
    assert_eq!(report.correlations.len(), 2);
    let quantity_total = &report.correlations[0];
    assert!(quantity_total.r > 0.0);
    assert!(matches!(
        quantity_total.trend,
        Trend::WeakPositive
            | Trend::ModeratePositive
            | Trend::StrongPositive
            | Trend::VeryStrongPositive
    ));
    assert_eq!(report.outliers.len(), 1);

    let written = std::fs::read_to_string(dir.path().join("processed/analysis_report.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["correlations"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cleaned_csv_reloads_with_same_shape() {
    let dir = tempdir().unwrap();
    let config = quiet_config(&fixtures_path().join("dirty_cafe_sales_sample.csv"), dir.path());
    let result = Pipeline::builder().config(config).build().unwrap().run();

    let mut log = RunLog::silent();
    let reloaded = DataLoader::load(
        SourceKind::Csv,
        dir.path().join("processed/cleaned_cafe_sales.csv"),
        None,
        &mut log,
    );

    assert_eq!(reloaded.shape(), result.data.shape());
    assert_eq!(reloaded.get_column_names(), result.data.get_column_names());
    assert!(is_numeric_dtype(reloaded.column("Total Spent").unwrap().dtype()));
    assert_eq!(reloaded.column("Total Spent").unwrap().null_count(), 0);
}

#[test]
fn test_second_pass_changes_nothing() {
    let mut log = RunLog::silent();
    let raw = DataLoader::load_auto(fixtures_path().join("dirty_cafe_sales_sample.csv"), &mut log);
    let pipeline = Pipeline::builder()
        .config(in_memory_config())
        .build()
        .unwrap();

    let first = pipeline.process(raw);
    let second = pipeline.process(first.data.clone());

    assert!(first.data.equals_missing(&second.data));
    assert!(second.written.is_empty());
}

#[test]
fn test_failed_chart_does_not_stop_later_charts() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::builder()
        .input_path(fixtures_path().join("dirty_cafe_sales_sample.csv"))
        .processed_dir(dir.path().join("processed"))
        .plots_dir(dir.path().join("plots"))
        .echo_console(false)
        .charts(vec![
            ChartTask::Line {
                x: "Location".to_string(),
                y: "Total Spent".to_string(),
            },
            ChartTask::Hist {
                column: "Total Spent".to_string(),
                bins: 10,
            },
        ])
        .build()
        .unwrap();

    let result = Pipeline::builder().config(config).build().unwrap().run();

    let chart_errors: Vec<&str> = result
        .log
        .entries()
        .iter()
        .filter(|e| e.severity == Some(Severity::Error))
        .map(|e| e.message.as_str())
        .filter(|m| m.starts_with("Failed to render"))
        .collect();
    assert_eq!(
        chart_errors,
        vec!["Failed to render Total Spent_over_Location_line.png: Column 'Location' is not numeric"]
    );
    assert!(!dir.path().join("plots/Total Spent_over_Location_line.png").exists());
    assert!(dir.path().join("plots/Total Spent_histogram.png").exists());

    let charts = result
        .stage_outcomes
        .iter()
        .find(|o| o.stage == PipelineStage::Charts)
        .unwrap();
    assert_eq!(charts.status, StageStatus::CompletedWithErrors);
    assert_eq!(charts.errors, 1);
}

#[test]
fn test_missing_input_stops_after_loading() {
    let dir = tempdir().unwrap();
    let config = quiet_config(&dir.path().join("nope.csv"), dir.path());

    let result = Pipeline::builder().config(config).build().unwrap().run();

    assert!(!result.has_data());
    // Only the loader reports an error; the early stop is a warning
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.log.count(Severity::Warn), 1);
    assert_eq!(
        result.written,
        vec![dir.path().join("processed").join("summary.txt")]
    );
    let skipped = result
        .stage_outcomes
        .iter()
        .filter(|o| o.status == StageStatus::Skipped)
        .count();
    assert_eq!(skipped, 5);
}

#[test]
fn test_json_source_through_pipeline() {
    let result = Pipeline::builder()
        .config(
            PipelineConfig::builder()
                .input_path(fixtures_path().join("sales.json"))
                .save_to_disk(false)
                .echo_console(false)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
        .run();

    assert_eq!(result.rows, 4);
    let total = result.data.column("Total Spent").unwrap();
    assert_eq!(total.dtype(), &DataType::Float64);
    assert_eq!(total.null_count(), 0);
}
