//! Persistence of cleaned data, charts, reports and the run log.
//!
//! Every write creates its target directory on demand, reports the outcome in
//! the run log and returns the written path. Failures never propagate.

pub mod charts;

pub use charts::{ChartImage, render_bar, render_histogram, render_line};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ResultExt};
use crate::run_log::RunLog;
use crate::types::AnalysisReport;
use crate::utils::{is_numeric_dtype, series_to_strings};
use polars::prelude::*;
use serde_json::{Map, Number, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Datetime layout used in written CSV files.
pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes pipeline artifacts below two directories.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    processed_dir: PathBuf,
    plots_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(processed_dir: impl Into<PathBuf>, plots_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
            plots_dir: plots_dir.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.processed_dir, &config.plots_dir)
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn plots_dir(&self) -> &Path {
        &self.plots_dir
    }

    /// Write the table as comma separated text with a header row.
    pub fn write_csv(
        &self,
        df: &mut DataFrame,
        file_name: &str,
        log: &mut RunLog,
    ) -> Option<PathBuf> {
        save(&self.processed_dir, file_name, "CSV data", log, |path| {
            let mut file = File::create(path)?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .with_separator(b',')
                .with_quote_char(b'"')
                .with_datetime_format(Some(CSV_DATETIME_FORMAT.to_string()))
                .finish(df)?;
            Ok(())
        })
    }

    /// Write the table as a JSON array of row objects.
    pub fn write_json(&self, df: &DataFrame, file_name: &str, log: &mut RunLog) -> Option<PathBuf> {
        save(&self.processed_dir, file_name, "JSON data", log, |path| {
            let records = frame_to_records(df)?;
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &records)?;
            writer.flush()?;
            Ok(())
        })
    }

    /// Flush the run log as plain text, one entry per line.
    ///
    /// The outcome of the flush is appended afterwards, so it is echoed and
    /// kept in memory but is not part of the written file.
    pub fn write_log(&self, log: &mut RunLog, file_name: &str) -> Option<PathBuf> {
        let contents = log.render();
        save(&self.processed_dir, file_name, "run log", log, |path| {
            fs::write(path, contents.as_bytes())?;
            Ok(())
        })
    }

    /// Persist a rendered chart as PNG.
    pub fn write_chart(
        &self,
        chart: &ChartImage,
        file_name: &str,
        log: &mut RunLog,
    ) -> Option<PathBuf> {
        let what = format!("chart '{}'", chart.title);
        save(&self.plots_dir, file_name, &what, log, |path| {
            let image = image::RgbImage::from_raw(chart.width, chart.height, chart.pixels.clone())
                .ok_or_else(|| {
                    PipelineError::ChartRendering(format!(
                        "pixel buffer does not match {}x{}",
                        chart.width, chart.height
                    ))
                })?;
            image.save(path)?;
            Ok(())
        })
    }

    /// Write the analysis report as pretty-printed JSON.
    pub fn write_report(
        &self,
        report: &AnalysisReport,
        file_name: &str,
        log: &mut RunLog,
    ) -> Option<PathBuf> {
        save(&self.processed_dir, file_name, "analysis report", log, |path| {
            let json = serde_json::to_string_pretty(report)?;
            fs::write(path, json)?;
            Ok(())
        })
    }
}

fn save<F>(dir: &Path, file_name: &str, what: &str, log: &mut RunLog, write: F) -> Option<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let path = dir.join(file_name);
    let outcome = fs::create_dir_all(dir)
        .context(format!("Creating directory {}", dir.display()))
        .and_then(|_| write(&path));

    match outcome {
        Ok(()) => {
            info!("Saved {} to {}", what, path.display());
            log.success(format!("Saved {} to {}", what, path.display()));
            Some(path)
        }
        Err(e) => {
            log.error(format!("Failed to save {} to {}: {}", what, path.display(), e));
            None
        }
    }
}

fn column_values(series: &Series) -> Result<Vec<Value>> {
    let dtype = series.dtype();

    if dtype == &DataType::Boolean {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            .collect());
    }

    if is_numeric_dtype(dtype) && !dtype.is_float() {
        let ints = series.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .collect());
    }

    if dtype.is_float() {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null))
            .collect());
    }

    Ok(series_to_strings(series)?
        .into_iter()
        .map(|v| v.map(Value::String).unwrap_or(Value::Null))
        .collect())
}

/// One JSON object per row, keys in column order.
pub(crate) fn frame_to_records(df: &DataFrame) -> Result<Vec<Value>> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| {
            let series = c.as_materialized_series();
            Ok((series.name().to_string(), column_values(series)?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| {
            let record: Map<String, Value> = columns
                .iter()
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect();
            Value::Object(record)
        })
        .collect())
}
