//! Dataset loading from CSV, JSON and SQLite sources.
//!
//! The loader never fails outward: every problem is reported as one
//! `[ERROR]` line in the run log and an empty table is returned, so the
//! caller can decide whether there is anything left to do.

mod csv;
mod json;
mod sql;

use crate::config::SourceKind;
use crate::error::{PipelineError, Result};
use crate::run_log::RunLog;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Query run against SQL sources when none is given.
pub const DEFAULT_SQL_QUERY: &str = "SELECT * FROM sales";

/// Loads a source into a `DataFrame`.
pub struct DataLoader;

impl DataLoader {
    /// Load `location` as the given kind of source.
    ///
    /// `query` only applies to SQL sources.
    pub fn load(
        kind: SourceKind,
        location: impl AsRef<Path>,
        query: Option<&str>,
        log: &mut RunLog,
    ) -> DataFrame {
        let location = location.as_ref();
        log.info(format!("Loading {} data from '{}'", kind, location.display()));

        match Self::try_load(kind, location, query, log) {
            Ok(df) => {
                if df.width() == 0 {
                    log.warn(format!("'{}' contains no data", location.display()));
                } else {
                    log.success(format!(
                        "Loaded {} rows x {} columns from '{}'",
                        df.height(),
                        df.width(),
                        location.display()
                    ));
                }
                info!("Loaded dataset with shape {:?}", df.shape());
                df
            }
            Err(e) => {
                debug!("Loader error code: {}", e.error_code());
                log.error(format!("Failed to load '{}': {}", location.display(), e));
                DataFrame::empty()
            }
        }
    }

    /// Load using a textual source selector such as `"csv"`.
    ///
    /// An unsupported selector yields an empty table and one `[ERROR]` line.
    pub fn load_from(
        selector: &str,
        location: impl AsRef<Path>,
        query: Option<&str>,
        log: &mut RunLog,
    ) -> DataFrame {
        match selector.parse::<SourceKind>() {
            Ok(kind) => Self::load(kind, location, query, log),
            Err(e) => {
                log.error(format!("Cannot load '{}': {}", location.as_ref().display(), e));
                DataFrame::empty()
            }
        }
    }

    /// Load a file, picking the source kind from its extension.
    pub fn load_auto(path: impl AsRef<Path>, log: &mut RunLog) -> DataFrame {
        let path = path.as_ref();
        match SourceKind::from_path(path) {
            Some(kind) => Self::load(kind, path, None, log),
            None => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string();
                log.error(format!(
                    "Cannot load '{}': {}",
                    path.display(),
                    PipelineError::UnsupportedSource(ext)
                ));
                DataFrame::empty()
            }
        }
    }

    fn try_load(
        kind: SourceKind,
        location: &Path,
        query: Option<&str>,
        log: &mut RunLog,
    ) -> Result<DataFrame> {
        if !location.exists() {
            return Err(PipelineError::FileNotFound(location.display().to_string()));
        }

        match kind {
            SourceKind::Csv => csv::read_csv(location),
            SourceKind::Json => json::read_json(location),
            SourceKind::Sql => sql::read_sql(location, query.unwrap_or(DEFAULT_SQL_QUERY), log),
        }
    }
}

// ============================================================================
// Column assembly shared by the JSON and SQL readers
// ============================================================================

/// A single untyped cell as read from a JSON document or a SQL row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(v) => Some(v.to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Bool(v) => Some(v.to_string()),
            Cell::Text(v) => Some(v.clone()),
        }
    }
}

/// Build a typed Series from loose cells.
///
/// All-integer columns become Int64, mixed integer/real columns Float64,
/// all-boolean columns Boolean, anything else String.
pub(crate) fn build_series(name: &str, cells: &[Cell]) -> Series {
    let present = || cells.iter().filter(|c| **c != Cell::Null);

    if present().all(|c| matches!(c, Cell::Int(_))) && present().next().is_some() {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if present().all(|c| matches!(c, Cell::Int(_) | Cell::Float(_))) && present().next().is_some()
    {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(v) => Some(*v as f64),
                Cell::Float(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if present().all(|c| matches!(c, Cell::Bool(_))) && present().next().is_some() {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Cell::Bool(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells.iter().map(Cell::as_text).collect();
    Series::new(name.into(), values)
}

/// Assemble named cell columns into a DataFrame.
pub(crate) fn frame_from_cells(columns: Vec<(String, Vec<Cell>)>) -> Result<DataFrame> {
    let columns: Vec<Column> = columns
        .iter()
        .map(|(name, cells)| Column::from(build_series(name, cells)))
        .collect();
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_log::Severity;

    #[test]
    fn test_build_series_integer() {
        let s = build_series("q", &[Cell::Int(1), Cell::Null, Cell::Int(3)]);
        assert_eq!(s.dtype(), &DataType::Int64);
        assert_eq!(s.null_count(), 1);
    }

    #[test]
    fn test_build_series_mixed_numeric_is_float() {
        let s = build_series("p", &[Cell::Int(1), Cell::Float(2.5)]);
        assert_eq!(s.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_build_series_mixed_falls_back_to_text() {
        let s = build_series("q", &[Cell::Int(1), Cell::Text("ERROR".to_string())]);
        assert_eq!(s.dtype(), &DataType::String);
        let values: Vec<Option<&str>> = s.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("1"), Some("ERROR")]);
    }

    #[test]
    fn test_build_series_all_null_is_text() {
        let s = build_series("n", &[Cell::Null, Cell::Null]);
        assert_eq!(s.dtype(), &DataType::String);
        assert_eq!(s.null_count(), 2);
    }

    #[test]
    fn test_missing_file_logs_one_error() {
        let mut log = RunLog::silent();
        let df = DataLoader::load(
            SourceKind::Csv,
            "definitely/not/here.csv",
            None,
            &mut log,
        );
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);
        assert_eq!(log.count(Severity::Error), 1);
    }

    #[test]
    fn test_unsupported_selector_logs_one_error() {
        let mut log = RunLog::silent();
        let df = DataLoader::load_from("xlsx", "sales.xlsx", None, &mut log);
        assert_eq!(df.width(), 0);
        assert_eq!(log.count(Severity::Error), 1);
        assert!(log.lines()[0].contains("Unsupported source type"));
    }

    #[test]
    fn test_load_auto_unknown_extension() {
        let mut log = RunLog::silent();
        let df = DataLoader::load_auto("sales.parquet", &mut log);
        assert_eq!(df.width(), 0);
        assert_eq!(log.count(Severity::Error), 1);
    }
}
