//! Data cleaning module.
//!
//! This module provides functionality for:
//! - Forcing named columns to numeric or datetime
//! - Dropping rows with missing values
//! - Filling missing values with caller-provided defaults

mod converters;
mod type_coercer;

pub use type_coercer::TypeCoercer;

use crate::run_log::RunLog;
use crate::utils::{fill_numeric_nulls, fill_string_nulls, is_numeric_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A caller-provided default for a column's missing cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Row and cell level cleaning operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Drop every row that has at least one missing cell.
    pub fn remove_missing(df: DataFrame, log: &mut RunLog) -> DataFrame {
        let before = df.height();
        match df.drop_nulls::<String>(None) {
            Ok(cleaned) => {
                let removed = before - cleaned.height();
                log.info(format!(
                    "Removed {} rows with missing values ({} remain)",
                    removed,
                    cleaned.height()
                ));
                cleaned
            }
            Err(e) => {
                log.error(format!("Failed to remove rows with missing values: {}", e));
                df
            }
        }
    }

    /// Fill missing cells with per-column defaults.
    ///
    /// Columns are visited in table order. Defaults for absent columns, and
    /// defaults whose kind does not match the column, are reported and skipped.
    pub fn fill_missing(
        df: DataFrame,
        fill_values: &HashMap<String, FillValue>,
        log: &mut RunLog,
    ) -> DataFrame {
        let mut df = df;

        let mut absent: Vec<&String> = fill_values
            .keys()
            .filter(|name| df.column(name.as_str()).is_err())
            .collect();
        absent.sort();
        for name in absent {
            log.warn(format!("Column '{}' not found; no default applied", name));
        }

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for name in names {
            let Some(value) = fill_values.get(&name) else {
                continue;
            };
            let series = match df.column(&name) {
                Ok(col) => col.as_materialized_series().clone(),
                Err(_) => continue,
            };
            let missing = series.null_count();
            if missing == 0 {
                continue;
            }

            let filled = match (value, series.dtype()) {
                (FillValue::Number(v), dtype) if is_numeric_dtype(dtype) => {
                    fill_numeric_nulls(&series, *v)
                }
                (FillValue::Number(v), DataType::String) => {
                    fill_string_nulls(&series, &v.to_string())
                }
                (FillValue::Text(v), DataType::String) => fill_string_nulls(&series, v),
                (FillValue::Bool(v), DataType::Boolean) => {
                    let values: Vec<Option<bool>> = series
                        .bool()
                        .map(|ca| ca.into_iter().map(|b| Some(b.unwrap_or(*v))).collect())
                        .unwrap_or_default();
                    Ok(Series::new(series.name().clone(), values))
                }
                (value, dtype) => {
                    log.warn(format!(
                        "Default {:?} does not fit column '{}' of type {}; skipped",
                        value, name, dtype
                    ));
                    continue;
                }
            };

            match filled.and_then(|s| df.replace(&name, s).map(|_| ())) {
                Ok(()) => {
                    debug!("Applied default to '{}'", name);
                    log.info(format!(
                        "Filled {} missing values in '{}' with default {:?}",
                        missing, name, value
                    ));
                }
                Err(e) => log.error(format!("Failed to fill '{}': {}", name, e)),
            }
        }

        df
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_log::Severity;

    #[test]
    fn test_remove_missing() {
        let df = df![
            "Item" => [Some("Coffee"), None, Some("Tea")],
            "Quantity" => [Some(1.0), Some(2.0), None],
        ]
        .unwrap();
        let mut log = RunLog::silent();

        let out = DataCleaner::remove_missing(df, &mut log);

        assert_eq!(out.height(), 1);
        assert!(log.lines()[0].contains("Removed 2 rows"));
    }

    #[test]
    fn test_fill_missing_with_defaults() {
        let df = df![
            "Item" => [Some("Coffee"), None],
            "Quantity" => [None, Some(2.0)],
            "Member" => [Some(true), None],
        ]
        .unwrap();
        let defaults = HashMap::from([
            ("Item".to_string(), FillValue::Text("Unknown".to_string())),
            ("Quantity".to_string(), FillValue::Number(0.0)),
            ("Member".to_string(), FillValue::Bool(false)),
        ]);
        let mut log = RunLog::silent();

        let out = DataCleaner::fill_missing(df, &defaults, &mut log);

        assert_eq!(out.column("Item").unwrap().str().unwrap().get(1), Some("Unknown"));
        assert_eq!(out.column("Quantity").unwrap().f64().unwrap().get(0), Some(0.0));
        assert_eq!(out.column("Member").unwrap().bool().unwrap().get(1), Some(false));
        assert_eq!(log.count(Severity::Info), 3);
    }

    #[test]
    fn test_fill_missing_warns_on_absent_and_mismatched() {
        let df = df![
            "Quantity" => [None, Some(2.0)],
        ]
        .unwrap();
        let defaults = HashMap::from([
            ("Quantity".to_string(), FillValue::Text("none".to_string())),
            ("Discount".to_string(), FillValue::Number(0.0)),
        ]);
        let mut log = RunLog::silent();

        let out = DataCleaner::fill_missing(df, &defaults, &mut log);

        assert_eq!(out.column("Quantity").unwrap().null_count(), 1);
        assert_eq!(log.count(Severity::Warn), 2);
    }

    #[test]
    fn test_fill_value_json_untagged() {
        let values: HashMap<String, FillValue> =
            serde_json::from_str(r#"{"a": 1.5, "b": "x", "c": true}"#).unwrap();
        assert_eq!(values["a"], FillValue::Number(1.5));
        assert_eq!(values["b"], FillValue::Text("x".to_string()));
        assert_eq!(values["c"], FillValue::Bool(true));
    }
}
