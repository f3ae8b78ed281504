//! JSON reading for record-array and column-oriented documents.
//!
//! Accepted shapes:
//! - `[{"a": 1, "b": "x"}, ...]` one object per row
//! - `{"a": [1, 2], "b": ["x", "y"]}` one array per column
//! - `{"a": {"0": 1, "1": 2}, ...}` one index-keyed object per column

use super::{Cell, frame_from_cells};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde_json::{Map, Value};
use std::path::Path;

pub(crate) fn read_json(path: &Path) -> Result<DataFrame> {
    let content = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    parse_document(document)
}

pub(crate) fn parse_document(document: Value) -> Result<DataFrame> {
    match document {
        Value::Array(records) => from_records(records),
        Value::Object(columns) => from_columns(columns),
        other => Err(PipelineError::MalformedSource(format!(
            "expected an array of records or an object of columns, found {}",
            kind_name(&other)
        ))),
    }
}

fn from_records(records: Vec<Value>) -> Result<DataFrame> {
    if records.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut names: Vec<String> = Vec::new();
    for record in &records {
        let Value::Object(fields) = record else {
            return Err(PipelineError::MalformedSource(format!(
                "record array contains {} instead of an object",
                kind_name(record)
            )));
        };
        for key in fields.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let cells = records
                .iter()
                .map(|record| record.get(&name).map(to_cell).unwrap_or(Cell::Null))
                .collect();
            (name, cells)
        })
        .collect();

    frame_from_cells(columns)
}

fn from_columns(columns: Map<String, Value>) -> Result<DataFrame> {
    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }

    // Index-keyed columns share one row index, ordered by first appearance.
    let mut index: Vec<String> = Vec::new();
    for value in columns.values() {
        if let Value::Object(cells) = value {
            for key in cells.keys() {
                if !index.contains(key) {
                    index.push(key.clone());
                }
            }
        }
    }

    let mut out = Vec::with_capacity(columns.len());
    let mut height: Option<usize> = None;

    for (name, value) in columns {
        let cells: Vec<Cell> = match value {
            Value::Array(values) => values.iter().map(to_cell).collect(),
            Value::Object(values) => index
                .iter()
                .map(|key| values.get(key).map(to_cell).unwrap_or(Cell::Null))
                .collect(),
            other => {
                return Err(PipelineError::MalformedSource(format!(
                    "column '{}' holds {} instead of an array or an index-keyed object",
                    name,
                    kind_name(&other)
                )));
            }
        };

        match height {
            Some(h) if h != cells.len() => {
                return Err(PipelineError::MalformedSource(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    cells.len(),
                    h
                )));
            }
            _ => height = Some(cells.len()),
        }
        out.push((name, cells));
    }

    frame_from_cells(out)
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        },
        Value::String(s) => Cell::Text(s.clone()),
        nested => Cell::Text(nested.to_string()),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_array() {
        let df = parse_document(json!([
            {"Item": "Coffee", "Quantity": 2},
            {"Item": "Tea", "Quantity": null, "Location": "Takeaway"},
        ]))
        .unwrap();

        assert_eq!(df.shape(), (2, 3));
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Item", "Quantity", "Location"]);
        assert_eq!(df.column("Quantity").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Location").unwrap().null_count(), 1);
    }

    #[test]
    fn test_column_arrays() {
        let df = parse_document(json!({
            "Price Per Unit": [2.0, 1.5, 3],
            "Item": ["Coffee", "Tea", "Cake"],
        }))
        .unwrap();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(
            df.column("Price Per Unit").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_index_keyed_columns() {
        let df = parse_document(json!({
            "Item": {"0": "Coffee", "1": "Tea"},
            "Quantity": {"1": 4},
        }))
        .unwrap();
        assert_eq!(df.shape(), (2, 2));
        let quantity = df.column("Quantity").unwrap();
        assert_eq!(quantity.null_count(), 1);
        assert_eq!(quantity.get(1).unwrap().try_extract::<i64>().unwrap(), 4);
    }

    #[test]
    fn test_ragged_column_arrays_rejected() {
        let err = parse_document(json!({"a": [1, 2], "b": [1]})).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_SOURCE");
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(parse_document(json!(42)).is_err());
        assert!(parse_document(json!({"a": 1})).is_err());
        assert!(parse_document(json!([1, 2])).is_err());
    }

    #[test]
    fn test_empty_array_is_empty_frame() {
        let df = parse_document(json!([])).unwrap();
        assert_eq!(df.width(), 0);
    }
}
