//! Conversion functions used by type coercion.

use crate::error::{PipelineError, Result};
use crate::utils::{datetime_ms, is_numeric_dtype, is_temporal_dtype, parse_datetime_millis, parse_numeric_string};
use polars::prelude::*;

/// Convert a column to Float64. Values that do not parse become null.
pub(crate) fn to_float(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::String => {
            let values: Vec<Option<f64>> = series
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_numeric_string))
                .collect();
            Ok(Series::new(series.name().clone(), values))
        }
        dtype if is_numeric_dtype(dtype) || dtype == &DataType::Boolean => {
            Ok(series.cast(&DataType::Float64)?)
        }
        other => Err(PipelineError::TypeCoercionFailed {
            column: series.name().to_string(),
            target_type: "numeric".to_string(),
            reason: format!("cannot read numbers from {} values", other),
        }),
    }
}

/// Convert a column to millisecond Datetime. Values that do not parse become null.
///
/// Integer columns are read as epoch timestamps in seconds or milliseconds;
/// integers outside both plausible ranges become null.
pub(crate) fn to_datetime(series: &Series) -> Result<Series> {
    let dtype = series.dtype();

    if dtype == &DataType::String {
        let values: Vec<Option<i64>> = series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_datetime_millis))
            .collect();
        return Ok(Series::new(series.name().clone(), values).cast(&datetime_ms())?);
    }

    if is_temporal_dtype(dtype) {
        return Ok(series.cast(&datetime_ms())?);
    }

    if is_numeric_dtype(dtype) {
        let raw = series.cast(&DataType::Int64)?;
        let values: Vec<Option<i64>> = raw
            .i64()?
            .into_iter()
            .map(|v| v.and_then(epoch_to_millis))
            .collect();
        return Ok(Series::new(series.name().clone(), values).cast(&datetime_ms())?);
    }

    Err(PipelineError::TypeCoercionFailed {
        column: series.name().to_string(),
        target_type: "datetime".to_string(),
        reason: format!("cannot read dates from {} values", dtype),
    })
}

fn epoch_to_millis(timestamp: i64) -> Option<i64> {
    if timestamp > 1_000_000_000 && timestamp < 2_000_000_000 {
        Some(timestamp * 1000)
    } else if timestamp > 1_000_000_000_000 && timestamp < 2_000_000_000_000 {
        Some(timestamp)
    } else {
        None
    }
}
