//! Forced conversion of named columns to numeric or datetime.

use super::converters::{to_datetime, to_float};
use crate::config::{ColumnCoercion, TargetType};
use crate::error::{PipelineError, Result};
use crate::run_log::RunLog;
use polars::prelude::*;
use tracing::debug;

/// Converts named columns, turning unparseable cells into missing values.
pub struct TypeCoercer;

impl TypeCoercer {
    /// Coerce one column.
    ///
    /// A column that does not exist is reported with `[WARN]` and the table is
    /// returned unchanged; so is a column whose values cannot be converted.
    pub fn coerce_column(
        &self,
        df: DataFrame,
        column: &str,
        target: TargetType,
        log: &mut RunLog,
    ) -> DataFrame {
        let mut df = df;
        match self.try_coerce(&mut df, column, target) {
            Ok(introduced) => {
                let detail = if introduced == 0 {
                    "no unparseable values".to_string()
                } else {
                    format!("{} unparseable values set to missing", introduced)
                };
                log.success(format!("Converted '{}' to {} ({})", column, target, detail));
            }
            Err(PipelineError::ColumnNotFound(name)) => {
                log.warn(format!("Column '{}' not found; skipping {} conversion", name, target));
            }
            Err(e) => {
                log.error(format!("Failed to convert '{}' to {}: {}", column, target, e));
            }
        }
        df
    }

    /// Coerce every listed column in order.
    pub fn coerce_columns(
        &self,
        df: DataFrame,
        coercions: &[ColumnCoercion],
        log: &mut RunLog,
    ) -> DataFrame {
        coercions.iter().fold(df, |df, c| {
            self.coerce_column(df, &c.column, c.target, log)
        })
    }

    /// Replace the column with its converted form and return how many cells
    /// became missing in the process.
    fn try_coerce(&self, df: &mut DataFrame, column: &str, target: TargetType) -> Result<usize> {
        let series = df
            .column(column)
            .map_err(|_| PipelineError::ColumnNotFound(column.to_string()))?
            .as_materialized_series()
            .clone();

        let converted = match target {
            TargetType::Numeric => to_float(&series)?,
            TargetType::Datetime => to_datetime(&series)?,
        };

        let introduced = converted.null_count().saturating_sub(series.null_count());
        debug!(
            "Coerced '{}' from {} to {} ({} new nulls)",
            column,
            series.dtype(),
            converted.dtype(),
            introduced
        );

        df.replace(column, converted)?;
        Ok(introduced)
    }
}
