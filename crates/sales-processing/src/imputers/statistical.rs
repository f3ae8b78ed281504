//! Type-driven missing value filling.
//!
//! Each column with missing cells is classified and filled with a default
//! that suits its type: the mean (or median) for numbers, the most frequent
//! label for categories, the earliest (or latest) date for dates. Columns of
//! unknown type keep their missing cells and get a warning.

use crate::config::{DatetimeFill, NumericFill, PipelineConfig};
use crate::error::Result;
use crate::profiler::{CategoricalLimits, classify_column};
use crate::run_log::RunLog;
use crate::types::ColumnType;
use crate::utils::{
    fill_numeric_nulls, fill_string_nulls, first_mode, format_timestamp, is_temporal_dtype,
    parse_datetime_millis, parse_numeric_string, series_to_f64, series_to_millis,
};
use polars::prelude::*;
use tracing::debug;

/// Fill policy applied on every resolver pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FillPolicy {
    pub numeric: NumericFill,
    pub datetime: DatetimeFill,
    pub limits: CategoricalLimits,
}

impl From<&PipelineConfig> for FillPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            numeric: config.numeric_fill,
            datetime: config.datetime_fill,
            limits: CategoricalLimits {
                max_cardinality: config.max_categorical_cardinality,
                max_ratio: config.max_categorical_ratio,
            },
        }
    }
}

/// Fills missing cells column by column according to a [`FillPolicy`].
#[derive(Debug, Clone, Default)]
pub struct MissingValueResolver {
    policy: FillPolicy,
}

impl MissingValueResolver {
    pub fn new(policy: FillPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FillPolicy {
        &self.policy
    }

    /// Fill missing cells in every column, in column order.
    ///
    /// Columns without missing cells are never rewritten, so running this on
    /// its own output changes nothing. A column that fails to fill is
    /// reported and left as it was.
    pub fn resolve_missing(&self, df: DataFrame, log: &mut RunLog) -> DataFrame {
        let mut df = df;
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut filled_cells = 0;
        let mut filled_columns = 0;

        for name in &names {
            match self.resolve_column(&mut df, name, log) {
                Ok(0) => {}
                Ok(n) => {
                    filled_cells += n;
                    filled_columns += 1;
                }
                Err(e) => log.error(format!(
                    "Failed to fill missing values in '{}': {}",
                    name, e
                )),
            }
        }

        if filled_cells == 0 {
            log.info("No missing values needed filling");
        } else {
            log.success(format!(
                "Filled {} missing values across {} columns",
                filled_cells, filled_columns
            ));
        }
        df
    }

    /// Fill one column; returns the number of cells filled.
    fn resolve_column(&self, df: &mut DataFrame, name: &str, log: &mut RunLog) -> Result<usize> {
        let series = df.column(name)?.as_materialized_series().clone();
        let missing = series.null_count();
        if missing == 0 {
            return Ok(0);
        }

        let column_type = classify_column(&series, &self.policy.limits);
        debug!("Column '{}' classified as {}", name, column_type);

        match column_type {
            ColumnType::Numeric => self.fill_numeric(df, &series, log)?,
            ColumnType::Categorical => Self::fill_categorical(df, &series, log)?,
            ColumnType::Datetime => self.fill_datetime(df, &series, log)?,
            ColumnType::Unknown => {
                log.warn(format!(
                    "Column '{}' has an unknown type; leaving {} missing values as-is",
                    name, missing
                ));
                return Ok(0);
            }
        }
        Ok(missing)
    }

    fn fill_numeric(&self, df: &mut DataFrame, series: &Series, log: &mut RunLog) -> Result<()> {
        let name = series.name().to_string();
        let numeric = if series.dtype() == &DataType::String {
            let parsed: Vec<Option<f64>> = series
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_numeric_string))
                .collect();
            Series::new(name.as_str().into(), parsed)
        } else {
            Series::new(name.as_str().into(), series_to_f64(series)?)
        };

        let (fill_value, method) = match self.policy.numeric {
            NumericFill::Mean => (numeric.mean(), "mean"),
            NumericFill::Median => (numeric.median(), "median"),
        };
        let Some(fill_value) = fill_value else {
            return Ok(());
        };

        let filled = fill_numeric_nulls(&numeric, fill_value)?;
        df.replace(&name, filled)?;

        log.info(format!(
            "Filled {} missing values in '{}' with {}: {:.2}",
            series.null_count(),
            name,
            method,
            fill_value
        ));
        Ok(())
    }

    fn fill_categorical(df: &mut DataFrame, series: &Series, log: &mut RunLog) -> Result<()> {
        let name = series.name().to_string();

        let filled = if series.dtype() == &DataType::Boolean {
            let values: Vec<Option<bool>> = series.bool()?.into_iter().collect();
            let labels: Vec<Option<&str>> = values
                .iter()
                .map(|v| v.map(|b| if b { "true" } else { "false" }))
                .collect();
            let Some(mode) = first_mode(labels) else {
                return Ok(());
            };
            let fill = mode == "true";
            log.info(format!(
                "Filled {} missing values in '{}' with mode: '{}'",
                series.null_count(),
                name,
                mode
            ));
            let values: Vec<Option<bool>> = values.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
            Series::new(name.as_str().into(), values)
        } else {
            let text = series.cast(&DataType::String)?;
            let Some(mode) = first_mode(text.str()?.into_iter()) else {
                return Ok(());
            };
            log.info(format!(
                "Filled {} missing values in '{}' with mode: '{}'",
                series.null_count(),
                name,
                mode
            ));
            fill_string_nulls(&text, &mode)?.cast(series.dtype())?
        };

        df.replace(&name, filled)?;
        Ok(())
    }

    fn fill_datetime(&self, df: &mut DataFrame, series: &Series, log: &mut RunLog) -> Result<()> {
        let name = series.name().to_string();
        let pick_latest = self.policy.datetime == DatetimeFill::Latest;
        let method = if pick_latest { "latest date" } else { "earliest date" };

        let (filled, shown) = if is_temporal_dtype(series.dtype()) {
            let millis = series_to_millis(series)?;
            let present = millis.iter().flatten().copied();
            let chosen = if pick_latest { present.max() } else { present.min() };
            let Some(chosen) = chosen else {
                return Ok(());
            };
            let values: Vec<Option<i64>> = millis.iter().map(|v| Some(v.unwrap_or(chosen))).collect();
            let filled = Series::new(name.as_str().into(), values)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(series.dtype())?;
            (filled, format_timestamp(chosen))
        } else {
            // Text dates are filled with the original text of the chosen cell.
            let text = series.str()?;
            let mut chosen: Option<(i64, &str)> = None;
            for value in text.into_iter().flatten() {
                let Some(ms) = parse_datetime_millis(value) else {
                    continue;
                };
                let better = match chosen {
                    None => true,
                    Some((best, _)) if pick_latest => ms > best,
                    Some((best, _)) => ms < best,
                };
                if better {
                    chosen = Some((ms, value));
                }
            }
            let Some((_, chosen)) = chosen else {
                return Ok(());
            };
            (fill_string_nulls(series, chosen)?, chosen.to_string())
        };

        df.replace(&name, filled)?;
        log.info(format!(
            "Filled {} missing values in '{}' with {}: {}",
            series.null_count(),
            name,
            method,
            shown
        ));
        Ok(())
    }
}
