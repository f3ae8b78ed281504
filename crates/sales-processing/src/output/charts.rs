//! Raster chart rendering.
//!
//! Charts are drawn into an in-memory RGB buffer so that rendering and
//! persisting stay separate steps. Captions and axis labels are only drawn
//! when the `chart-text` feature provides a font backend.

use crate::error::{PipelineError, Result};
use crate::utils::{
    is_numeric_dtype, is_temporal_dtype, series_to_f64, series_to_millis, series_to_strings,
    sorted_non_null,
};
use plotters::prelude::*;
use polars::prelude::*;
use std::fmt::Display;
use tracing::debug;

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 600;

const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);
const LINE_COLOR: RGBColor = RGBColor(205, 92, 92);

/// A rendered chart as tightly packed RGB pixels.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// One histogram bucket, `[start, end)` except for the last which includes `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

fn chart_err(e: impl Display) -> PipelineError {
    PipelineError::ChartRendering(e.to_string())
}

fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(column)
        .map_err(|_| PipelineError::ColumnNotFound(column.to_string()))?
        .as_materialized_series();
    if !is_numeric_dtype(series.dtype()) {
        return Err(PipelineError::NotNumeric(column.to_string()));
    }
    Ok(series_to_f64(series)?)
}

/// Mean of each category in order of first appearance, skipping incomplete rows.
pub(crate) fn category_means(df: &DataFrame, x: &str, y: &str) -> Result<Vec<(String, f64)>> {
    let labels = series_to_strings(
        df.column(x)
            .map_err(|_| PipelineError::ColumnNotFound(x.to_string()))?
            .as_materialized_series(),
    )?;
    let values = numeric_values(df, y)?;

    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    for (label, value) in labels.into_iter().zip(values) {
        let (Some(label), Some(value)) = (label, value) else {
            continue;
        };
        match groups.iter_mut().find(|(name, _, _)| *name == label) {
            Some((_, sum, n)) => {
                *sum += value;
                *n += 1;
            }
            None => groups.push((label, value, 1)),
        }
    }

    Ok(groups
        .into_iter()
        .map(|(label, sum, n)| (label, sum / n as f64))
        .collect())
}

/// Points with both coordinates present, sorted by x.
pub(crate) fn line_points(df: &DataFrame, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
    let x_series = df
        .column(x)
        .map_err(|_| PipelineError::ColumnNotFound(x.to_string()))?
        .as_materialized_series();

    let xs: Vec<Option<f64>> = if is_temporal_dtype(x_series.dtype()) {
        series_to_millis(x_series)?
            .into_iter()
            .map(|v| v.map(|ms| ms as f64))
            .collect()
    } else if is_numeric_dtype(x_series.dtype()) {
        series_to_f64(x_series)?
    } else {
        return Err(PipelineError::NotNumeric(x.to_string()));
    };
    let ys = numeric_values(df, y)?;

    let mut points: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
        .collect();
    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(points)
}

/// Equal-width buckets over sorted values.
pub(crate) fn build_histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    if sorted.is_empty() {
        return Vec::new();
    }

    let min = sorted.first().copied().unwrap_or(0.0);
    let max = sorted.last().copied().unwrap_or(min);
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: sorted.len(),
        }];
    }

    let bin_count = bins.max(1);
    let width = (max - min) / bin_count as f64;
    let mut counts = vec![0usize; bin_count];

    for value in sorted {
        let index = (((value - min) / width) as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: min + idx as f64 * width,
            end: min + (idx as f64 + 1.0) * width,
            count,
        })
        .collect()
}

/// Value range padded so flat data still gets a visible extent.
fn padded_range(min: f64, max: f64) -> std::ops::Range<f64> {
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0)..(max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad)..(max + pad)
    }
}

fn chart_builder<'a, 'b, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, plotters::coord::Shift>,
    title: &str,
) -> ChartBuilder<'a, 'b, DB> {
    let mut builder = ChartBuilder::on(root);
    builder.margin(20);
    #[cfg(feature = "chart-text")]
    builder
        .caption(title, ("sans-serif", 24))
        .x_label_area_size(40)
        .y_label_area_size(60);
    #[cfg(not(feature = "chart-text"))]
    let _ = title;
    builder
}

/// Bar chart of the mean of `y` for each value of `x`.
pub fn render_bar(df: &DataFrame, x: &str, y: &str) -> Result<ChartImage> {
    let means = category_means(df, x, y)?;
    if means.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "no complete rows for '{}' by '{}'",
            y, x
        )));
    }

    let title = format!("Average {} by {}", y, x);
    let lowest = means.iter().map(|(_, v)| *v).fold(0.0, f64::min);
    let highest = means.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_range = padded_range(lowest, highest);

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = chart_builder(&root, &title)
            .build_cartesian_2d(0f64..means.len() as f64, y_range)
            .map_err(chart_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh();
        #[cfg(not(feature = "chart-text"))]
        mesh.x_labels(0).y_labels(0);
        mesh.draw().map_err(chart_err)?;

        chart
            .draw_series(means.iter().enumerate().map(|(idx, (_, value))| {
                let left = idx as f64 + 0.1;
                let right = idx as f64 + 0.9;
                Rectangle::new([(left, 0.0), (right, *value)], BAR_COLOR.filled())
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    debug!("Rendered bar chart with {} categories", means.len());
    Ok(ChartImage {
        title,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        pixels,
    })
}

/// Line chart of `y` against a numeric or datetime `x`.
pub fn render_line(df: &DataFrame, x: &str, y: &str) -> Result<ChartImage> {
    let points = line_points(df, x, y)?;
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(PipelineError::InsufficientData(format!(
            "no complete rows for '{}' over '{}'",
            y, x
        )));
    };

    let title = format!("{} over {}", y, x);
    let x_range = padded_range(first.0, last.0);
    let lowest = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let highest = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let y_range = padded_range(lowest, highest);

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = chart_builder(&root, &title)
            .build_cartesian_2d(x_range, y_range)
            .map_err(chart_err)?;

        let mut mesh = chart.configure_mesh();
        #[cfg(not(feature = "chart-text"))]
        mesh.x_labels(0).y_labels(0);
        mesh.draw().map_err(chart_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &LINE_COLOR))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    debug!("Rendered line chart with {} points", points.len());
    Ok(ChartImage {
        title,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        pixels,
    })
}

/// Histogram of one numeric column.
pub fn render_histogram(df: &DataFrame, column: &str, bins: usize) -> Result<ChartImage> {
    let sorted = sorted_non_null(&numeric_values(df, column)?);
    let buckets = build_histogram(&sorted, bins);
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return Err(PipelineError::InsufficientData(format!(
            "'{}' has no values to plot",
            column
        )));
    };

    let title = format!("Distribution of {}", column);
    let x_range = padded_range(first.start, last.end);
    let tallest = buckets.iter().map(|b| b.count).max().unwrap_or(1) as f64;

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = chart_builder(&root, &title)
            .build_cartesian_2d(x_range, 0f64..tallest * 1.05)
            .map_err(chart_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh();
        #[cfg(not(feature = "chart-text"))]
        mesh.x_labels(0).y_labels(0);
        mesh.draw().map_err(chart_err)?;

        chart
            .draw_series(buckets.iter().map(|b| {
                Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], BAR_COLOR.filled())
            }))
            .map_err(chart_err)?;
        chart
            .draw_series(buckets.iter().map(|b| {
                Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    debug!("Rendered histogram of '{}' with {} bins", column, buckets.len());
    Ok(ChartImage {
        title,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        pixels,
    })
}
