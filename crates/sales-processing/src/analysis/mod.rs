//! Statistics engine.
//!
//! Read-only analysis of a cleaned table. Each operation appends its findings
//! to the run log and returns a serializable report, or `None` when the
//! inputs do not allow one.

mod correlation;
mod outliers;
mod summary;

pub use correlation::{TREND_BANDS, classify_trend, correlation_analysis};
pub use outliers::{IQR_MULTIPLIER, MAX_SAMPLES, detect_outliers};
pub use summary::{dataset_overview, missing_report, summary_statistics};
