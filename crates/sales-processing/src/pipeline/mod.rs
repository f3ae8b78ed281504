//! Pipeline module.
//!
//! This module provides the orchestrator that sequences loading, missing value
//! resolution, coercion, persistence, analysis and charting.

mod builder;
mod stages;

pub use builder::{Pipeline, PipelineBuilder, REPORT_FILE_NAME};
pub use stages::{PipelineStage, StageOutcome, StageStatus};

use crate::run_log::{RunLog, Severity};
use crate::types::AnalysisReport;
use polars::prelude::DataFrame;
use std::path::PathBuf;

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The cleaned and typed table.
    pub data: DataFrame,
    pub rows: usize,
    pub columns: usize,
    pub stage_outcomes: Vec<StageOutcome>,
    pub report: AnalysisReport,
    /// Files written during the run, in write order.
    pub written: Vec<PathBuf>,
    pub log: RunLog,
}

impl PipelineResult {
    /// Whether any data made it past loading.
    pub fn has_data(&self) -> bool {
        self.columns > 0
    }

    /// Total `[ERROR]` entries in the run log.
    pub fn error_count(&self) -> usize {
        self.log.count(Severity::Error)
    }
}
