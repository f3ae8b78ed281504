//! Pipeline stages and per-stage outcome tracking.

use crate::run_log::{RunLog, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stages of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the source into a table
    Loading,
    /// First missing value pass
    Resolving,
    /// Column coercion followed by a second missing value pass
    Coercing,
    /// Writing the cleaned table
    Saving,
    /// Overview, summary, correlation and outlier statistics
    Analysis,
    /// Rendering and saving charts
    Charts,
    /// Writing the run log
    LogFlush,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Resolving => "Resolving Missing Values",
            Self::Coercing => "Coercing Column Types",
            Self::Saving => "Saving Cleaned Data",
            Self::Analysis => "Analyzing Data",
            Self::Charts => "Rendering Charts",
            Self::LogFlush => "Saving Run Log",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    CompletedWithErrors,
    Skipped,
}

/// What happened in one stage, measured from the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: PipelineStage,
    pub status: StageStatus,
    pub warnings: usize,
    pub errors: usize,
}

/// Collects stage outcomes by diffing run log severity counts.
#[derive(Debug, Default)]
pub(crate) struct StageTracker {
    outcomes: Vec<StageOutcome>,
}

impl StageTracker {
    /// Run one stage, announcing it in the log and recording its outcome.
    pub(crate) fn run<T>(
        &mut self,
        stage: PipelineStage,
        log: &mut RunLog,
        body: impl FnOnce(&mut RunLog) -> T,
    ) -> T {
        log.plain(format!("=== {} ===", stage.display_name()));
        let warnings_before = log.count(Severity::Warn);
        let errors_before = log.count(Severity::Error);

        let value = body(log);

        let warnings = log.count(Severity::Warn) - warnings_before;
        let errors = log.count(Severity::Error) - errors_before;
        let status = if errors > 0 {
            StageStatus::CompletedWithErrors
        } else {
            StageStatus::Completed
        };
        debug!("Stage {:?} finished: {:?}", stage, status);
        self.outcomes.push(StageOutcome {
            stage,
            status,
            warnings,
            errors,
        });
        value
    }

    /// Record a stage that did not run.
    pub(crate) fn skip(&mut self, stage: PipelineStage) {
        debug!("Stage {:?} skipped", stage);
        self.outcomes.push(StageOutcome {
            stage,
            status: StageStatus::Skipped,
            warnings: 0,
            errors: 0,
        });
    }

    pub(crate) fn into_outcomes(self) -> Vec<StageOutcome> {
        self.outcomes
    }
}
