//! Durable execution bookkeeping for one pipeline run.

use crate::core::{PipelineStatus, StepStatus};
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// The recorded outcome of one executed (or skipped) step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    /// Zero-based step index.
    pub step_index: usize,
    /// The plugin the step was configured with.
    pub plugin_id: String,
    /// The step outcome.
    pub status: StepStatus,
    /// When the step started.
    pub started_at: Timestamp,
    /// When the step finished.
    pub completed_at: Timestamp,
    /// Error message for failures, or the skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StepExecutionResult {
    /// Records a successful step.
    #[must_use]
    pub fn success(step_index: usize, plugin_id: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            step_index,
            plugin_id: plugin_id.into(),
            status: StepStatus::Success,
            started_at,
            completed_at: now_utc(),
            error_message: None,
        }
    }

    /// Records a skipped step, with the reason in `error_message`.
    #[must_use]
    pub fn skipped(
        step_index: usize,
        plugin_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let now = now_utc();
        Self {
            step_index,
            plugin_id: plugin_id.into(),
            status: StepStatus::Skipped,
            started_at: now,
            completed_at: now,
            error_message: Some(reason.into()),
        }
    }

    /// Records a failed or timed-out step.
    #[must_use]
    pub fn failed(
        step_index: usize,
        plugin_id: impl Into<String>,
        status: StepStatus,
        started_at: Timestamp,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            step_index,
            plugin_id: plugin_id.into(),
            status,
            started_at,
            completed_at: now_utc(),
            error_message: Some(error_message.into()),
        }
    }

    /// Wall-clock duration of the step in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

/// In-memory state of one pipeline run, tracked by the manager while the
/// run is in flight and discarded when it finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineExecutionState {
    /// The pipeline being executed.
    pub pipeline_id: String,
    /// Index of the step currently (or last) considered.
    pub current_step_index: usize,
    /// Number of configured steps.
    pub total_steps: usize,
    /// Run status.
    pub status: PipelineStatus,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// Recorded outcome of every considered step, in order.
    #[serde(default)]
    pub step_results: Vec<StepExecutionResult>,
}

impl PipelineExecutionState {
    /// Creates a pending state for a run about to start.
    #[must_use]
    pub fn new(pipeline_id: impl Into<String>, total_steps: usize) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            current_step_index: 0,
            total_steps,
            status: PipelineStatus::Pending,
            started_at: now_utc(),
            completed_at: None,
            step_results: Vec::new(),
        }
    }

    /// Marks the run as started.
    pub fn mark_running(&mut self) {
        self.status = PipelineStatus::Running;
        self.started_at = now_utc();
    }

    /// Marks the run as finished with a terminal status.
    pub fn mark_finished(&mut self, status: PipelineStatus) {
        self.status = status;
        self.completed_at = Some(now_utc());
    }

    /// The status of the most recently recorded step, if any.
    #[must_use]
    pub fn last_step_status(&self) -> Option<StepStatus> {
        self.step_results.last().map(|result| result.status)
    }
}
