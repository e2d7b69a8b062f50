//! Pipeline and step status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of one pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Execution has been created but not started.
    Pending,
    /// Execution is in progress.
    Running,
    /// All steps finished and the run produced a final envelope.
    Completed,
    /// The run aborted with an error.
    Failed,
    /// The run was cancelled cooperatively.
    Cancelled,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl PipelineStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The recorded outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step produced a new envelope.
    Success,
    /// The step failed after exhausting its attempts.
    Failed,
    /// The step did not run, or the plugin declined to process.
    Skipped,
    /// Every attempt hit its deadline.
    Timeout,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

impl StepStatus {
    /// Returns true if the step did not complete its work.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }
}
