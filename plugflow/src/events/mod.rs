//! Live progress events and the broadcast bus carrying them.

pub mod bus;

pub use bus::{EventBus, DEFAULT_EVENT_CAPACITY};

use crate::core::PipelineData;
use crate::errors::PipelineError;
use crate::execution::StepExecutionResult;
use serde::{Deserialize, Serialize};

/// Transient, non-persisted notification emitted during a pipeline run.
///
/// Events are a live telemetry channel, not a durable log; durable
/// post-hoc inspection goes through
/// [`PipelineExecutionState`](crate::execution::PipelineExecutionState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The run started.
    Started {
        /// Pipeline id.
        pipeline_id: String,
        /// Number of configured steps.
        total_steps: usize,
    },

    /// A step is about to invoke its plugin.
    StepStarted {
        /// Pipeline id.
        pipeline_id: String,
        /// Zero-based step index.
        step_index: usize,
        /// The plugin being invoked.
        plugin_id: String,
    },

    /// A step finished, in any non-aborting way; the payload carries the
    /// recorded outcome.
    StepCompleted {
        /// Pipeline id.
        pipeline_id: String,
        /// Zero-based step index.
        step_index: usize,
        /// The recorded step outcome.
        result: StepExecutionResult,
    },

    /// Incremental progress within a long-running step, for consumers
    /// that report partial completion. The engine itself only emits
    /// whole-step events; this variant is the channel for external
    /// progress reporters.
    StepProgress {
        /// Pipeline id.
        pipeline_id: String,
        /// Zero-based step index.
        step_index: usize,
        /// Completion fraction in `0.0..=1.0`.
        progress: f32,
        /// Optional human-readable progress message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The run finished successfully.
    Completed {
        /// Pipeline id.
        pipeline_id: String,
        /// The final envelope.
        data: PipelineData,
    },

    /// The run aborted with an error.
    Failed {
        /// Pipeline id.
        pipeline_id: String,
        /// The terminal error.
        error: PipelineError,
        /// The step at which the run aborted.
        step_index: usize,
    },

    /// The run was cancelled cooperatively.
    Cancelled {
        /// Pipeline id.
        pipeline_id: String,
        /// The step at which cancellation took effect.
        step_index: usize,
    },
}

impl PipelineEvent {
    /// The id of the pipeline the event belongs to.
    #[must_use]
    pub fn pipeline_id(&self) -> &str {
        match self {
            Self::Started { pipeline_id, .. }
            | Self::StepStarted { pipeline_id, .. }
            | Self::StepCompleted { pipeline_id, .. }
            | Self::StepProgress { pipeline_id, .. }
            | Self::Completed { pipeline_id, .. }
            | Self::Failed { pipeline_id, .. }
            | Self::Cancelled { pipeline_id, .. } => pipeline_id,
        }
    }

    /// A short label for the event variant, for logging and filtering.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::StepProgress { .. } => "step_progress",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Returns true for events that end the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}
