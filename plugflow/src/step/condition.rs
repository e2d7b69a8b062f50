//! Branch conditions deciding whether a step runs.

use crate::core::{PipelineData, PipelineDataType, StepStatus};
use serde::{Deserialize, Serialize};

/// Condition evaluated before a step runs.
///
/// The evaluator sees the previous step's recorded status and the current
/// envelope. A condition that is not met skips the step without touching
/// the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCondition {
    /// Run unconditionally.
    Always,

    /// Run only if the previous step succeeded. With no previous step the
    /// condition is vacuously satisfied.
    OnSuccess,

    /// Run only if the previous step failed (including timeout).
    OnError,

    /// Run only if the envelope metadata contains `key` with exactly
    /// `value`.
    MetadataEquals {
        /// The metadata key to look up.
        key: String,
        /// The value the key must hold.
        value: String,
    },

    /// Run only if the envelope currently carries the given type.
    DataTypeIs(PipelineDataType),
}

impl StepCondition {
    /// Decides whether the guarded step should run.
    #[must_use]
    pub fn should_run(&self, previous: Option<StepStatus>, data: &PipelineData) -> bool {
        match self {
            Self::Always => true,
            Self::OnSuccess => previous.map_or(true, |status| status == StepStatus::Success),
            Self::OnError => previous.map_or(false, |status| status.is_failure()),
            Self::MetadataEquals { key, value } => data.metadata.get(key) == Some(value),
            Self::DataTypeIs(data_type) => data.data_type == *data_type,
        }
    }
}
