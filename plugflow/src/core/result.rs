//! Step and pipeline outcome type.

use super::PipelineData;
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};

/// The outcome of a plugin invocation or of a whole pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineResult {
    /// The work completed and produced a new envelope.
    Success(PipelineData),

    /// The work failed. `partial_data` carries the last good envelope for
    /// diagnostics.
    Error {
        /// What went wrong.
        error: PipelineError,
        /// The envelope as it stood when the error occurred.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partial_data: Option<PipelineData>,
    },

    /// The plugin declined to process and handed the envelope through.
    Skipped {
        /// Why the plugin skipped.
        reason: String,
        /// The envelope to continue with.
        data: PipelineData,
    },
}

impl PipelineResult {
    /// Creates an error result with partial data.
    #[must_use]
    pub fn error(error: PipelineError, partial_data: Option<PipelineData>) -> Self {
        Self::Error {
            error,
            partial_data,
        }
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(reason: impl Into<String>, data: PipelineData) -> Self {
        Self::Skipped {
            reason: reason.into(),
            data,
        }
    }

    /// Returns true if this is a [`PipelineResult::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Best-effort data extraction across all variants.
    #[must_use]
    pub fn data(&self) -> Option<&PipelineData> {
        match self {
            Self::Success(data) | Self::Skipped { data, .. } => Some(data),
            Self::Error { partial_data, .. } => partial_data.as_ref(),
        }
    }

    /// Consumes the result, returning whatever data it carries.
    #[must_use]
    pub fn into_data(self) -> Option<PipelineData> {
        match self {
            Self::Success(data) | Self::Skipped { data, .. } => Some(data),
            Self::Error { partial_data, .. } => partial_data,
        }
    }

    /// Returns the error, if this is an error result.
    #[must_use]
    pub fn error_ref(&self) -> Option<&PipelineError> {
        match self {
            Self::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}
