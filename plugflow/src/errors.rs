//! Error types for the plugflow engine.

use crate::core::PipelineDataType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime errors produced while executing a pipeline.
///
/// These are values, not panics: they travel inside
/// [`PipelineResult::Error`](crate::core::PipelineResult) and inside
/// `Failed` events.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineError {
    /// The plugin raised an error or returned a failure.
    #[error("Plugin '{plugin_id}' failed: {message}")]
    PluginError {
        /// The failing plugin.
        plugin_id: String,
        /// The plugin's error message.
        message: String,
    },

    /// The plugin cannot process the current envelope type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The first type the plugin accepts.
        expected: PipelineDataType,
        /// The type the envelope actually carries.
        actual: PipelineDataType,
    },

    /// No plugin is registered under the configured id.
    #[error("Plugin not found: {plugin_id}")]
    PluginNotFound {
        /// The unresolvable plugin id.
        plugin_id: String,
    },

    /// The pipeline or template configuration is unusable.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Every attempt of a step hit its deadline.
    #[error("Step {step_index} timed out after {timeout_ms}ms")]
    Timeout {
        /// The step that timed out.
        step_index: usize,
        /// The per-attempt deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The run was cancelled before or during the step.
    #[error("Pipeline cancelled at step {step_index}")]
    Cancelled {
        /// The step at which cancellation took effect.
        step_index: usize,
    },
}

/// Error raised when a pipeline definition fails validation at build time.
///
/// This is a synchronous construction failure, distinct from the runtime
/// [`PipelineError`] taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
}

impl PipelineValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`PipelineRepository`](crate::repository::PipelineRepository)
/// implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A definition could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No definition is stored under the given id.
    #[error("Pipeline not found: {0}")]
    NotFound(String),

    /// Any other backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by [`PipelineManager`](crate::manager::PipelineManager)
/// operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The repository collaborator failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// No definition is known under the given id.
    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    /// An execution for the pipeline id is already in flight.
    #[error("Pipeline '{0}' already has an execution in flight")]
    AlreadyRunning(String),

    /// The definition failed validation when rebuilding the engine.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),
}
