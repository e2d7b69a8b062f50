//! Capability abstraction: the uniform contract plugins expose to the engine.

pub mod resolver;

pub use resolver::{PluginRegistry, PluginResolver};

use crate::core::{PipelineData, PipelineDataType, PipelineResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The capability a plugin provides.
///
/// Kinds are resolved once at registration time; templates reference kinds
/// rather than concrete plugin ids. Adding a capability is a
/// compile-time-checked extension of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Translates text between languages.
    Translation,
    /// Synthesizes speech from text.
    TextToSpeech,
    /// AI text operations (summarize, rewrite, analyze).
    AiText,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translation => write!(f, "translation"),
            Self::TextToSpeech => write!(f, "text_to_speech"),
            Self::AiText => write!(f, "ai_text"),
        }
    }
}

/// Uniform process/validate contract over a concrete plugin.
///
/// `process` is the only effectful operation; implementations may perform
/// I/O. An `Err` return is caught by the engine and converted to
/// [`PipelineError::PluginError`](crate::errors::PipelineError), so plugins
/// are free to use `?` internally.
#[async_trait]
pub trait ComposablePlugin: Send + Sync {
    /// Stable identifier used for lookup and error reporting.
    fn plugin_id(&self) -> &str;

    /// The capability this plugin provides.
    fn kind(&self) -> PluginKind;

    /// Transforms the input envelope.
    async fn process(&self, input: PipelineData) -> anyhow::Result<PipelineResult>;

    /// Pure predicate used for pre-invocation type validation.
    fn can_process(&self, input_type: PipelineDataType) -> bool;

    /// Declared static output type. Informational; not used to gate
    /// invocation.
    fn output_type(&self) -> PipelineDataType;
}
