//! # Plugflow
//!
//! A composable plugin pipeline engine.
//!
//! Plugflow chains independently-developed capability plugins
//! (translation, text-to-speech, AI text operations) into user-defined
//! pipelines that transform a single typed data envelope through
//! successive steps, with support for:
//!
//! - **Typed envelopes**: a closed data-type model flowing step to step
//! - **Per-step policy**: timeouts, immediate retries, conditional
//!   skipping, skip-on-error
//! - **Live progress**: a hot broadcast event stream per execution
//! - **Cooperative cancellation**: per-run tokens checked between steps
//! - **Concurrent orchestration**: a manager tracking in-flight runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plugflow::prelude::*;
//!
//! // Describe a pipeline
//! let definition = PluginPipelineDefinition::builder()
//!     .name("Translate & Read Aloud")
//!     .step(PipelineStepConfig::new("deepl").with_retry_count(1))
//!     .step(PipelineStepConfig::new("espeak").with_timeout_ms(5000))
//!     .input_type(PipelineDataType::Text)
//!     .output_type(PipelineDataType::Audio)
//!     .build()?;
//!
//! // Run it
//! let engine = PluginPipeline::new(definition, resolver);
//! let result = engine.execute(PipelineData::text("Hello"), CancellationToken::new()).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod definition;
pub mod errors;
pub mod events;
pub mod execution;
pub mod manager;
pub mod observability;
pub mod plugin;
pub mod repository;
pub mod step;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        PipelineData, PipelineDataType, PipelineResult, PipelineStatus, StepStatus,
    };
    pub use crate::definition::{PipelineDefinitionBuilder, PluginPipelineDefinition};
    pub use crate::errors::{
        ManagerError, PipelineError, PipelineValidationError, RepositoryError,
    };
    pub use crate::events::{EventBus, PipelineEvent};
    pub use crate::execution::{
        CancellationToken, PipelineExecutionState, PluginPipeline, StepExecutionResult,
    };
    pub use crate::manager::{builtin_templates, PipelineManager, PipelineTemplate, TemplateStep};
    pub use crate::plugin::{ComposablePlugin, PluginKind, PluginRegistry, PluginResolver};
    pub use crate::repository::{
        InMemoryPipelineRepository, JsonFilePipelineRepository, PipelineRepository,
    };
    pub use crate::step::{PipelineStepConfig, StepCondition};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
