//! Single-pipeline execution: engine, state records, cancellation.

pub mod cancellation;
pub mod engine;
pub mod state;

pub use cancellation::CancellationToken;
pub use engine::PluginPipeline;
pub use state::{PipelineExecutionState, StepExecutionResult};

#[cfg(test)]
mod integration_tests;
