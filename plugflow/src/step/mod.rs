//! Declarative per-step policy: plugin selection, timeout, retries, skipping.

pub mod condition;
pub mod config;

pub use condition::StepCondition;
pub use config::{PipelineStepConfig, DEFAULT_STEP_TIMEOUT_MS};
