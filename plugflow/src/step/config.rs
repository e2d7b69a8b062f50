//! Per-step configuration.

use super::StepCondition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default per-attempt deadline for a step.
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;

/// Configuration for one step of a pipeline.
///
/// The `config` map is merged over the envelope's metadata before each
/// plugin invocation, so the same plugin can behave differently per step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStepConfig {
    /// Id of the plugin to invoke.
    pub plugin_id: String,

    /// Step-local parameters, overriding envelope metadata for this step.
    #[serde(default)]
    pub config: HashMap<String, String>,

    /// Per-attempt deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of retries after the first failed attempt.
    #[serde(default)]
    pub retry_count: u32,

    /// Continue the pipeline when this step fails, leaving the envelope
    /// unchanged.
    #[serde(default)]
    pub skip_on_error: bool,

    /// Optional branch condition. `None` behaves like
    /// [`StepCondition::Always`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<StepCondition>,
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_STEP_TIMEOUT_MS
}

impl PipelineStepConfig {
    /// Creates a step config with defaults for everything but the plugin id.
    #[must_use]
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            config: HashMap::new(),
            timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            retry_count: 0,
            skip_on_error: false,
            condition: None,
        }
    }

    /// Replaces the step-local parameter map.
    #[must_use]
    pub fn with_config(mut self, config: HashMap<String, String>) -> Self {
        self.config = config;
        self
    }

    /// Adds a single step-local parameter.
    #[must_use]
    pub fn with_config_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Sets the per-attempt deadline.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the retry count.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets whether a failure of this step aborts the run.
    #[must_use]
    pub fn with_skip_on_error(mut self, skip_on_error: bool) -> Self {
        self.skip_on_error = skip_on_error;
        self
    }

    /// Sets the branch condition.
    #[must_use]
    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Total number of attempts the engine will make.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retry_count + 1
    }
}
