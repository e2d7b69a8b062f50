//! The single-pipeline execution engine.

use crate::core::{PipelineData, PipelineDataType, PipelineResult, PipelineStatus, StepStatus};
use crate::definition::PluginPipelineDefinition;
use crate::errors::PipelineError;
use crate::events::{EventBus, PipelineEvent};
use crate::execution::{CancellationToken, PipelineExecutionState, StepExecutionResult};
use crate::plugin::{ComposablePlugin, PluginResolver};
use crate::step::PipelineStepConfig;
use crate::utils::now_utc;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Outcome of one step after the retry loop.
enum StepOutcome {
    Success(PipelineData),
    PluginSkipped { reason: String, data: PipelineData },
    Cancelled,
    Failed(PipelineError),
}

/// Executes one pipeline run: iterates the definition's steps, applying
/// timeout/retry/condition/skip policy, emitting a live event stream, and
/// honoring cooperative cancellation.
///
/// An engine instance is ephemeral - built per execution request and
/// discarded after the run. Re-executing a definition means building a
/// fresh engine.
pub struct PluginPipeline {
    definition: PluginPipelineDefinition,
    resolver: Arc<dyn PluginResolver>,
    events: EventBus,
    state: Arc<RwLock<PipelineExecutionState>>,
}

impl PluginPipeline {
    /// Creates an engine for one run of the given definition.
    #[must_use]
    pub fn new(definition: PluginPipelineDefinition, resolver: Arc<dyn PluginResolver>) -> Self {
        let state = PipelineExecutionState::new(&definition.id, definition.steps.len());
        Self {
            definition,
            resolver,
            events: EventBus::default(),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// The definition this engine will run.
    #[must_use]
    pub fn definition(&self) -> &PluginPipelineDefinition {
        &self.definition
    }

    /// Attaches a subscriber to the live event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Shared handle to the run's execution state, updated live.
    #[must_use]
    pub fn state_handle(&self) -> Arc<RwLock<PipelineExecutionState>> {
        Arc::clone(&self.state)
    }

    /// A snapshot of the current execution state.
    #[must_use]
    pub fn execution_state(&self) -> PipelineExecutionState {
        self.state.read().clone()
    }

    /// Runs the pipeline over `input`, strictly sequentially.
    ///
    /// Returns the terminal [`PipelineResult`]; progress is mirrored on
    /// the event stream and in the execution state. The `token` is checked
    /// at the top of every step and after every attempt; cancellation
    /// never interrupts a plugin call in flight.
    pub async fn execute(&self, input: PipelineData, token: CancellationToken) -> PipelineResult {
        let pipeline_id = self.definition.id.clone();
        let total_steps = self.definition.steps.len();

        self.state.write().mark_running();
        tracing::info!(pipeline_id = %pipeline_id, total_steps, "Pipeline started");
        self.events.emit(PipelineEvent::Started {
            pipeline_id: pipeline_id.clone(),
            total_steps,
        });

        let mut current_data = input;

        for (index, step) in self.definition.steps.iter().enumerate() {
            self.state.write().current_step_index = index;

            if token.is_cancelled() {
                return self.cancel_run(index, current_data);
            }

            let previous = self.state.read().last_step_status();
            let should_run = step
                .condition
                .as_ref()
                .map_or(true, |condition| condition.should_run(previous, &current_data));
            if !should_run {
                tracing::debug!(
                    pipeline_id = %pipeline_id,
                    step_index = index,
                    plugin_id = %step.plugin_id,
                    "Step condition not met, skipping"
                );
                self.record(StepExecutionResult::skipped(
                    index,
                    &step.plugin_id,
                    "Condition not met",
                ));
                continue;
            }

            self.events.emit(PipelineEvent::StepStarted {
                pipeline_id: pipeline_id.clone(),
                step_index: index,
                plugin_id: step.plugin_id.clone(),
            });

            // A missing plugin is fatal regardless of skip_on_error.
            let Some(plugin) = self.resolver.resolve(&step.plugin_id) else {
                let error = PipelineError::PluginNotFound {
                    plugin_id: step.plugin_id.clone(),
                };
                let result = StepExecutionResult::failed(
                    index,
                    &step.plugin_id,
                    StepStatus::Failed,
                    now_utc(),
                    error.to_string(),
                );
                return self.fail_run(result, error, current_data);
            };

            if !plugin.can_process(current_data.data_type) {
                if step.skip_on_error {
                    let result = StepExecutionResult::skipped(
                        index,
                        &step.plugin_id,
                        format!(
                            "Type mismatch: plugin cannot process {}",
                            current_data.data_type
                        ),
                    );
                    self.record(result.clone());
                    self.events.emit(PipelineEvent::StepCompleted {
                        pipeline_id: pipeline_id.clone(),
                        step_index: index,
                        result,
                    });
                    continue;
                }

                let error = PipelineError::TypeMismatch {
                    expected: expected_input_type(plugin.as_ref(), current_data.data_type),
                    actual: current_data.data_type,
                };
                let result = StepExecutionResult::failed(
                    index,
                    &step.plugin_id,
                    StepStatus::Failed,
                    now_utc(),
                    error.to_string(),
                );
                return self.fail_run(result, error, current_data);
            }

            let started_at = now_utc();
            match self
                .run_with_retry(index, step, plugin.as_ref(), &current_data, &token)
                .await
            {
                StepOutcome::Success(data) => {
                    let result = StepExecutionResult::success(index, &step.plugin_id, started_at);
                    tracing::debug!(
                        pipeline_id = %pipeline_id,
                        step_index = index,
                        plugin_id = %step.plugin_id,
                        duration_ms = result.duration_ms(),
                        "Step completed"
                    );
                    self.record(result.clone());
                    self.events.emit(PipelineEvent::StepCompleted {
                        pipeline_id: pipeline_id.clone(),
                        step_index: index,
                        result,
                    });
                    current_data = data;
                }
                StepOutcome::PluginSkipped { reason, data } => {
                    // Unlike a config-level skip, a plugin-level skip does
                    // update the envelope.
                    let result = StepExecutionResult::skipped(index, &step.plugin_id, reason);
                    self.record(result.clone());
                    self.events.emit(PipelineEvent::StepCompleted {
                        pipeline_id: pipeline_id.clone(),
                        step_index: index,
                        result,
                    });
                    current_data = data;
                }
                StepOutcome::Cancelled => {
                    return self.cancel_run(index, current_data);
                }
                StepOutcome::Failed(error) => {
                    let status = match error {
                        PipelineError::Timeout { .. } => StepStatus::Timeout,
                        _ => StepStatus::Failed,
                    };
                    let result = StepExecutionResult::failed(
                        index,
                        &step.plugin_id,
                        status,
                        started_at,
                        error.to_string(),
                    );

                    if step.skip_on_error {
                        tracing::warn!(
                            pipeline_id = %pipeline_id,
                            step_index = index,
                            plugin_id = %step.plugin_id,
                            error = %error,
                            "Step failed, continuing (skip_on_error)"
                        );
                        self.record(result.clone());
                        self.events.emit(PipelineEvent::StepCompleted {
                            pipeline_id: pipeline_id.clone(),
                            step_index: index,
                            result,
                        });
                        // The failed step's partial output is discarded;
                        // the envelope continues unchanged.
                        continue;
                    }

                    return self.fail_run(result, error, current_data);
                }
            }
        }

        self.state.write().mark_finished(PipelineStatus::Completed);
        tracing::info!(pipeline_id = %pipeline_id, "Pipeline completed");
        self.events.emit(PipelineEvent::Completed {
            pipeline_id,
            data: current_data.clone(),
        });
        PipelineResult::Success(current_data)
    }

    /// Records the cancelled terminal state and returns the terminal
    /// result.
    fn cancel_run(&self, step_index: usize, current_data: PipelineData) -> PipelineResult {
        self.state.write().mark_finished(PipelineStatus::Cancelled);
        tracing::warn!(
            pipeline_id = %self.definition.id,
            step_index,
            "Pipeline cancelled"
        );
        self.events.emit(PipelineEvent::Cancelled {
            pipeline_id: self.definition.id.clone(),
            step_index,
        });
        PipelineResult::error(
            PipelineError::Cancelled { step_index },
            Some(current_data),
        )
    }

    fn fail_run(
        &self,
        result: StepExecutionResult,
        error: PipelineError,
        current_data: PipelineData,
    ) -> PipelineResult {
        let step_index = result.step_index;
        self.record(result);
        self.state.write().mark_finished(PipelineStatus::Failed);
        tracing::error!(
            pipeline_id = %self.definition.id,
            step_index,
            error = %error,
            "Pipeline failed"
        );
        self.events.emit(PipelineEvent::Failed {
            pipeline_id: self.definition.id.clone(),
            error: error.clone(),
            step_index,
        });
        PipelineResult::error(error, Some(current_data))
    }

    fn record(&self, result: StepExecutionResult) {
        self.state.write().step_results.push(result);
    }

    /// Runs one step with up to `retry_count + 1` attempts, each under the
    /// step's deadline. Retries are immediate.
    async fn run_with_retry(
        &self,
        step_index: usize,
        step: &PipelineStepConfig,
        plugin: &dyn ComposablePlugin,
        data: &PipelineData,
        token: &CancellationToken,
    ) -> StepOutcome {
        let max_attempts = step.max_attempts();
        let deadline = Duration::from_millis(step.timeout_ms);
        let mut last_error: Option<PipelineError> = None;

        for attempt in 1..=max_attempts {
            let step_input = data.clone().with_config_overrides(&step.config);

            match tokio::time::timeout(deadline, plugin.process(step_input)).await {
                Ok(Ok(PipelineResult::Success(output))) => {
                    return StepOutcome::Success(output);
                }
                Ok(Ok(PipelineResult::Skipped { reason, data })) => {
                    return StepOutcome::PluginSkipped { reason, data };
                }
                Ok(Ok(PipelineResult::Error { error, .. })) => {
                    last_error = Some(error);
                }
                Ok(Err(raised)) => {
                    last_error = Some(PipelineError::PluginError {
                        plugin_id: step.plugin_id.clone(),
                        message: raised.to_string(),
                    });
                }
                Err(_elapsed) => {
                    last_error = Some(PipelineError::Timeout {
                        step_index,
                        timeout_ms: step.timeout_ms,
                    });
                }
            }

            // A cancellation observed on the failure path aborts
            // immediately, regardless of remaining attempts.
            if token.is_cancelled() {
                return StepOutcome::Cancelled;
            }

            if attempt < max_attempts {
                tracing::warn!(
                    pipeline_id = %self.definition.id,
                    step_index,
                    plugin_id = %step.plugin_id,
                    attempt,
                    max_attempts,
                    "Step attempt failed, retrying"
                );
            }
        }

        StepOutcome::Failed(last_error.unwrap_or_else(|| PipelineError::ConfigurationError(
            format!("Step {step_index} made no attempts"),
        )))
    }
}

/// Derives the "expected" side of a type mismatch by probing the closed
/// type table for the first type the plugin accepts.
fn expected_input_type(plugin: &dyn ComposablePlugin, actual: PipelineDataType) -> PipelineDataType {
    PipelineDataType::ALL
        .iter()
        .copied()
        .find(|candidate| plugin.can_process(*candidate))
        .unwrap_or(actual)
}
