//! Mock plugins for testing.

use crate::core::{PipelineData, PipelineDataType, PipelineResult};
use crate::events::PipelineEvent;
use crate::plugin::{ComposablePlugin, PluginKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

/// Behavior a [`MockPlugin`] is scripted with.
#[derive(Debug, Clone)]
enum Behavior {
    /// Echo the input envelope unchanged.
    Echo,
    /// Return a fixed result.
    Return(PipelineResult),
    /// Raise an error, as a plugin whose internals blew up would.
    Raise(String),
}

/// A mock plugin that records calls and returns a configurable outcome.
///
/// By default it echoes its input as a success.
pub struct MockPlugin {
    id: String,
    kind: PluginKind,
    accepts: Option<Vec<PipelineDataType>>,
    output_type: PipelineDataType,
    behavior: Mutex<Behavior>,
    call_count: Mutex<usize>,
    last_input: Mutex<Option<PipelineData>>,
}

impl MockPlugin {
    /// Creates an echoing mock plugin.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            id: id.into(),
            kind,
            accepts: None,
            output_type: PipelineDataType::Text,
            behavior: Mutex::new(Behavior::Echo),
            call_count: Mutex::new(0),
            last_input: Mutex::new(None),
        }
    }

    /// Restricts the envelope types the plugin accepts. Unrestricted
    /// plugins accept everything.
    #[must_use]
    pub fn with_accepts(mut self, accepts: Vec<PipelineDataType>) -> Self {
        self.accepts = Some(accepts);
        self
    }

    /// Sets the declared output type.
    #[must_use]
    pub fn with_output_type(mut self, output_type: PipelineDataType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Scripts the plugin to return a fixed result.
    pub fn set_result(&self, result: PipelineResult) {
        *self.behavior.lock() = Behavior::Return(result);
    }

    /// Scripts the plugin to raise an error.
    pub fn set_error(&self, message: impl Into<String>) {
        *self.behavior.lock() = Behavior::Raise(message.into());
    }

    /// Number of times `process` was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }

    /// The envelope most recently passed to `process`.
    #[must_use]
    pub fn last_input(&self) -> Option<PipelineData> {
        self.last_input.lock().clone()
    }
}

#[async_trait]
impl ComposablePlugin for MockPlugin {
    fn plugin_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PluginKind {
        self.kind
    }

    async fn process(&self, input: PipelineData) -> anyhow::Result<PipelineResult> {
        *self.call_count.lock() += 1;
        *self.last_input.lock() = Some(input.clone());

        match self.behavior.lock().clone() {
            Behavior::Echo => Ok(PipelineResult::Success(input)),
            Behavior::Return(result) => Ok(result),
            Behavior::Raise(message) => Err(anyhow::anyhow!(message)),
        }
    }

    fn can_process(&self, input_type: PipelineDataType) -> bool {
        self.accepts
            .as_ref()
            .map_or(true, |accepted| accepted.contains(&input_type))
    }

    fn output_type(&self) -> PipelineDataType {
        self.output_type
    }
}

/// A plugin that fails a fixed number of times, then succeeds with the
/// given envelope.
pub struct FlakyPlugin {
    id: String,
    failures_before_success: usize,
    success_data: PipelineData,
    call_count: Mutex<usize>,
}

impl FlakyPlugin {
    /// Creates a plugin that fails `failures_before_success` times.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        failures_before_success: usize,
        success_data: PipelineData,
    ) -> Self {
        Self {
            id: id.into(),
            failures_before_success,
            success_data,
            call_count: Mutex::new(0),
        }
    }

    /// Number of times `process` was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl ComposablePlugin for FlakyPlugin {
    fn plugin_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Translation
    }

    async fn process(&self, _input: PipelineData) -> anyhow::Result<PipelineResult> {
        let mut count = self.call_count.lock();
        *count += 1;
        if *count <= self.failures_before_success {
            anyhow::bail!("transient failure on attempt {}", *count);
        }
        Ok(PipelineResult::Success(self.success_data.clone()))
    }

    fn can_process(&self, _input_type: PipelineDataType) -> bool {
        true
    }

    fn output_type(&self) -> PipelineDataType {
        self.success_data.data_type
    }
}

/// A plugin that sleeps before echoing its input.
pub struct SlowPlugin {
    id: String,
    delay: Duration,
}

impl SlowPlugin {
    /// Creates a plugin that sleeps for `delay` on every call.
    #[must_use]
    pub fn new(id: impl Into<String>, delay: Duration) -> Self {
        Self {
            id: id.into(),
            delay,
        }
    }
}

#[async_trait]
impl ComposablePlugin for SlowPlugin {
    fn plugin_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PluginKind {
        PluginKind::AiText
    }

    async fn process(&self, input: PipelineData) -> anyhow::Result<PipelineResult> {
        tokio::time::sleep(self.delay).await;
        Ok(PipelineResult::Success(input))
    }

    fn can_process(&self, _input_type: PipelineDataType) -> bool {
        true
    }

    fn output_type(&self) -> PipelineDataType {
        PipelineDataType::Text
    }
}

/// A closure-backed plugin, for one-off behaviors in tests.
pub struct FnPlugin<F>
where
    F: Fn(PipelineData) -> anyhow::Result<PipelineResult> + Send + Sync,
{
    id: String,
    kind: PluginKind,
    func: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(PipelineData) -> anyhow::Result<PipelineResult> + Send + Sync,
{
    /// Creates a closure-backed plugin.
    pub fn new(id: impl Into<String>, kind: PluginKind, func: F) -> Self {
        Self {
            id: id.into(),
            kind,
            func,
        }
    }
}

#[async_trait]
impl<F> ComposablePlugin for FnPlugin<F>
where
    F: Fn(PipelineData) -> anyhow::Result<PipelineResult> + Send + Sync,
{
    fn plugin_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PluginKind {
        self.kind
    }

    async fn process(&self, input: PipelineData) -> anyhow::Result<PipelineResult> {
        (self.func)(input)
    }

    fn can_process(&self, _input_type: PipelineDataType) -> bool {
        true
    }

    fn output_type(&self) -> PipelineDataType {
        PipelineDataType::Text
    }
}

/// Drains every event already buffered on a subscription.
#[must_use]
pub fn drain_events(receiver: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
