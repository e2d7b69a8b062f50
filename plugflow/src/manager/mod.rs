//! Multi-pipeline orchestration: definition CRUD and concurrent execution
//! tracking.

pub mod templates;

pub use templates::{builtin_templates, PipelineTemplate, TemplateStep};

use crate::core::{PipelineData, PipelineResult, PipelineStatus};
use crate::definition::{PipelineDefinitionBuilder, PluginPipelineDefinition};
use crate::errors::ManagerError;
use crate::events::PipelineEvent;
use crate::execution::{CancellationToken, PipelineExecutionState, PluginPipeline};
use crate::plugin::PluginResolver;
use crate::repository::PipelineRepository;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A run currently in flight: its live state and the handle to cancel it.
struct ActiveExecution {
    state: Arc<RwLock<PipelineExecutionState>>,
    token: CancellationToken,
}

/// Owns the set of known pipeline definitions and tracks concurrently
/// running executions.
///
/// Definitions are published as immutable snapshots and replaced whole
/// under a lock, so concurrent CRUD and execution bookkeeping cannot lose
/// updates.
pub struct PipelineManager {
    repository: Arc<dyn PipelineRepository>,
    resolver: Arc<dyn PluginResolver>,
    pipelines: RwLock<Arc<Vec<PluginPipelineDefinition>>>,
    active: Arc<Mutex<HashMap<String, ActiveExecution>>>,
}

impl PipelineManager {
    /// Creates a manager over the given repository and resolver.
    #[must_use]
    pub fn new(repository: Arc<dyn PipelineRepository>, resolver: Arc<dyn PluginResolver>) -> Self {
        Self {
            repository,
            resolver,
            pipelines: RwLock::new(Arc::new(Vec::new())),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Hydrates the in-memory definition list from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Repository`] if the repository fails.
    pub async fn load_pipelines(&self) -> Result<usize, ManagerError> {
        let definitions = self.repository.get_all_pipelines().await?;
        let count = definitions.len();
        *self.pipelines.write() = Arc::new(definitions);
        tracing::info!(count, "Loaded pipeline definitions");
        Ok(count)
    }

    /// A snapshot of the known definitions.
    #[must_use]
    pub fn pipelines(&self) -> Arc<Vec<PluginPipelineDefinition>> {
        Arc::clone(&self.pipelines.read())
    }

    /// Looks up one definition by id.
    #[must_use]
    pub fn get_pipeline(&self, pipeline_id: &str) -> Option<PluginPipelineDefinition> {
        self.pipelines
            .read()
            .iter()
            .find(|definition| definition.id == pipeline_id)
            .cloned()
    }

    /// Persists a new definition and adds it to the in-memory list.
    ///
    /// # Errors
    ///
    /// Repository failures surface as [`ManagerError::Repository`]; the
    /// in-memory list is left untouched.
    pub async fn create_pipeline(
        &self,
        definition: PluginPipelineDefinition,
    ) -> Result<PluginPipelineDefinition, ManagerError> {
        self.repository.save_pipeline(&definition).await?;
        self.upsert_local(definition.clone());
        tracing::info!(pipeline_id = %definition.id, name = %definition.name, "Created pipeline");
        Ok(definition)
    }

    /// Persists changes to an existing definition.
    ///
    /// # Errors
    ///
    /// Fails with [`ManagerError::PipelineNotFound`] for unknown ids and
    /// [`ManagerError::Repository`] on persistence failures.
    pub async fn update_pipeline(
        &self,
        mut definition: PluginPipelineDefinition,
    ) -> Result<PluginPipelineDefinition, ManagerError> {
        if self.get_pipeline(&definition.id).is_none() {
            return Err(ManagerError::PipelineNotFound(definition.id));
        }
        definition.touch();
        self.repository.save_pipeline(&definition).await?;
        self.upsert_local(definition.clone());
        tracing::info!(pipeline_id = %definition.id, "Updated pipeline");
        Ok(definition)
    }

    /// Deletes a definition from the repository and the in-memory list.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Repository`] if the repository fails.
    pub async fn delete_pipeline(&self, pipeline_id: &str) -> Result<(), ManagerError> {
        self.repository.delete_pipeline(pipeline_id).await?;
        {
            let mut guard = self.pipelines.write();
            let mut next = (**guard).clone();
            next.retain(|definition| definition.id != pipeline_id);
            *guard = Arc::new(next);
        }
        tracing::info!(pipeline_id, "Deleted pipeline");
        Ok(())
    }

    /// Returns publicly shared definitions from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Repository`] if the repository fails.
    pub async fn public_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, ManagerError> {
        Ok(self.repository.get_public_pipelines().await?)
    }

    /// Returns definitions by the given author from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Repository`] if the repository fails.
    pub async fn pipelines_by_author(
        &self,
        author_id: &str,
    ) -> Result<Vec<PluginPipelineDefinition>, ManagerError> {
        Ok(self.repository.get_pipelines_by_author(author_id).await?)
    }

    /// Launches a stored pipeline over `input`.
    ///
    /// The run executes as a background task; the returned receiver is
    /// attached before the run starts, so it observes the full event
    /// stream.
    ///
    /// # Errors
    ///
    /// Fails with [`ManagerError::PipelineNotFound`] for unknown ids and
    /// [`ManagerError::AlreadyRunning`] when an execution for the id is
    /// still in flight.
    pub fn execute_pipeline(
        &self,
        pipeline_id: &str,
        input: PipelineData,
    ) -> Result<broadcast::Receiver<PipelineEvent>, ManagerError> {
        let definition = self
            .get_pipeline(pipeline_id)
            .ok_or_else(|| ManagerError::PipelineNotFound(pipeline_id.to_string()))?;
        self.execute_definition(definition, input)
    }

    /// Launches an ad-hoc definition over `input`.
    ///
    /// The definition is rebuilt through the builder so stored data
    /// re-validates before the engine runs.
    ///
    /// # Errors
    ///
    /// Fails with [`ManagerError::Validation`] when the definition no
    /// longer validates and [`ManagerError::AlreadyRunning`] when an
    /// execution for its id is still in flight.
    pub fn execute_definition(
        &self,
        definition: PluginPipelineDefinition,
        input: PipelineData,
    ) -> Result<broadcast::Receiver<PipelineEvent>, ManagerError> {
        let definition = PipelineDefinitionBuilder::from_definition(definition).build()?;
        let pipeline_id = definition.id.clone();

        let engine = PluginPipeline::new(definition, Arc::clone(&self.resolver));
        let events = engine.subscribe();
        let token = CancellationToken::new();

        {
            let mut active = self.active.lock();
            if active.contains_key(&pipeline_id) {
                return Err(ManagerError::AlreadyRunning(pipeline_id));
            }
            // Tracked as running before the task starts.
            let state = engine.state_handle();
            state.write().mark_running();
            active.insert(
                pipeline_id.clone(),
                ActiveExecution {
                    state,
                    token: token.clone(),
                },
            );
        }

        tracing::info!(pipeline_id = %pipeline_id, "Launching pipeline execution");

        let active = Arc::clone(&self.active);
        let id = pipeline_id;
        tokio::spawn(async move {
            let result = engine.execute(input, token).await;
            match &result {
                PipelineResult::Success(_) => {
                    tracing::info!(pipeline_id = %id, "Pipeline execution finished");
                }
                PipelineResult::Error { error, .. } => {
                    tracing::warn!(pipeline_id = %id, error = %error, "Pipeline execution failed");
                }
                PipelineResult::Skipped { reason, .. } => {
                    tracing::info!(pipeline_id = %id, reason = %reason, "Pipeline execution skipped");
                }
            }
            active.lock().remove(&id);
        });

        Ok(events)
    }

    /// Cancels a running execution: marks its tracked state and cancels
    /// the engine's token. Returns false when no execution is in flight
    /// for the id.
    pub fn cancel_pipeline(&self, pipeline_id: &str) -> bool {
        let active = self.active.lock();
        let Some(execution) = active.get(pipeline_id) else {
            return false;
        };
        execution.token.cancel("Cancelled via manager");
        execution
            .state
            .write()
            .mark_finished(PipelineStatus::Cancelled);
        tracing::info!(pipeline_id, "Cancelled pipeline execution");
        true
    }

    /// A snapshot of one in-flight execution's state.
    #[must_use]
    pub fn execution_state(&self, pipeline_id: &str) -> Option<PipelineExecutionState> {
        self.active
            .lock()
            .get(pipeline_id)
            .map(|execution| execution.state.read().clone())
    }

    /// Snapshots of every in-flight execution.
    #[must_use]
    pub fn active_executions(&self) -> Vec<PipelineExecutionState> {
        self.active
            .lock()
            .values()
            .map(|execution| execution.state.read().clone())
            .collect()
    }

    /// The built-in template catalog.
    #[must_use]
    pub fn pipeline_templates(&self) -> Vec<PipelineTemplate> {
        builtin_templates()
    }

    fn upsert_local(&self, definition: PluginPipelineDefinition) {
        let mut guard = self.pipelines.write();
        let mut next = (**guard).clone();
        match next.iter_mut().find(|d| d.id == definition.id) {
            Some(slot) => *slot = definition,
            None => next.push(definition),
        }
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineDataType;
    use crate::errors::RepositoryError;
    use crate::plugin::{PluginKind, PluginRegistry};
    use crate::repository::{InMemoryPipelineRepository, MockPipelineRepository};
    use crate::step::PipelineStepConfig;
    use crate::testing::mocks::{MockPlugin, SlowPlugin};
    use std::time::Duration;

    fn definition(id: &str, plugin_id: &str) -> PluginPipelineDefinition {
        PluginPipelineDefinition::builder()
            .id(id)
            .name(format!("Pipeline {id}"))
            .step(PipelineStepConfig::new(plugin_id))
            .build()
            .unwrap()
    }

    fn manager_with_registry(registry: PluginRegistry) -> PipelineManager {
        PipelineManager::new(
            Arc::new(InMemoryPipelineRepository::new()),
            Arc::new(registry),
        )
    }

    async fn wait_until_inactive(manager: &PipelineManager, pipeline_id: &str) {
        for _ in 0..100 {
            if manager.execution_state(pipeline_id).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("execution '{pipeline_id}' is still tracked");
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let manager = manager_with_registry(PluginRegistry::new());

        manager
            .create_pipeline(definition("p1", "translate"))
            .await
            .unwrap();
        assert_eq!(manager.pipelines().len(), 1);

        // A fresh manager over the same repository hydrates via load.
        let repository = Arc::clone(&manager.repository);
        let other = PipelineManager::new(repository, Arc::new(PluginRegistry::new()));
        assert!(other.pipelines().is_empty());
        assert_eq!(other.load_pipelines().await.unwrap(), 1);
        assert!(other.get_pipeline("p1").is_some());
    }

    #[tokio::test]
    async fn test_update_pipeline() {
        let manager = manager_with_registry(PluginRegistry::new());
        let created = manager
            .create_pipeline(definition("p1", "translate"))
            .await
            .unwrap();

        let mut changed = created.clone();
        changed.name = "Renamed".to_string();
        let updated = manager.update_pipeline(changed).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(
            manager.get_pipeline("p1").map(|d| d.name),
            Some("Renamed".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_unknown_pipeline_fails() {
        let manager = manager_with_registry(PluginRegistry::new());
        let result = manager.update_pipeline(definition("ghost", "x")).await;
        assert!(matches!(result, Err(ManagerError::PipelineNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_pipeline() {
        let manager = manager_with_registry(PluginRegistry::new());
        manager
            .create_pipeline(definition("p1", "translate"))
            .await
            .unwrap();

        manager.delete_pipeline("p1").await.unwrap();
        assert!(manager.get_pipeline("p1").is_none());
    }

    #[tokio::test]
    async fn test_repository_failure_becomes_result() {
        let mut repository = MockPipelineRepository::new();
        repository
            .expect_save_pipeline()
            .returning(|_| Err(RepositoryError::Storage("db down".to_string())));

        let manager = PipelineManager::new(Arc::new(repository), Arc::new(PluginRegistry::new()));

        let result = manager.create_pipeline(definition("p1", "translate")).await;
        assert!(matches!(result, Err(ManagerError::Repository(_))));
        // The failed create must not touch the snapshot.
        assert!(manager.pipelines().is_empty());
    }

    #[tokio::test]
    async fn test_execute_pipeline_runs_in_background() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(MockPlugin::new("translate", PluginKind::Translation)));
        let manager = manager_with_registry(registry);

        manager
            .create_pipeline(definition("p1", "translate"))
            .await
            .unwrap();

        let mut events = manager
            .execute_pipeline("p1", PipelineData::text("hello"))
            .unwrap();

        // The tracking entry exists while the run is in flight, and the
        // stream delivers the full event sequence.
        let mut saw_completed = false;
        while let Ok(event) = events.recv().await {
            if matches!(event, PipelineEvent::Completed { .. }) {
                saw_completed = true;
                break;
            }
        }
        assert!(saw_completed);

        wait_until_inactive(&manager, "p1").await;
        assert!(manager.active_executions().is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_pipeline_fails() {
        let manager = manager_with_registry(PluginRegistry::new());
        let result = manager.execute_pipeline("ghost", PipelineData::text("x"));
        assert!(matches!(result, Err(ManagerError::PipelineNotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_execution_rejected() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(SlowPlugin::new(
            "slow",
            Duration::from_millis(200),
        )));
        let manager = manager_with_registry(registry);
        manager
            .create_pipeline(definition("p1", "slow"))
            .await
            .unwrap();

        let _events = manager
            .execute_pipeline("p1", PipelineData::text("x"))
            .unwrap();
        let second = manager.execute_pipeline("p1", PipelineData::text("x"));
        assert!(matches!(second, Err(ManagerError::AlreadyRunning(_))));

        wait_until_inactive(&manager, "p1").await;
    }

    #[tokio::test]
    async fn test_cancel_reaches_running_engine() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(SlowPlugin::new("slow", Duration::from_secs(30))));
        let manager = manager_with_registry(registry);

        // Short per-attempt deadline so the cooperative cancel check is
        // reached quickly.
        let definition = PluginPipelineDefinition::builder()
            .id("p1")
            .name("Slow run")
            .step(
                PipelineStepConfig::new("slow")
                    .with_timeout_ms(20)
                    .with_retry_count(100),
            )
            .build()
            .unwrap();
        manager.create_pipeline(definition).await.unwrap();

        let mut events = manager
            .execute_pipeline("p1", PipelineData::text("x"))
            .unwrap();

        assert!(manager.cancel_pipeline("p1"));

        let mut saw_cancelled = false;
        while let Ok(event) = events.recv().await {
            if matches!(event, PipelineEvent::Cancelled { .. }) {
                saw_cancelled = true;
                break;
            }
        }
        assert!(saw_cancelled);

        wait_until_inactive(&manager, "p1").await;
        assert!(!manager.cancel_pipeline("p1"));
    }

    #[tokio::test]
    async fn test_concurrent_executions_of_distinct_pipelines() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(MockPlugin::new("translate", PluginKind::Translation)));
        let manager = manager_with_registry(registry);

        for id in ["a", "b", "c"] {
            manager
                .create_pipeline(definition(id, "translate"))
                .await
                .unwrap();
        }

        let receivers: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|id| {
                manager
                    .execute_pipeline(id, PipelineData::text("x"))
                    .unwrap()
            })
            .collect();

        let outcomes = futures::future::join_all(receivers.into_iter().map(|mut rx| async move {
            while let Ok(event) = rx.recv().await {
                if event.is_terminal() {
                    return event.kind();
                }
            }
            "stream closed"
        }))
        .await;

        assert_eq!(outcomes, vec!["completed", "completed", "completed"]);

        for id in ["a", "b", "c"] {
            wait_until_inactive(&manager, id).await;
        }
    }

    #[tokio::test]
    async fn test_templates_catalog_exposed() {
        let manager = manager_with_registry(PluginRegistry::new());
        assert_eq!(manager.pipeline_templates().len(), 3);
    }

    #[tokio::test]
    async fn test_template_bridged_through_registry_is_executable() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(
            MockPlugin::new("deepl", PluginKind::Translation)
                .with_output_type(PipelineDataType::Text),
        ));
        registry.register(Arc::new(
            MockPlugin::new("espeak", PluginKind::TextToSpeech)
                .with_output_type(PipelineDataType::Audio),
        ));
        let registry = Arc::new(registry);
        let manager = PipelineManager::new(
            Arc::new(InMemoryPipelineRepository::new()),
            registry.clone() as Arc<dyn PluginResolver>,
        );

        let template = manager
            .pipeline_templates()
            .into_iter()
            .find(|t| t.name == "Translate & Read Aloud")
            .unwrap();
        let definition = template
            .instantiate(|kind| registry.first_id_of_kind(kind))
            .unwrap();

        let mut events = manager
            .execute_definition(definition, PipelineData::text("Hello"))
            .unwrap();

        let mut saw_completed = false;
        while let Ok(event) = events.recv().await {
            if matches!(event, PipelineEvent::Completed { .. }) {
                saw_completed = true;
                break;
            }
        }
        assert!(saw_completed);
    }
}
