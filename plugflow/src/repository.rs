//! Persistence boundary for pipeline definitions.
//!
//! The engine and manager treat the repository as an opaque durable store;
//! the only contract is that [`PluginPipelineDefinition`] fields round-trip
//! losslessly.

use crate::definition::PluginPipelineDefinition;
use crate::errors::RepositoryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Durable store for pipeline definitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Returns every stored definition.
    async fn get_all_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError>;

    /// Returns one definition by id, if stored.
    async fn get_pipeline(
        &self,
        id: &str,
    ) -> Result<Option<PluginPipelineDefinition>, RepositoryError>;

    /// Inserts or replaces a definition.
    async fn save_pipeline(
        &self,
        definition: &PluginPipelineDefinition,
    ) -> Result<(), RepositoryError>;

    /// Deletes a definition by id.
    async fn delete_pipeline(&self, id: &str) -> Result<(), RepositoryError>;

    /// Returns all publicly shared definitions.
    async fn get_public_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError>;

    /// Returns all definitions by the given author.
    async fn get_pipelines_by_author(
        &self,
        author_id: &str,
    ) -> Result<Vec<PluginPipelineDefinition>, RepositoryError>;
}

/// In-memory repository, primarily for tests and ephemeral setups.
#[derive(Default)]
pub struct InMemoryPipelineRepository {
    pipelines: RwLock<HashMap<String, PluginPipelineDefinition>>,
}

impl InMemoryPipelineRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.read().is_empty()
    }
}

#[async_trait]
impl PipelineRepository for InMemoryPipelineRepository {
    async fn get_all_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        Ok(self.pipelines.read().values().cloned().collect())
    }

    async fn get_pipeline(
        &self,
        id: &str,
    ) -> Result<Option<PluginPipelineDefinition>, RepositoryError> {
        Ok(self.pipelines.read().get(id).cloned())
    }

    async fn save_pipeline(
        &self,
        definition: &PluginPipelineDefinition,
    ) -> Result<(), RepositoryError> {
        self.pipelines
            .write()
            .insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), RepositoryError> {
        self.pipelines
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn get_public_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        Ok(self
            .pipelines
            .read()
            .values()
            .filter(|definition| definition.is_public)
            .cloned()
            .collect())
    }

    async fn get_pipelines_by_author(
        &self,
        author_id: &str,
    ) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        Ok(self
            .pipelines
            .read()
            .values()
            .filter(|definition| definition.author_id.as_deref() == Some(author_id))
            .cloned()
            .collect())
    }
}

/// File-backed repository storing all definitions in one JSON document.
pub struct JsonFilePipelineRepository {
    path: PathBuf,
    io_lock: tokio::sync::Mutex<()>,
}

impl JsonFilePipelineRepository {
    /// Creates a repository backed by the given file. The file is created
    /// on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, definitions: &[PluginPipelineDefinition]) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(definitions)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl PipelineRepository for JsonFilePipelineRepository {
    async fn get_all_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        let _guard = self.io_lock.lock().await;
        self.load().await
    }

    async fn get_pipeline(
        &self,
        id: &str,
    ) -> Result<Option<PluginPipelineDefinition>, RepositoryError> {
        let _guard = self.io_lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|definition| definition.id == id))
    }

    async fn save_pipeline(
        &self,
        definition: &PluginPipelineDefinition,
    ) -> Result<(), RepositoryError> {
        let _guard = self.io_lock.lock().await;
        let mut definitions = self.load().await?;
        match definitions.iter_mut().find(|d| d.id == definition.id) {
            Some(slot) => *slot = definition.clone(),
            None => definitions.push(definition.clone()),
        }
        self.store(&definitions).await
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), RepositoryError> {
        let _guard = self.io_lock.lock().await;
        let mut definitions = self.load().await?;
        let before = definitions.len();
        definitions.retain(|definition| definition.id != id);
        if definitions.len() == before {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        self.store(&definitions).await
    }

    async fn get_public_pipelines(&self) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        let _guard = self.io_lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|definition| definition.is_public)
            .collect())
    }

    async fn get_pipelines_by_author(
        &self,
        author_id: &str,
    ) -> Result<Vec<PluginPipelineDefinition>, RepositoryError> {
        let _guard = self.io_lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|definition| definition.author_id.as_deref() == Some(author_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::PipelineStepConfig;

    fn definition(id: &str) -> PluginPipelineDefinition {
        PluginPipelineDefinition::builder()
            .id(id)
            .name(format!("Pipeline {id}"))
            .step(PipelineStepConfig::new("translate"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_crud() {
        let repo = InMemoryPipelineRepository::new();
        assert!(repo.is_empty());

        repo.save_pipeline(&definition("p1")).await.unwrap();
        repo.save_pipeline(&definition("p2")).await.unwrap();
        assert_eq!(repo.len(), 2);

        let loaded = repo.get_pipeline("p1").await.unwrap();
        assert_eq!(loaded.map(|d| d.id), Some("p1".to_string()));

        repo.delete_pipeline("p1").await.unwrap();
        assert_eq!(repo.len(), 1);

        let missing = repo.delete_pipeline("p1").await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_in_memory_filters() {
        let repo = InMemoryPipelineRepository::new();

        let mut public = definition("pub");
        public.is_public = true;
        repo.save_pipeline(&public).await.unwrap();

        let mut authored = definition("mine");
        authored.author_id = Some("alice".to_string());
        repo.save_pipeline(&authored).await.unwrap();

        assert_eq!(repo.get_public_pipelines().await.unwrap().len(), 1);
        assert_eq!(
            repo.get_pipelines_by_author("alice").await.unwrap().len(),
            1
        );
        assert!(repo.get_pipelines_by_author("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFilePipelineRepository::new(dir.path().join("pipelines.json"));

        // Missing file reads as empty.
        assert!(repo.get_all_pipelines().await.unwrap().is_empty());

        let original = definition("p1");
        repo.save_pipeline(&original).await.unwrap();

        let loaded = repo.get_pipeline("p1").await.unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_json_file_save_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFilePipelineRepository::new(dir.path().join("pipelines.json"));

        repo.save_pipeline(&definition("p1")).await.unwrap();

        let mut updated = definition("p1");
        updated.name = "Renamed".to_string();
        repo.save_pipeline(&updated).await.unwrap();

        let all = repo.get_all_pipelines().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Renamed");
    }

    #[tokio::test]
    async fn test_json_file_delete() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFilePipelineRepository::new(dir.path().join("pipelines.json"));

        repo.save_pipeline(&definition("p1")).await.unwrap();
        repo.delete_pipeline("p1").await.unwrap();

        assert!(repo.get_all_pipelines().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_pipeline("p1").await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
