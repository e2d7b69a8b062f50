//! End-to-end tests exercising the engine, manager, and repository
//! together.

use crate::core::{PipelineData, PipelineDataType, PipelineStatus, StepStatus};
use crate::definition::PluginPipelineDefinition;
use crate::events::PipelineEvent;
use crate::execution::{CancellationToken, PluginPipeline};
use crate::manager::PipelineManager;
use crate::plugin::{ComposablePlugin, PluginKind, PluginRegistry, PluginResolver};
use crate::repository::{JsonFilePipelineRepository, PipelineRepository};
use crate::step::PipelineStepConfig;
use crate::testing::mocks::{drain_events, FlakyPlugin, FnPlugin};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// A text-to-speech stand-in: text in, fixed audio bytes out.
fn tts_plugin() -> Arc<dyn ComposablePlugin> {
    Arc::new(FnPlugin::new("tts", PluginKind::TextToSpeech, |input| {
        let text = input.text_content.unwrap_or_default();
        Ok(crate::core::PipelineResult::Success(PipelineData::audio(
            text.into_bytes(),
        )))
    }))
}

#[tokio::test]
async fn test_translate_then_read_aloud_end_to_end() {
    crate::observability::try_init_tracing();

    // Translate fails once, then succeeds with the translated text.
    let translate = Arc::new(FlakyPlugin::new(
        "translate",
        1,
        PipelineData::text("Bonjour"),
    ));

    let registry = PluginRegistry::new();
    registry.register(translate.clone());
    registry.register(tts_plugin());

    let definition = PluginPipelineDefinition::builder()
        .id("translate-and-read")
        .name("Translate & Read Aloud")
        .step(
            PipelineStepConfig::new("translate")
                .with_timeout_ms(1000)
                .with_retry_count(1),
        )
        .step(PipelineStepConfig::new("tts").with_timeout_ms(5000))
        .input_type(PipelineDataType::Text)
        .output_type(PipelineDataType::Audio)
        .build()
        .unwrap();

    let engine = PluginPipeline::new(definition, Arc::new(registry));
    let mut events = engine.subscribe();

    let result = engine
        .execute(PipelineData::text("Hello"), CancellationToken::new())
        .await;

    // Final envelope is the synthesized audio of the translation.
    assert!(result.is_success());
    let data = result.data().unwrap();
    assert_eq!(data.data_type, PipelineDataType::Audio);
    assert_eq!(data.binary_content.as_deref(), Some(b"Bonjour".as_slice()));

    // The flaky translate was invoked twice: one failure, one success.
    assert_eq!(translate.call_count(), 2);

    // Both steps recorded as successful.
    let state = engine.execution_state();
    assert_eq!(state.status, PipelineStatus::Completed);
    assert_eq!(state.step_results.len(), 2);
    assert!(state
        .step_results
        .iter()
        .all(|step| step.status == StepStatus::Success));

    // Exact event sequence.
    let events = drain_events(&mut events);
    let kinds: Vec<_> = events.iter().map(PipelineEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "started",
            "step_started",
            "step_completed",
            "step_started",
            "step_completed",
            "completed"
        ]
    );

    match &events[0] {
        PipelineEvent::Started {
            pipeline_id,
            total_steps,
        } => {
            assert_eq!(pipeline_id, "translate-and-read");
            assert_eq!(*total_steps, 2);
        }
        other => panic!("expected Started, got {other:?}"),
    }
    assert!(matches!(
        &events[1],
        PipelineEvent::StepStarted { step_index: 0, .. }
    ));
    assert!(matches!(
        &events[3],
        PipelineEvent::StepStarted { step_index: 1, .. }
    ));
}

#[tokio::test]
async fn test_manager_full_loop_with_file_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repository: Arc<dyn PipelineRepository> = Arc::new(JsonFilePipelineRepository::new(
        dir.path().join("pipelines.json"),
    ));

    let registry = PluginRegistry::new();
    registry.register(Arc::new(FlakyPlugin::new(
        "translate",
        0,
        PipelineData::text("Hallo"),
    )));
    registry.register(tts_plugin());
    let registry: Arc<dyn PluginResolver> = Arc::new(registry);

    let definition = PluginPipelineDefinition::builder()
        .id("persisted")
        .name("Persisted pipeline")
        .step(PipelineStepConfig::new("translate"))
        .step(PipelineStepConfig::new("tts"))
        .input_type(PipelineDataType::Text)
        .output_type(PipelineDataType::Audio)
        .author_id("alice")
        .build()
        .unwrap();

    // Create through one manager, then hydrate a second one from the same
    // file and execute there.
    let writer = PipelineManager::new(Arc::clone(&repository), Arc::clone(&registry));
    writer.create_pipeline(definition.clone()).await.unwrap();

    let reader = PipelineManager::new(repository, registry);
    assert_eq!(reader.load_pipelines().await.unwrap(), 1);
    assert_eq!(reader.get_pipeline("persisted"), Some(definition));

    let mut events = reader
        .execute_pipeline("persisted", PipelineData::text("Hello"))
        .unwrap();

    let mut completed_with_audio = false;
    while let Ok(event) = events.recv().await {
        if let PipelineEvent::Completed { data, .. } = event {
            completed_with_audio = data.data_type == PipelineDataType::Audio;
            break;
        }
    }
    assert!(completed_with_audio);
}
