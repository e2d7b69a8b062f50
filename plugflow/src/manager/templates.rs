//! Catalog of example pipeline templates.
//!
//! Templates reference capability kinds, not resolver-registered plugin
//! ids; a caller bridges a template into an executable definition by
//! mapping each kind to an installed plugin id.

use crate::core::PipelineDataType;
use crate::definition::PluginPipelineDefinition;
use crate::errors::PipelineError;
use crate::plugin::PluginKind;
use crate::step::PipelineStepConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One step of a template, identified by capability kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStep {
    /// The capability this step needs.
    pub kind: PluginKind,
    /// Default step-local parameters.
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl TemplateStep {
    /// Creates a template step with no default parameters.
    #[must_use]
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            config: HashMap::new(),
        }
    }

    /// Adds a default parameter.
    #[must_use]
    pub fn with_config_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// A named example step sequence, instantiable against installed plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTemplate {
    /// Display name.
    pub name: String,
    /// What the template does.
    pub description: String,
    /// Ordered capability steps.
    pub steps: Vec<TemplateStep>,
    /// Envelope type the first step expects.
    pub input_type: PipelineDataType,
    /// Envelope type the last step produces.
    pub output_type: PipelineDataType,
}

impl PipelineTemplate {
    /// Bridges the template into a concrete definition by mapping each
    /// capability kind to an installed plugin id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigurationError`] when a kind has no
    /// installed plugin, or when the resulting definition fails
    /// validation.
    pub fn instantiate<F>(
        &self,
        mut resolve_kind: F,
    ) -> Result<PluginPipelineDefinition, PipelineError>
    where
        F: FnMut(PluginKind) -> Option<String>,
    {
        let mut steps = Vec::with_capacity(self.steps.len());
        for template_step in &self.steps {
            let plugin_id = resolve_kind(template_step.kind).ok_or_else(|| {
                PipelineError::ConfigurationError(format!(
                    "No installed plugin provides capability '{}'",
                    template_step.kind
                ))
            })?;
            steps.push(
                PipelineStepConfig::new(plugin_id).with_config(template_step.config.clone()),
            );
        }

        PluginPipelineDefinition::builder()
            .name(self.name.clone())
            .description(self.description.clone())
            .steps(steps)
            .input_type(self.input_type)
            .output_type(self.output_type)
            .build()
            .map_err(|err| PipelineError::ConfigurationError(err.to_string()))
    }
}

/// The built-in template catalog.
#[must_use]
pub fn builtin_templates() -> Vec<PipelineTemplate> {
    vec![
        PipelineTemplate {
            name: "Translate & Read Aloud".to_string(),
            description: "Translate text to a target language, then synthesize speech".to_string(),
            steps: vec![
                TemplateStep::new(PluginKind::Translation),
                TemplateStep::new(PluginKind::TextToSpeech),
            ],
            input_type: PipelineDataType::Text,
            output_type: PipelineDataType::Audio,
        },
        PipelineTemplate {
            name: "Summarize Chapter".to_string(),
            description: "Produce an AI summary of a chapter".to_string(),
            steps: vec![
                TemplateStep::new(PluginKind::AiText).with_config_entry("operation", "summarize"),
            ],
            input_type: PipelineDataType::ChapterContent,
            output_type: PipelineDataType::AiResponse,
        },
        PipelineTemplate {
            name: "Translate Book".to_string(),
            description: "Translate full book content".to_string(),
            steps: vec![TemplateStep::new(PluginKind::Translation)],
            input_type: PipelineDataType::BookContent,
            output_type: PipelineDataType::BookContent,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let templates = builtin_templates();
        assert_eq!(templates.len(), 3);
        assert!(templates.iter().any(|t| t.name == "Translate & Read Aloud"));
    }

    #[test]
    fn test_instantiate_maps_kinds_to_ids() {
        let templates = builtin_templates();
        let template = &templates[0];

        let definition = template
            .instantiate(|kind| match kind {
                PluginKind::Translation => Some("deepl".to_string()),
                PluginKind::TextToSpeech => Some("espeak".to_string()),
                PluginKind::AiText => None,
            })
            .unwrap();

        assert_eq!(definition.steps.len(), 2);
        assert_eq!(definition.steps[0].plugin_id, "deepl");
        assert_eq!(definition.steps[1].plugin_id, "espeak");
        assert_eq!(definition.output_type, PipelineDataType::Audio);
    }

    #[test]
    fn test_instantiate_fails_on_missing_kind() {
        let templates = builtin_templates();
        let template = &templates[0];

        let result = template.instantiate(|_| None);
        assert!(matches!(
            result,
            Err(PipelineError::ConfigurationError(message)) if message.contains("translation")
        ));
    }

    #[test]
    fn test_instantiate_carries_default_config() {
        let templates = builtin_templates();
        let template = &templates[1];

        let definition = template
            .instantiate(|_| Some("llm".to_string()))
            .unwrap();

        assert_eq!(
            definition.steps[0].config.get("operation"),
            Some(&"summarize".to_string())
        );
    }
}
