//! Persisted, shareable pipeline definitions.

use crate::core::PipelineDataType;
use crate::errors::PipelineValidationError;
use crate::step::PipelineStepConfig;
use crate::utils::{generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// A persisted, shareable pipeline: an ordered list of steps plus metadata.
///
/// Construct through [`PluginPipelineDefinition::builder`]; the builder
/// enforces the invariants (`id` and `name` non-blank, `steps` non-empty)
/// at `build()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginPipelineDefinition {
    /// Stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Ordered step configurations. Never empty.
    pub steps: Vec<PipelineStepConfig>,
    /// Envelope type the first step expects.
    pub input_type: PipelineDataType,
    /// Envelope type the last step produces.
    pub output_type: PipelineDataType,
    /// When the definition was created.
    pub created_at: Timestamp,
    /// When the definition was last modified.
    pub updated_at: Timestamp,
    /// Whether the definition is shared publicly.
    #[serde(default)]
    pub is_public: bool,
    /// The author, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    /// Free-form tags for discovery.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PluginPipelineDefinition {
    /// Starts building a definition.
    #[must_use]
    pub fn builder() -> PipelineDefinitionBuilder {
        PipelineDefinitionBuilder::new()
    }

    /// Number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Stamps the definition as modified now.
    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }
}

/// Fluent, immutable builder for [`PluginPipelineDefinition`].
#[derive(Debug, Clone, Default)]
pub struct PipelineDefinitionBuilder {
    id: Option<String>,
    name: String,
    description: String,
    steps: Vec<PipelineStepConfig>,
    input_type: Option<PipelineDataType>,
    output_type: Option<PipelineDataType>,
    created_at: Option<Timestamp>,
    is_public: bool,
    author_id: Option<String>,
    tags: Vec<String>,
}

impl PipelineDefinitionBuilder {
    /// Creates an empty builder. The id defaults to a fresh UUID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a builder from an existing definition, preserving its
    /// timestamps. Used to re-validate stored definitions before
    /// execution.
    #[must_use]
    pub fn from_definition(definition: PluginPipelineDefinition) -> Self {
        Self {
            id: Some(definition.id),
            name: definition.name,
            description: definition.description,
            steps: definition.steps,
            input_type: Some(definition.input_type),
            output_type: Some(definition.output_type),
            created_at: Some(definition.created_at),
            is_public: definition.is_public,
            author_id: definition.author_id,
            tags: definition.tags,
        }
    }

    /// Sets the id. When unset, `build()` generates a UUID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: PipelineStepConfig) -> Self {
        self.steps.push(step);
        self
    }

    /// Replaces the step list.
    #[must_use]
    pub fn steps(mut self, steps: Vec<PipelineStepConfig>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the input envelope type. Defaults to text.
    #[must_use]
    pub fn input_type(mut self, input_type: PipelineDataType) -> Self {
        self.input_type = Some(input_type);
        self
    }

    /// Sets the output envelope type. Defaults to text.
    #[must_use]
    pub fn output_type(mut self, output_type: PipelineDataType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// Marks the definition public.
    #[must_use]
    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn author_id(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Validates and builds the definition.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineValidationError`] if the id or name is blank, or
    /// the step list is empty.
    pub fn build(self) -> Result<PluginPipelineDefinition, PipelineValidationError> {
        let id = self.id.unwrap_or_else(generate_uuid);
        if id.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline id cannot be blank",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline name cannot be blank",
            ));
        }
        if self.steps.is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline must have at least one step",
            ));
        }

        let created_at = self.created_at.unwrap_or_else(now_utc);

        Ok(PluginPipelineDefinition {
            id,
            name: self.name,
            description: self.description,
            steps: self.steps,
            input_type: self.input_type.unwrap_or(PipelineDataType::Text),
            output_type: self.output_type.unwrap_or(PipelineDataType::Text),
            created_at,
            updated_at: now_utc(),
            is_public: self.is_public,
            author_id: self.author_id,
            tags: self.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_valid_uuid;

    fn one_step() -> PipelineStepConfig {
        PipelineStepConfig::new("translate")
    }

    #[test]
    fn test_build_minimal() {
        let definition = PluginPipelineDefinition::builder()
            .name("Translate")
            .step(one_step())
            .build()
            .unwrap();

        assert!(is_valid_uuid(&definition.id));
        assert_eq!(definition.name, "Translate");
        assert_eq!(definition.step_count(), 1);
        assert_eq!(definition.input_type, PipelineDataType::Text);
        assert!(!definition.is_public);
    }

    #[test]
    fn test_build_fails_on_blank_name() {
        let result = PluginPipelineDefinition::builder()
            .name("   ")
            .step(one_step())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_fails_on_blank_id() {
        let result = PluginPipelineDefinition::builder()
            .id("  ")
            .name("ok")
            .step(one_step())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_fails_on_empty_steps() {
        let result = PluginPipelineDefinition::builder().name("ok").build();
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("at least one step"));
    }

    #[test]
    fn test_from_definition_preserves_identity() {
        let original = PluginPipelineDefinition::builder()
            .id("p1")
            .name("Original")
            .step(one_step())
            .author_id("alice")
            .tag("books")
            .build()
            .unwrap();

        let rebuilt = PipelineDefinitionBuilder::from_definition(original.clone())
            .build()
            .unwrap();

        assert_eq!(rebuilt.id, original.id);
        assert_eq!(rebuilt.name, original.name);
        assert_eq!(rebuilt.created_at, original.created_at);
        assert_eq!(rebuilt.author_id, original.author_id);
        assert_eq!(rebuilt.tags, original.tags);
    }

    #[test]
    fn test_serialization_round_trip() {
        let definition = PluginPipelineDefinition::builder()
            .id("p1")
            .name("Translate & Read Aloud")
            .description("Translate a chapter then speak it")
            .step(PipelineStepConfig::new("translate").with_retry_count(1))
            .step(PipelineStepConfig::new("tts").with_timeout_ms(5000))
            .input_type(PipelineDataType::Text)
            .output_type(PipelineDataType::Audio)
            .public(true)
            .tag("audio")
            .build()
            .unwrap();

        let json = serde_json::to_string_pretty(&definition).unwrap();
        let back: PluginPipelineDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(definition, back);
    }
}
