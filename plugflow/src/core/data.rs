//! Typed data envelope transformed by pipeline steps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The payload type carried by a [`PipelineData`] envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineDataType {
    /// Plain text.
    Text,
    /// Encoded audio bytes.
    Audio,
    /// Encoded image bytes.
    Image,
    /// Key-value structured data.
    StructuredData,
    /// Opaque binary payload.
    Binary,
    /// Full book content.
    BookContent,
    /// A single chapter's content.
    ChapterContent,
    /// Output of an AI text operation.
    AiResponse,
}

impl PipelineDataType {
    /// All payload types, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Text,
        Self::Audio,
        Self::Image,
        Self::StructuredData,
        Self::Binary,
        Self::BookContent,
        Self::ChapterContent,
        Self::AiResponse,
    ];
}

impl fmt::Display for PipelineDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Audio => write!(f, "audio"),
            Self::Image => write!(f, "image"),
            Self::StructuredData => write!(f, "structured_data"),
            Self::Binary => write!(f, "binary"),
            Self::BookContent => write!(f, "book_content"),
            Self::ChapterContent => write!(f, "chapter_content"),
            Self::AiResponse => write!(f, "ai_response"),
        }
    }
}

/// The data envelope passed from step to step.
///
/// Producers are expected to populate the content field matching their
/// declared type (text for `Text`, bytes for `Audio`, and so on), but no
/// hard invariant enforces it.
///
/// Equality and hashing compare binary content by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineData {
    /// The declared payload type.
    pub data_type: PipelineDataType,

    /// Text payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Binary payload, if any. Serialized as base64.
    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub binary_content: Option<Vec<u8>>,

    /// Free-form metadata accompanying the payload.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    /// Structured key-value payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<HashMap<String, String>>,
}

impl PipelineData {
    /// Creates an empty envelope of the given type.
    #[must_use]
    pub fn new(data_type: PipelineDataType) -> Self {
        Self {
            data_type,
            text_content: None,
            binary_content: None,
            metadata: HashMap::new(),
            structured_data: None,
        }
    }

    /// Creates a text envelope.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text_content: Some(content.into()),
            ..Self::new(PipelineDataType::Text)
        }
    }

    /// Creates an audio envelope.
    #[must_use]
    pub fn audio(bytes: Vec<u8>) -> Self {
        Self {
            binary_content: Some(bytes),
            ..Self::new(PipelineDataType::Audio)
        }
    }

    /// Creates a book content envelope.
    #[must_use]
    pub fn book_content(content: impl Into<String>) -> Self {
        Self {
            text_content: Some(content.into()),
            ..Self::new(PipelineDataType::BookContent)
        }
    }

    /// Creates a chapter content envelope.
    #[must_use]
    pub fn chapter_content(content: impl Into<String>) -> Self {
        Self {
            text_content: Some(content.into()),
            ..Self::new(PipelineDataType::ChapterContent)
        }
    }

    /// Creates an opaque binary envelope.
    #[must_use]
    pub fn binary(bytes: Vec<u8>) -> Self {
        Self {
            binary_content: Some(bytes),
            ..Self::new(PipelineDataType::Binary)
        }
    }

    /// Creates a structured data envelope.
    #[must_use]
    pub fn structured(values: HashMap<String, String>) -> Self {
        Self {
            structured_data: Some(values),
            ..Self::new(PipelineDataType::StructuredData)
        }
    }

    /// Replaces the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a copy whose metadata is overridden by the given step config.
    ///
    /// Existing metadata keys not present in `overrides` are kept.
    #[must_use]
    pub fn with_config_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (key, value) in overrides {
            self.metadata.insert(key.clone(), value.clone());
        }
        self
    }
}

impl Hash for PipelineData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data_type.hash(state);
        self.text_content.hash(state);
        self.binary_content.hash(state);

        let mut metadata: Vec<_> = self.metadata.iter().collect();
        metadata.sort();
        metadata.hash(state);

        if let Some(ref structured) = self.structured_data {
            let mut entries: Vec<_> = structured.iter().collect();
            entries.sort();
            entries.hash(state);
        }
    }
}

mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(s) => STANDARD
                .decode(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
