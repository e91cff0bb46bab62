//! Text/image generation contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::foundation::error::CardResult;

/// Request for generated text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextPrompt {
    pub prompt: String,
    /// Upper bound on the answer, usually the field's `max_length`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

impl TextPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Request for a generated image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImagePrompt {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImagePrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Generation collaborator. Results are advisory; a failure never blocks manual editing.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_text(&self, request: &TextPrompt) -> CardResult<String>;
    /// URL of the generated image.
    async fn generate_image(&self, request: &ImagePrompt) -> CardResult<String>;
}
