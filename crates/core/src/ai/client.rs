//! The completion-client seam between the content service and a model.

use super::config::AiConfig;
use crate::{Error, Result};
use async_trait::async_trait;

/// An image sent alongside a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload without the data-URI header.
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let invalid = || Error::ValidationError(format!("invalid image data URI: {:.40}", uri));

        let rest = uri.strip_prefix("data:").ok_or_else(invalid)?;
        let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let mime_type = header.split(';').next().unwrap_or_default().trim();
        if mime_type.is_empty() || payload.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(mime_type, payload))
    }
}

/// A single prompt with optional images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub images: Vec<InlineImage>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: &[InlineImage]) -> Self {
        self.images.extend_from_slice(images);
        self
    }
}

/// An opaque text-completion service.
///
/// Implementations return the model's raw text. Transport and API failures
/// are reported as [`Error::AiError`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, config: &AiConfig, request: &CompletionRequest) -> Result<String>;
}
