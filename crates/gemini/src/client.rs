//! The Gemini completion client.

use crate::wire::{ErrorResponse, GenerateRequest, GenerateResponse};
use async_trait::async_trait;
use medislide_core::ai::{AiConfig, CompletionClient, CompletionRequest};
use medislide_core::{Error, Result};
use reqwest::Client;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Calls `{endpoint}/models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::AiError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Wrap an existing HTTP client.
    pub fn with_http(http: Client) -> Self {
        Self { http }
    }

    fn url(config: &AiConfig) -> String {
        format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, config: &AiConfig, request: &CompletionRequest) -> Result<String> {
        if !config.has_key() {
            return Err(Error::AiError("No API key configured".to_string()));
        }

        let body = GenerateRequest::from_request(request);
        log::debug!(
            "Sending generateContent to {} ({} chars, {} images)",
            config.model,
            request.prompt.len(),
            request.images.len()
        );

        let response = self
            .http
            .post(Self::url(config))
            .header("x-goog-api-key", &config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AiError(format!("Gemini HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::AiError(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(Error::AiError(format!("Gemini returned {}: {}", status, message)));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| Error::AiError(format!("Failed to parse Gemini response: {}", e)))?;

        match parsed.text() {
            Some(text) => Ok(text),
            None => {
                let reason = parsed
                    .refusal()
                    .unwrap_or_else(|| "empty response".to_string());
                log::warn!("Gemini returned no text: {}", reason);
                Err(Error::AiError(format!("Gemini returned no text: {}", reason)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let config = AiConfig::new("k")
            .with_model("gemini-pro")
            .with_endpoint("https://example.test/v1beta/");
        assert_eq!(
            GeminiClient::url(&config),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let client = GeminiClient::new().unwrap();
        let result = client
            .complete(&AiConfig::new(""), &CompletionRequest::new("hi"))
            .await;
        assert!(matches!(result, Err(Error::AiError(_))));
    }
}
