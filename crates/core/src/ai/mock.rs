//! Scripted completion client for tests and offline runs.

use super::client::{CompletionClient, CompletionRequest};
use super::config::AiConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A completion client that answers from canned responses.
///
/// Rules are checked in insertion order; the first whose needle occurs in the
/// prompt decides the reply. Unmatched prompts get the default response.
#[derive(Debug, Default)]
pub struct MockClient {
    rules: Vec<(String, std::result::Result<String, String>)>,
    default_response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` to prompts containing `needle`.
    pub fn with_response(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Ok(response.into())));
        self
    }

    /// Fail prompts containing `needle` with an [`Error::AiError`].
    pub fn with_failure(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Err(message.into())));
        self
    }

    /// Reply used when no rule matches.
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, _config: &AiConfig, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let rule = self
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()));
        match rule {
            Some((_, Ok(response))) => Ok(response.clone()),
            Some((_, Err(message))) => Err(Error::AiError(message.clone())),
            None => self
                .default_response
                .clone()
                .ok_or_else(|| Error::AiError("no scripted response for prompt".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let client = MockClient::new()
            .with_response("Topic: A", "first")
            .with_response("Topic", "second")
            .with_default("fallback");
        let config = AiConfig::new("k");

        let a = client.complete(&config, &CompletionRequest::new("Topic: A")).await.unwrap();
        let b = client.complete(&config, &CompletionRequest::new("Topic: B")).await.unwrap();
        let c = client.complete(&config, &CompletionRequest::new("other")).await.unwrap();

        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("first", "second", "fallback"));
        assert_eq!(client.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_prompt_fails() {
        let client = MockClient::new();
        let err = client
            .complete(&AiConfig::new("k"), &CompletionRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiError(_)));
    }
}
