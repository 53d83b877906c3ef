//! Typed calls against the AI collaborator.
//!
//! Every call builds a prompt, sends it through a [`CompletionClient`] and
//! extracts one JSON value from the reply. Malformed replies fall back to a
//! usable default and log a warning, except for slide modification which must
//! fail so the deck stays untouched.

use super::client::{CompletionClient, CompletionRequest, InlineImage};
use super::config::AiConfig;
use super::prompts;
use crate::deck::ModifyAction;
use crate::extract::{extract_as, JsonShape};
use crate::types::Slide;
use crate::validate::SlideValidator;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Paragraph written into every slide of a batch whose response was unusable.
pub const BATCH_FAILED_TEXT: &str =
    "Content generation failed. Please try again or select fewer topics.";

/// Outline used when the model's outline cannot be read.
pub const FALLBACK_OUTLINE: [&str; 7] = [
    "Introduction",
    "Pathophysiology",
    "Clinical Features",
    "Diagnosis",
    "Management",
    "Case Studies",
    "Conclusion",
];

/// One provisional diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub diagnosis: String,
    pub confidence_level: f64,
    pub reasoning: String,
    #[serde(default)]
    pub missing_information: MissingInformation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingInformation {
    #[serde(default)]
    pub information: Vec<String>,
    #[serde(default)]
    pub tests: Vec<String>,
}

/// Answer to a clinical question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalAnswer {
    pub answer: String,
    pub reasoning: String,
    pub topic: String,
}

/// What an outline is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineRequest {
    /// A bare medical topic: 15 titles.
    Topic(String),
    /// An answered clinical case: 10-12 titles opening with the case summary.
    Case {
        question: String,
        answer: String,
        reasoning: String,
    },
}

/// Input for multi-topic slide generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideRequest {
    pub topic: String,
    pub full_question: Option<String>,
    pub full_answer: Option<String>,
    pub full_reasoning: Option<String>,
    pub selected_topics: Vec<String>,
}

impl SlideRequest {
    pub fn new(topic: impl Into<String>, selected_topics: Vec<String>) -> Self {
        Self {
            topic: topic.into(),
            selected_topics,
            ..Self::default()
        }
    }

    /// Attach the case the presentation is built from.
    pub fn with_case(mut self, question: &str, answer: &str, reasoning: &str) -> Self {
        self.full_question = Some(question.to_string());
        self.full_answer = Some(answer.to_string());
        self.full_reasoning = Some(reasoning.to_string());
        self
    }
}

/// Input for topic suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestRequest {
    pub question: Option<String>,
    pub topic: Option<String>,
    /// Topics the model must not suggest.
    pub existing: Vec<String>,
}

#[derive(Deserialize)]
struct OutlineReply {
    outline: Vec<String>,
}

#[derive(Deserialize)]
struct TopicsReply {
    topics: Vec<String>,
}

/// Typed facade over a completion client.
#[derive(Clone)]
pub struct ContentService {
    client: Arc<dyn CompletionClient>,
    validator: SlideValidator,
}

impl ContentService {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            validator: SlideValidator::new(),
        }
    }

    async fn complete(&self, config: &AiConfig, request: CompletionRequest) -> Result<String> {
        log::debug!(
            "Sending prompt ({} chars, {} image(s)) to {}",
            request.prompt.len(),
            request.images.len(),
            config.model
        );
        self.client.complete(config, &request).await
    }

    /// Provisional diagnoses for patient data and images.
    pub async fn generate_diagnosis(
        &self,
        config: &AiConfig,
        patient_data: Option<&str>,
        images: &[InlineImage],
    ) -> Result<Vec<Diagnosis>> {
        let request = CompletionRequest::new(prompts::diagnosis(patient_data)).with_images(images);
        let text = self.complete(config, request).await?;

        match extract_as::<Vec<Diagnosis>>(&text, JsonShape::Array) {
            Ok(diagnoses) => Ok(diagnoses),
            Err(e) => {
                log::warn!("Diagnosis response unusable, returning raw text: {}", e);
                Ok(vec![Diagnosis {
                    diagnosis: "AI Analysis Result".to_string(),
                    confidence_level: 0.5,
                    reasoning: text,
                    missing_information: MissingInformation::default(),
                }])
            }
        }
    }

    /// Detailed answer to a clinical question.
    pub async fn answer_clinical_question(
        &self,
        config: &AiConfig,
        question: Option<&str>,
        images: &[InlineImage],
    ) -> Result<ClinicalAnswer> {
        let request =
            CompletionRequest::new(prompts::clinical_answer(question)).with_images(images);
        let text = self.complete(config, request).await?;

        match extract_as::<ClinicalAnswer>(&text, JsonShape::Object) {
            Ok(answer) => Ok(answer),
            Err(e) => {
                log::warn!("Answer response unusable, returning raw text: {}", e);
                Ok(ClinicalAnswer {
                    answer: text,
                    reasoning: format!("Analysis performed by {}", config.model),
                    topic: "Clinical Analysis".to_string(),
                })
            }
        }
    }

    /// One or two sentence case title.
    pub async fn summarize_question(
        &self,
        config: &AiConfig,
        question: Option<&str>,
        images: &[InlineImage],
    ) -> Result<String> {
        let request = CompletionRequest::new(prompts::summary(question)).with_images(images);
        let text = self.complete(config, request).await?;
        Ok(text.trim().to_string())
    }

    /// Slide titles for a new presentation.
    pub async fn generate_outline(
        &self,
        config: &AiConfig,
        request: &OutlineRequest,
    ) -> Result<Vec<String>> {
        let prompt = match request {
            OutlineRequest::Topic(topic) => prompts::topic_outline(topic),
            OutlineRequest::Case {
                question,
                answer,
                reasoning,
            } => prompts::case_outline(question, answer, reasoning),
        };
        let text = self.complete(config, CompletionRequest::new(prompt)).await?;

        match extract_as::<OutlineReply>(&text, JsonShape::Object) {
            Ok(reply) if !reply.outline.is_empty() => Ok(reply.outline),
            Ok(_) => {
                log::warn!("Model returned an empty outline, using the default");
                Ok(fallback_outline())
            }
            Err(e) => {
                log::warn!("Outline response unusable, using the default: {}", e);
                Ok(fallback_outline())
            }
        }
    }

    /// One slide per selected topic, validated.
    ///
    /// An unusable response yields one placeholder slide per topic carrying
    /// [`BATCH_FAILED_TEXT`].
    pub async fn generate_slides(
        &self,
        config: &AiConfig,
        request: &SlideRequest,
    ) -> Result<Vec<Slide>> {
        let prompt = prompts::slide_batch(
            &request.topic,
            request.full_question.as_deref(),
            request.full_answer.as_deref(),
            request.full_reasoning.as_deref(),
            &request.selected_topics,
        );
        let text = self.complete(config, CompletionRequest::new(prompt)).await?;

        match self.validator.validate_text(&text) {
            Ok(validated) => Ok(validated.slides),
            Err(e) => {
                log::warn!(
                    "Slide batch for {} topic(s) unusable, inserting placeholders: {}",
                    request.selected_topics.len(),
                    e
                );
                Ok(request
                    .selected_topics
                    .iter()
                    .map(|t| Slide::with_message(t.as_str(), BATCH_FAILED_TEXT))
                    .collect())
            }
        }
    }

    /// New topic ideas, excluding `request.existing`.
    pub async fn suggest_topics(
        &self,
        config: &AiConfig,
        request: &SuggestRequest,
    ) -> Result<Vec<String>> {
        let prompt = prompts::suggest_topics(
            request.question.as_deref(),
            request.topic.as_deref(),
            &request.existing,
        );
        let text = self.complete(config, CompletionRequest::new(prompt)).await?;

        match extract_as::<TopicsReply>(&text, JsonShape::Object) {
            Ok(reply) => Ok(reply.topics),
            Err(e) => {
                log::warn!("Topic suggestions unusable: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Content for one slide titled `topic`.
    ///
    /// Unlike the batch call this reports malformed output as an error so the
    /// caller can mark the slot as failed.
    pub async fn generate_single_slide(&self, config: &AiConfig, topic: &str) -> Result<Slide> {
        let text = self
            .complete(config, CompletionRequest::new(prompts::single_slide(topic)))
            .await?;
        self.validator.validate_single_text(&text)
    }

    /// Apply `action` to the selected slides and return the complete new deck.
    pub async fn modify_slides(
        &self,
        config: &AiConfig,
        slides: &[Slide],
        selected: &[usize],
        action: ModifyAction,
    ) -> Result<Vec<Slide>> {
        let prompt = prompts::modify_slides(&prompts::slides_json(slides), selected, action.tag());
        let text = self.complete(config, CompletionRequest::new(prompt)).await?;

        let validated = self
            .validator
            .validate_text(&text)
            .map_err(|e| Error::ModificationError(format!("{} response rejected: {}", action, e)))?;
        if validated.slides.is_empty() {
            return Err(Error::ModificationError(format!(
                "{} returned no slides",
                action
            )));
        }
        Ok(validated.slides)
    }
}

fn fallback_outline() -> Vec<String> {
    FALLBACK_OUTLINE.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockClient;
    use crate::types::ContentItem;

    fn service(client: MockClient) -> ContentService {
        ContentService::new(Arc::new(client))
    }

    fn config() -> AiConfig {
        AiConfig::new("test-key")
    }

    #[tokio::test]
    async fn test_diagnosis_parsed() {
        let reply = r#"```json
[{"diagnosis":"Pneumonia","confidenceLevel":0.8,"reasoning":"Fever",
  "missingInformation":{"information":["Travel"],"tests":["CXR"]}}]
```"#;
        let svc = service(MockClient::new().with_default(reply));
        let result = svc.generate_diagnosis(&config(), Some("cough"), &[]).await.unwrap();
        assert_eq!(result[0].diagnosis, "Pneumonia");
        assert_eq!(result[0].missing_information.tests, vec!["CXR"]);
    }

    #[tokio::test]
    async fn test_diagnosis_fallback_keeps_text() {
        let svc = service(MockClient::new().with_default("Probably viral."));
        let result = svc.generate_diagnosis(&config(), None, &[]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].diagnosis, "AI Analysis Result");
        assert_eq!(result[0].confidence_level, 0.5);
        assert_eq!(result[0].reasoning, "Probably viral.");
    }

    #[tokio::test]
    async fn test_answer_fallback() {
        let svc = service(MockClient::new().with_default("Just prose"));
        let answer = svc.answer_clinical_question(&config(), Some("Q"), &[]).await.unwrap();
        assert_eq!(answer.answer, "Just prose");
        assert_eq!(answer.topic, "Clinical Analysis");
    }

    #[tokio::test]
    async fn test_outline_fallback() {
        let svc = service(MockClient::new().with_default("{\"outline\": }"));
        let outline = svc
            .generate_outline(&config(), &OutlineRequest::Topic("Sepsis".into()))
            .await
            .unwrap();
        assert_eq!(outline.first().map(String::as_str), Some("Introduction"));
        assert_eq!(outline.len(), 7);
    }

    #[tokio::test]
    async fn test_outline_parsed() {
        let svc = service(MockClient::new().with_default(r#"{"outline":["A","B"]}"#));
        let outline = svc
            .generate_outline(&config(), &OutlineRequest::Topic("Sepsis".into()))
            .await
            .unwrap();
        assert_eq!(outline, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_slide_batch_fallback_placeholders() {
        let svc = service(MockClient::new().with_default("Sorry, no JSON today."));
        let request = SlideRequest::new("Sepsis", vec!["A".into(), "B".into()]);
        let slides = svc.generate_slides(&config(), &request).await.unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].title, "B");
        assert_eq!(slides[1].content, vec![ContentItem::paragraph(BATCH_FAILED_TEXT)]);
    }

    #[tokio::test]
    async fn test_slide_batch_repairs_tables() {
        let reply = r#"[{"title":"Sepsis","content":[{"type":"table","headers":["Stage","Criteria"],"rows":[{"cells":["1"]}]}]}]"#;
        let svc = service(MockClient::new().with_default(reply));
        let request = SlideRequest::new("Sepsis", vec!["Sepsis".into()]);
        let slides = svc.generate_slides(&config(), &request).await.unwrap();
        match &slides[0].content[0] {
            ContentItem::Table { rows, .. } => assert_eq!(rows[0].cells, vec!["1", ""]),
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_suggest_fallback_empty() {
        let svc = service(MockClient::new().with_default("nothing"));
        let topics = svc
            .suggest_topics(&config(), &SuggestRequest::default())
            .await
            .unwrap();
        assert!(topics.is_empty());
    }

    #[tokio::test]
    async fn test_single_slide_malformed_is_error() {
        let svc = service(MockClient::new().with_default("no slide"));
        let err = svc.generate_single_slide(&config(), "Renal").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_modify_empty_array_fails() {
        let svc = service(MockClient::new().with_default("[]"));
        let err = svc
            .modify_slides(&config(), &[Slide::new("A")], &[0], ModifyAction::ReplaceContent)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModificationError(_)));
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let svc = service(MockClient::new().with_failure("Topic: Sepsis", "quota exceeded"));
        let request = SuggestRequest {
            topic: Some("Sepsis".into()),
            ..SuggestRequest::default()
        };
        let err = svc.suggest_topics(&config(), &request).await.unwrap_err();
        assert!(matches!(err, Error::AiError(_)));
    }
}
