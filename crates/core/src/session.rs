//! One editing session: a deck plus the AI calls that mutate it.
//!
//! The session is the single owner of its [`Deck`]. Batch generation drives
//! one future per topic and applies completions in arrival order, each keyed
//! by the [`SlideId`] of the placeholder it fills.

use crate::ai::{AiConfig, ContentService, OutlineRequest, SlideRequest, SuggestRequest};
use crate::deck::{Deck, ModifyAction, SlideId};
use crate::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};

/// What the presentation is about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Medical topic for topic-mode decks.
    pub topic: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub reasoning: Option<String>,
}

impl SessionContext {
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    pub fn for_case(
        question: impl Into<String>,
        answer: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            question: Some(question.into()),
            answer: Some(answer.into()),
            reasoning: Some(reasoning.into()),
            ..Self::default()
        }
    }

    /// Headline used for prompts and export file names.
    pub fn headline(&self) -> &str {
        self.topic
            .as_deref()
            .or(self.question.as_deref())
            .unwrap_or_default()
    }
}

/// Result of a placeholder batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Slots whose generation succeeded, in completion order.
    pub generated: Vec<SlideId>,
    /// Slots whose generation failed, with the reason.
    pub failed: Vec<(SlideId, String)>,
}

impl AddOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deck, outline and collaborator for one case.
pub struct EditingSession {
    deck: Deck,
    service: ContentService,
    config: AiConfig,
    context: SessionContext,
    outline: Vec<String>,
}

impl EditingSession {
    pub fn new(service: ContentService, config: AiConfig, context: SessionContext) -> Self {
        Self {
            deck: Deck::new(),
            service,
            config,
            context,
            outline: Vec::new(),
        }
    }

    /// Resume editing an existing deck.
    pub fn with_deck(mut self, deck: Deck) -> Self {
        self.deck = deck;
        self
    }

    pub fn with_outline(mut self, outline: Vec<String>) -> Self {
        self.outline = outline;
        self
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    pub fn into_deck(self) -> Deck {
        self.deck
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn outline(&self) -> &[String] {
        &self.outline
    }

    /// Ask the collaborator for an outline matching the session context.
    pub async fn build_outline(&mut self) -> Result<&[String]> {
        let request = match (&self.context.topic, &self.context.question) {
            (Some(topic), _) => OutlineRequest::Topic(topic.clone()),
            (None, Some(question)) => OutlineRequest::Case {
                question: question.clone(),
                answer: self.context.answer.clone().unwrap_or_default(),
                reasoning: self.context.reasoning.clone().unwrap_or_default(),
            },
            (None, None) => {
                return Err(Error::ValidationError(
                    "session has neither a topic nor a question".to_string(),
                ))
            }
        };

        self.outline = self.service.generate_outline(&self.config, &request).await?;
        log::debug!("Outline has {} title(s)", self.outline.len());
        Ok(&self.outline)
    }

    /// Generate the selected outline topics in one request and append them.
    ///
    /// Returns the number of slides appended.
    pub async fn generate_deck(&mut self, selected_topics: &[String]) -> Result<usize> {
        if selected_topics.is_empty() {
            return Err(Error::ValidationError("no topics selected".to_string()));
        }

        let mut request =
            SlideRequest::new(self.context.headline(), selected_topics.to_vec());
        if let (Some(q), Some(a), Some(r)) = (
            &self.context.question,
            &self.context.answer,
            &self.context.reasoning,
        ) {
            request = request.with_case(q, a, r);
        }

        let slides = self.service.generate_slides(&self.config, &request).await?;
        let count = slides.len();
        for slide in slides {
            self.deck.push_slide(slide);
        }
        Ok(count)
    }

    /// Append one placeholder per topic and fill them concurrently.
    ///
    /// Each completion replaces only its own placeholder. Failures leave an
    /// error slide and do not stop the rest of the batch.
    pub async fn add_by_topics(&mut self, topics: &[String]) -> AddOutcome {
        let ids = self.deck.push_placeholders(topics);

        let mut pending: FuturesUnordered<_> = ids
            .into_iter()
            .zip(topics.iter().cloned())
            .map(|(id, topic)| {
                let service = self.service.clone();
                let config = self.config.clone();
                async move {
                    let result = service.generate_single_slide(&config, &topic).await;
                    (id, result)
                }
            })
            .collect();

        let mut outcome = AddOutcome::default();
        while let Some((id, result)) = pending.next().await {
            let resolved = result.map_err(|e| e.to_string());
            let failure = resolved.as_ref().err().cloned();
            if !self.deck.resolve_placeholder(id, resolved) {
                continue;
            }
            match failure {
                None => outcome.generated.push(id),
                Some(reason) => outcome.failed.push((id, reason)),
            }
        }

        if !outcome.is_complete() {
            log::warn!(
                "{} of {} topic(s) failed to generate",
                outcome.failed.len(),
                topics.len()
            );
        }
        outcome
    }

    /// Replace the deck with the collaborator's modification of `indices`.
    ///
    /// On any failure the deck is left exactly as it was.
    pub async fn modify(&mut self, action: ModifyAction, indices: &[usize]) -> Result<()> {
        let targets = self.deck.modification_targets(indices)?;
        let slides = self
            .service
            .modify_slides(&self.config, &self.deck.to_slides(), &targets, action)
            .await?;
        self.deck.replace_all(slides)?;
        log::debug!("Applied {} to {} slide(s)", action, targets.len());
        Ok(())
    }

    /// [`modify`](Self::modify) applied to the current selection.
    pub async fn modify_selection(&mut self, action: ModifyAction) -> Result<()> {
        let selected = self.deck.selected_indices();
        self.modify(action, &selected).await
    }

    /// Ask for new topics and merge them into the suggestions.
    ///
    /// Returns how many new suggestions were added.
    pub async fn suggest_topics(&mut self) -> Result<usize> {
        let request = SuggestRequest {
            question: self.context.question.clone(),
            topic: self.context.topic.clone(),
            existing: self.deck.topics().exclusions(&self.outline),
        };
        let topics = self.service.suggest_topics(&self.config, &request).await?;
        Ok(self.deck.topics_mut().merge_suggestions(topics))
    }
}
