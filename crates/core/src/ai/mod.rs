//! AI collaborator contracts: configuration, the completion-client seam,
//! prompt builders and the typed content service.

pub mod client;
pub mod config;
pub mod mock;
pub mod prompts;
pub mod service;

pub use client::{CompletionClient, CompletionRequest, InlineImage};
pub use config::{AiConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use mock::MockClient;
pub use service::{
    ClinicalAnswer, ContentService, Diagnosis, MissingInformation, OutlineRequest, SlideRequest,
    SuggestRequest, BATCH_FAILED_TEXT, FALLBACK_OUTLINE,
};
