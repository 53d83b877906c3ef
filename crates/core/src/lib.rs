//! Core slide content model, schema validation, bold-span rendering,
//! deck editing and AI collaborator contracts for medical presentations.

pub mod ai;
pub mod deck;
pub mod error;
pub mod export;
pub mod extract;
pub mod html;
pub mod layout;
pub mod metrics;
pub mod session;
pub mod spans;
pub mod store;
pub mod topics;
pub mod types;
pub mod validate;

pub use ai::{AiConfig, CompletionClient, ContentService, InlineImage};
pub use deck::{Deck, DeckEntry, ModifyAction, SlideId, SlideState};
pub use error::{Error, Result};
pub use export::{export_file_name, DocumentExporter, ExportFormat};
pub use extract::{extract_json, JsonShape};
pub use session::{AddOutcome, EditingSession, SessionContext};
pub use spans::{render_spans, Span};
pub use store::{Case, CaseKind, CaseStore, InputMode, JsonFileStore, MemoryStore};
pub use topics::TopicTracker;
pub use types::{ContentItem, ContentKind, ListItem, Slide, TableRow};
pub use validate::{SlideValidator, ValidatedSlides, ValidationReport};
