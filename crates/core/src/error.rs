//! Error types for slide generation, editing and export.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating, editing or exporting slides.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The AI response did not contain the expected JSON shape.
    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    /// The slide document violates the schema and could not be repaired.
    #[error("Slide validation failed: {0}")]
    ValidationError(String),

    /// A slide index was out of range for the current deck.
    #[error("Slide index {index} out of range for deck of {len} slides")]
    IndexError { index: usize, len: usize },

    /// A batched modification could not be applied.
    #[error("Slide modification failed: {0}")]
    ModificationError(String),

    /// The AI collaborator could not be reached or refused the request.
    #[error("AI request failed: {0}")]
    AiError(String),

    /// The case store failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Document generation failed.
    #[error("Export error: {0}")]
    ExportError(String),

    /// ZIP container error (for DOCX and PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML error (for DOCX and PPTX).
    #[error("XML error: {0}")]
    XmlError(String),
}
