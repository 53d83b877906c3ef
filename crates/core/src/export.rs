//! The exporter seam and export file naming.

use crate::types::Slide;
use crate::Result;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static WHITESPACE_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Supported output document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Pdf,
    Docx,
    Pptx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Pdf, Self::Docx, Self::Pptx];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    /// Parse an extension or format name, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "word" => Some(Self::Docx),
            "pptx" | "powerpoint" => Some(Self::Pptx),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Renders a deck into a complete document.
///
/// Implementations are pure: the same slides always yield the same bytes
/// (apart from embedded timestamps) and failures surface as
/// [`Error::ExportError`](crate::Error::ExportError).
pub trait DocumentExporter {
    fn format(&self) -> ExportFormat;

    fn export(&self, slides: &[Slide]) -> Result<Vec<u8>>;
}

/// `{topic with whitespace runs as "_"}.{ext}`, or `document.{ext}` for an
/// empty topic. Leading and trailing whitespace is replaced too.
pub fn export_file_name(topic: &str, format: ExportFormat) -> String {
    let stem = WHITESPACE_RUN_REGEX.replace_all(topic, "_");
    let stem = if stem.is_empty() { "document" } else { &stem };
    format!("{}.{}", stem, format.extension())
}
