//! Word (Office Open XML) exporter for slide decks.
//!
//! Produces a .docx package: one Heading 1 per slide followed by its
//! paragraphs, lists, tables and notes.

mod parts;
pub mod writer;

pub use writer::{DocxExporter, DocxOptions};
