//! PDF exporter for slide decks.
//!
//! Writes PDF 1.4 directly. Text is set in embedded TrueType fonts subset to
//! the glyphs each document uses, so any character the fonts cover prints as
//! written and every character extracts back to itself. Layout follows an A4
//! page with fixed margins, one new page per slide.

pub mod document;
pub mod encoding;
pub mod exporter;
pub mod fonts;

#[cfg(test)]
mod readback;

pub use document::{Font, PdfDocument, Rgb};
pub use exporter::{PdfExporter, PdfOptions};
pub use fonts::{FontProgram, FontSet};
