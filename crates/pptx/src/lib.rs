//! PowerPoint (Office Open XML) export for slide decks.
//!
//! The writer lays each deck slide out as a title shape followed by stacked
//! text boxes and native tables, choosing the body font size that fits the
//! sizing reference. The reader extracts slide text back out of a .pptx and
//! is used to check exported files.

mod blocks;
pub mod fit;
mod parts;
pub mod reader;
pub mod writer;

pub use fit::SizingReference;
pub use reader::{SlideText, SlideTextReader};
pub use writer::{PptxExporter, PptxOptions};
