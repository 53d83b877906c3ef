//! Body font sizing against a reference content box.
//!
//! Heights are estimated with the Helvetica metrics from the core crate.
//! Estimates are in points; the reference box is given in CSS pixels at
//! 96 dpi.

use crate::blocks::{Block, Marker, TextParagraph};
use medislide_core::layout::wrap_spans;
use medislide_core::spans::Span;
use medislide_core::TableRow;

const PT_PER_PX: f32 = 0.75;

/// Line pitch as a multiple of the font size.
pub const LINE_SPACING: f32 = 1.2;

/// Space after the last paragraph of an item, as a multiple of the size.
pub const ITEM_GAP: f32 = 0.5;

/// Space between entries of one list, as a multiple of the size.
pub const LIST_ENTRY_GAP: f32 = 0.2;

/// Left indent of list text, in points.
pub const LIST_INDENT_PT: f32 = 27.0;

/// Vertical gap between stacked shapes, in points.
pub const BLOCK_GAP_PT: f32 = 12.0;

/// Cell margins used by PowerPoint tables, in points.
pub const CELL_MARGIN_X_PT: f32 = 7.2;
pub const CELL_MARGIN_Y_PT: f32 = 3.6;

/// The content box slides are fitted into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingReference {
    pub width_px: f32,
    pub height_px: f32,
    /// Largest body font size tried, in points.
    pub max_font_size: u32,
    /// Smallest body font size tried, in points.
    pub min_font_size: u32,
}

impl Default for SizingReference {
    fn default() -> Self {
        Self {
            width_px: 1184.0,
            height_px: 528.0,
            max_font_size: 20,
            min_font_size: 10,
        }
    }
}

impl SizingReference {
    pub fn new(width_px: f32, height_px: f32) -> Self {
        Self {
            width_px,
            height_px,
            ..Self::default()
        }
    }

    pub fn with_font_range(mut self, min: u32, max: u32) -> Self {
        self.min_font_size = min.min(max);
        self.max_font_size = max.max(min);
        self
    }

    pub fn width_pt(&self) -> f32 {
        self.width_px * PT_PER_PX
    }

    pub fn height_pt(&self) -> f32 {
        self.height_px * PT_PER_PX
    }

    /// Largest body size at which every block fits, or the minimum size.
    pub fn fit(&self, blocks: &[Block<'_>]) -> u32 {
        let width = self.width_pt();
        let height = self.height_pt();
        for size in (self.min_font_size..=self.max_font_size).rev() {
            if content_height(blocks, size as f32, width) <= height {
                return size;
            }
        }
        log::debug!(
            "Content exceeds {}x{}px even at {}pt",
            self.width_px,
            self.height_px,
            self.min_font_size
        );
        self.min_font_size
    }
}

/// Table text size for a given body size.
pub fn table_font_size(body_size: u32) -> u32 {
    body_size.saturating_sub(2).max(8)
}

fn line_count(spans: &[Span], size: f32, width: f32) -> usize {
    wrap_spans(spans, size, width).len().max(1)
}

/// Space after a paragraph, in points.
pub fn gap_after(paragraph: &TextParagraph, size: f32) -> f32 {
    if paragraph.last_of_item {
        size * ITEM_GAP
    } else {
        size * LIST_ENTRY_GAP
    }
}

pub fn text_height(paragraphs: &[TextParagraph], size: f32, width: f32) -> f32 {
    paragraphs
        .iter()
        .map(|p| {
            let available = match p.marker {
                Marker::None => width,
                Marker::Bullet | Marker::Number(_) => width - LIST_INDENT_PT,
            };
            line_count(&p.spans, size, available) as f32 * size * LINE_SPACING + gap_after(p, size)
        })
        .sum()
}

/// Height of each table row, header first, in points.
pub fn row_heights(headers: &[String], rows: &[TableRow], size: f32, width: f32) -> Vec<f32> {
    let columns = headers.len().max(1);
    let text_width = (width / columns as f32 - 2.0 * CELL_MARGIN_X_PT).max(size);
    let height = |cells: &[String], bold: bool| {
        let lines = cells
            .iter()
            .map(|c| {
                let span = Span {
                    text: c.clone(),
                    bold,
                };
                line_count(std::slice::from_ref(&span), size, text_width)
            })
            .max()
            .unwrap_or(1);
        lines as f32 * size * LINE_SPACING + 2.0 * CELL_MARGIN_Y_PT
    };

    std::iter::once(height(headers, true))
        .chain(rows.iter().map(|r| height(&r.cells, false)))
        .collect()
}

pub fn block_height(block: &Block<'_>, body_size: f32, width: f32) -> f32 {
    match block {
        Block::Text(paragraphs) => text_height(paragraphs, body_size, width),
        Block::Table { headers, rows } => {
            let size = table_font_size(body_size as u32) as f32;
            row_heights(headers, rows, size, width).iter().sum()
        }
    }
}

pub fn content_height(blocks: &[Block<'_>], body_size: f32, width: f32) -> f32 {
    let gaps = blocks.len().saturating_sub(1) as f32 * BLOCK_GAP_PT;
    blocks
        .iter()
        .map(|b| block_height(b, body_size, width))
        .sum::<f32>()
        + gaps
}
