//! Slide content grouped into the shapes it is drawn with.

use medislide_core::spans::{note_body, prefixed_spans, render_spans, Span};
use medislide_core::{ContentItem, ListItem, Slide, TableRow};

/// How a text paragraph is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Bullet,
    /// Ordinal shown before the text.
    Number(usize),
}

/// One paragraph of a text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParagraph {
    pub spans: Vec<Span>,
    pub marker: Marker,
    pub italic: bool,
    /// Paragraph ends its content item.
    pub last_of_item: bool,
}

impl TextParagraph {
    fn new(spans: Vec<Span>, marker: Marker) -> Self {
        Self {
            spans,
            marker,
            italic: false,
            last_of_item: true,
        }
    }
}

/// A shape-sized group of content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Text(Vec<TextParagraph>),
    Table {
        headers: &'a [String],
        rows: &'a [TableRow],
    },
}

fn list_paragraphs(items: &[ListItem], numbered: bool) -> Vec<TextParagraph> {
    let count = items.len();
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (marker, prefix) = if numbered {
                (Marker::Number(i + 1), format!("{}. ", i + 1))
            } else {
                (Marker::Bullet, String::new())
            };
            TextParagraph {
                last_of_item: i + 1 == count,
                ..TextParagraph::new(prefixed_spans(&prefix, &item.text, &item.bold), marker)
            }
        })
        .collect()
}

/// Group consecutive text items into one block and give each table its own.
/// Tables without headers are dropped.
pub fn blocks(slide: &Slide) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut text: Vec<TextParagraph> = Vec::new();

    for item in &slide.content {
        match item {
            ContentItem::Paragraph { text: body, bold } => {
                text.push(TextParagraph::new(render_spans(body, bold), Marker::None));
            }
            ContentItem::BulletList { items } => {
                text.extend(list_paragraphs(items, false));
            }
            ContentItem::NumberedList { items } => {
                text.extend(list_paragraphs(items, true));
            }
            ContentItem::Note { text: body } => {
                text.push(TextParagraph {
                    italic: true,
                    ..TextParagraph::new(
                        prefixed_spans::<&str>("Note: ", note_body(body), &[]),
                        Marker::None,
                    )
                });
            }
            ContentItem::Table { headers, rows } => {
                if headers.is_empty() {
                    log::warn!("Skipping table without headers on '{}'", slide.title);
                    continue;
                }
                if !text.is_empty() {
                    blocks.push(Block::Text(std::mem::take(&mut text)));
                }
                blocks.push(Block::Table { headers, rows });
            }
        }
    }

    if !text.is_empty() {
        blocks.push(Block::Text(text));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_items_share_a_block() {
        let slide = Slide::new("S")
            .with_item(ContentItem::paragraph("intro"))
            .with_item(ContentItem::NumberedList {
                items: vec![ListItem::new("a"), ListItem::new("b")],
            })
            .with_item(ContentItem::Table {
                headers: vec!["H".into()],
                rows: vec![],
            })
            .with_item(ContentItem::Note {
                text: "NOTE: check".into(),
            });

        let blocks = blocks(&slide);
        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            Block::Text(paragraphs) => {
                assert_eq!(paragraphs.len(), 3);
                assert_eq!(paragraphs[1].marker, Marker::Number(1));
                assert_eq!(paragraphs[1].spans[0].text, "1. ");
                assert!(!paragraphs[1].last_of_item);
                assert_eq!(paragraphs[2].marker, Marker::Number(2));
                assert!(paragraphs[2].last_of_item);
            }
            other => panic!("expected text, got {:?}", other),
        }
        assert!(matches!(blocks[1], Block::Table { .. }));
        match &blocks[2] {
            Block::Text(paragraphs) => {
                assert!(paragraphs[0].italic);
                assert_eq!(paragraphs[0].spans[0].text, "Note: ");
                assert_eq!(paragraphs[0].spans[1].text, "check");
            }
            other => panic!("expected note text, got {:?}", other),
        }
    }

    #[test]
    fn test_headerless_table_dropped() {
        let slide = Slide::new("S").with_item(ContentItem::Table {
            headers: vec![],
            rows: vec![TableRow::new(["x"])],
        });
        assert!(blocks(&slide).is_empty());
    }
}
