//! Domain types for structured slide content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single titled slide made of structured content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Display title. Not an identity: two slides may share a title.
    pub title: String,

    /// Content blocks in reading order.
    pub content: Vec<ContentItem>,
}

impl Slide {
    /// Create a slide with no content yet.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: Vec::new(),
        }
    }

    /// Add a content block to this slide.
    pub fn with_item(mut self, item: ContentItem) -> Self {
        self.content.push(item);
        self
    }

    /// A slide carrying a single plain paragraph, used for fallbacks.
    pub fn with_message(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title).with_item(ContentItem::paragraph(message))
    }

    /// Every literal text fragment on the slide, title first.
    pub fn text_fragments(&self) -> Vec<&str> {
        let mut fragments = vec![self.title.as_str()];
        for item in &self.content {
            fragments.extend(item.text_fragments());
        }
        fragments
    }
}

/// One visual block of a slide, discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Paragraph {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bold: Vec<String>,
    },
    BulletList {
        items: Vec<ListItem>,
    },
    NumberedList {
        items: Vec<ListItem>,
    },
    Note {
        text: String,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<TableRow>,
    },
}

impl ContentItem {
    /// A paragraph without emphasis.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph {
            text: text.into(),
            bold: Vec::new(),
        }
    }

    /// The `type` tag of this item as it appears in JSON.
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Paragraph { .. } => ContentKind::Paragraph,
            Self::BulletList { .. } => ContentKind::BulletList,
            Self::NumberedList { .. } => ContentKind::NumberedList,
            Self::Note { .. } => ContentKind::Note,
            Self::Table { .. } => ContentKind::Table,
        }
    }

    /// Literal text fragments of this block, in reading order.
    pub fn text_fragments(&self) -> Vec<&str> {
        match self {
            Self::Paragraph { text, .. } | Self::Note { text } => vec![text.as_str()],
            Self::BulletList { items } | Self::NumberedList { items } => {
                items.iter().map(|i| i.text.as_str()).collect()
            }
            Self::Table { headers, rows } => headers
                .iter()
                .chain(rows.iter().flat_map(|r| r.cells.iter()))
                .map(String::as_str)
                .collect(),
        }
    }
}

/// The five known content tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Paragraph,
    BulletList,
    NumberedList,
    Note,
    Table,
}

impl ContentKind {
    /// Parse a JSON `type` tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "paragraph" => Some(Self::Paragraph),
            "bullet_list" => Some(Self::BulletList),
            "numbered_list" => Some(Self::NumberedList),
            "note" => Some(Self::Note),
            "table" => Some(Self::Table),
            _ => None,
        }
    }

    /// The JSON `type` tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::BulletList => "bullet_list",
            Self::NumberedList => "numbered_list",
            Self::Note => "note",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One entry of a bullet or numbered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,

    /// Substrings of `text` to render in bold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bold: Vec<String>,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: Vec::new(),
        }
    }

    pub fn with_bold(mut self, bold: impl Into<String>) -> Self {
        self.bold.push(bold.into());
        self
    }
}

/// One body row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }
}
