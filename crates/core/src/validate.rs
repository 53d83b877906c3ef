//! Slide schema validation.
//!
//! Turns loosely-typed model output into well-formed [`Slide`] values.
//! Unknown content types are rejected item by item, tables with ragged rows
//! are repaired, and anything that is not slide-shaped at the top level fails
//! the whole document.

use crate::extract::{extract_json, JsonShape};
use crate::types::{ContentItem, ContentKind, ListItem, Slide, TableRow};
use crate::{Error, Result};
use serde_json::{Map, Value};

/// Slides accepted by the validator together with what had to be fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSlides {
    pub slides: Vec<Slide>,
    pub report: ValidationReport,
}

/// Diagnostics collected while validating a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Indices of slides that had at least one table row repaired.
    pub repaired_slides: Vec<usize>,

    /// Total number of table rows padded or truncated.
    pub repaired_rows: usize,

    /// Content items that were dropped.
    pub rejected_items: Vec<RejectedItem>,
}

impl ValidationReport {
    /// True when the document was accepted exactly as given.
    pub fn is_clean(&self) -> bool {
        self.repaired_rows == 0 && self.rejected_items.is_empty()
    }

    fn merge_slide(&mut self, slide_index: usize, slide: SlideReport) {
        if slide.repaired_rows > 0 {
            self.repaired_slides.push(slide_index);
            self.repaired_rows += slide.repaired_rows;
        }
        self.rejected_items
            .extend(slide.rejected.into_iter().map(|(item, reason)| RejectedItem {
                slide: slide_index,
                item,
                reason,
            }));
    }
}

/// A content item that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    pub slide: usize,
    pub item: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
struct SlideReport {
    repaired_rows: usize,
    rejected: Vec<(usize, String)>,
}

/// Validator for AI-produced slide JSON.
#[derive(Debug, Clone, Default)]
pub struct SlideValidator;

impl SlideValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate raw model output that should contain slides.
    ///
    /// Whichever of `[` or `{` appears first decides between a slide array
    /// and a single slide (or `{"slides": [...]}`) document.
    pub fn validate_text(&self, text: &str) -> Result<ValidatedSlides> {
        let array_at = text.find('[');
        let object_at = text.find('{');
        let shape = match (array_at, object_at) {
            (Some(a), Some(o)) if a < o => JsonShape::Array,
            (Some(_), None) => JsonShape::Array,
            (_, Some(_)) => JsonShape::Object,
            (None, None) => {
                return Err(Error::MalformedResponse(
                    "response contains no JSON".to_string(),
                ))
            }
        };
        let value = extract_json(text, shape)?;
        self.validate_value(&value)
    }

    /// Validate raw model output that should contain exactly one slide object.
    pub fn validate_single_text(&self, text: &str) -> Result<Slide> {
        let value = extract_json(text, JsonShape::Object)?;
        let (slide, report) = self.validate_slide(&value).map_err(Error::ValidationError)?;
        log_slide_report(0, &slide, &report);
        Ok(slide)
    }

    /// Validate an already-parsed JSON document.
    pub fn validate_value(&self, value: &Value) -> Result<ValidatedSlides> {
        let slide_values: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => match (map.get("slides"), map.contains_key("title")) {
                (Some(Value::Array(items)), false) => items.iter().collect(),
                _ => vec![value],
            },
            other => {
                return Err(Error::MalformedResponse(format!(
                    "expected a slide array or object, found {}",
                    json_kind(other)
                )))
            }
        };

        let mut slides = Vec::with_capacity(slide_values.len());
        let mut report = ValidationReport::default();

        for (index, slide_value) in slide_values.into_iter().enumerate() {
            let (slide, slide_report) = self
                .validate_slide(slide_value)
                .map_err(|reason| Error::ValidationError(format!("slide {}: {}", index, reason)))?;
            log_slide_report(index, &slide, &slide_report);
            report.merge_slide(index, slide_report);
            slides.push(slide);
        }

        Ok(ValidatedSlides { slides, report })
    }

    fn validate_slide(&self, value: &Value) -> std::result::Result<(Slide, SlideReport), String> {
        let map = value
            .as_object()
            .ok_or_else(|| format!("expected object, found {}", json_kind(value)))?;

        let title = match map.get("title") {
            Some(Value::String(title)) => title.clone(),
            _ => return Err("missing string `title`".to_string()),
        };

        let items = match map.get("content") {
            Some(Value::Array(items)) => items,
            _ => return Err("missing `content` array".to_string()),
        };

        let mut report = SlideReport::default();
        let mut content = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match validate_item(item, &mut report.repaired_rows) {
                Ok(item) => content.push(item),
                Err(reason) => report.rejected.push((index, reason)),
            }
        }

        Ok((Slide { title, content }, report))
    }
}

fn log_slide_report(index: usize, slide: &Slide, report: &SlideReport) {
    if report.repaired_rows > 0 {
        log::warn!(
            "Slide {} '{}': repaired {} table row(s) with mismatched cell counts",
            index,
            slide.title,
            report.repaired_rows
        );
    }
    for (item, reason) in &report.rejected {
        log::warn!(
            "Slide {} '{}': dropped content item {}: {}",
            index,
            slide.title,
            item,
            reason
        );
    }
}

fn validate_item(
    value: &Value,
    repaired_rows: &mut usize,
) -> std::result::Result<ContentItem, String> {
    let map = value
        .as_object()
        .ok_or_else(|| format!("expected object, found {}", json_kind(value)))?;

    let tag = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing `type`".to_string())?;
    let kind = ContentKind::from_tag(tag).ok_or_else(|| format!("unknown type `{}`", tag))?;

    match kind {
        ContentKind::Paragraph => Ok(ContentItem::Paragraph {
            text: required_string(map, "text")?,
            bold: bold_list(map),
        }),
        ContentKind::Note => Ok(ContentItem::Note {
            text: required_string(map, "text")?,
        }),
        ContentKind::BulletList => Ok(ContentItem::BulletList {
            items: list_items(map)?,
        }),
        ContentKind::NumberedList => Ok(ContentItem::NumberedList {
            items: list_items(map)?,
        }),
        ContentKind::Table => table(map, repaired_rows),
    }
}

fn required_string(map: &Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("`{}` must be a string, found {}", key, json_kind(other))),
        None => Err(format!("missing `{}`", key)),
    }
}

/// Optional `bold` array; non-string entries are skipped.
fn bold_list(map: &Map<String, Value>) -> Vec<String> {
    match map.get("bold") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn list_items(map: &Map<String, Value>) -> std::result::Result<Vec<ListItem>, String> {
    let items = match map.get("items") {
        Some(Value::Array(items)) => items,
        Some(other) => return Err(format!("`items` must be an array, found {}", json_kind(other))),
        None => return Err("missing `items`".to_string()),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_map = item
                .as_object()
                .ok_or_else(|| format!("list item {} is not an object", i))?;
            Ok(ListItem {
                text: required_string(item_map, "text")
                    .map_err(|e| format!("list item {}: {}", i, e))?,
                bold: bold_list(item_map),
            })
        })
        .collect()
}

fn string_array(value: Option<&Value>, what: &str) -> std::result::Result<Vec<String>, String> {
    let entries = match value {
        Some(Value::Array(entries)) => entries,
        Some(other) => return Err(format!("{} must be an array, found {}", what, json_kind(other))),
        None => return Err(format!("missing {}", what)),
    };
    entries
        .iter()
        .map(|e| {
            e.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("{} must contain only strings", what))
        })
        .collect()
}

fn table(
    map: &Map<String, Value>,
    repaired_rows: &mut usize,
) -> std::result::Result<ContentItem, String> {
    let headers = string_array(map.get("headers"), "`headers`")?;

    let row_values = match map.get("rows") {
        Some(Value::Array(rows)) => rows,
        Some(other) => return Err(format!("`rows` must be an array, found {}", json_kind(other))),
        None => return Err("missing `rows`".to_string()),
    };

    let mut rows = Vec::with_capacity(row_values.len());
    let mut repaired = 0;
    for (i, row) in row_values.iter().enumerate() {
        let row_map = row
            .as_object()
            .ok_or_else(|| format!("row {} is not an object", i))?;
        let mut cells = string_array(row_map.get("cells"), &format!("row {} `cells`", i))?;

        if cells.len() != headers.len() {
            cells.resize(headers.len(), String::new());
            repaired += 1;
        }
        rows.push(TableRow { cells });
    }

    *repaired_rows += repaired;
    Ok(ContentItem::Table { headers, rows })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
