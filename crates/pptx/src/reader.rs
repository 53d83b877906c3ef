//! Slide text extraction from .pptx files.

use medislide_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Text recovered from one slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideText {
    /// 1-based position in the presentation.
    pub number: usize,
    /// Text of each shape, top to bottom, paragraphs separated by `\n`.
    pub shapes: Vec<String>,
    /// Text of every bold run, in reading order.
    pub bold_runs: Vec<String>,
}

impl SlideText {
    /// The topmost shape's text.
    pub fn title(&self) -> Option<&str> {
        self.shapes.first().map(String::as_str)
    }

    /// Every paragraph of every shape.
    pub fn lines(&self) -> Vec<&str> {
        self.shapes.iter().flat_map(|s| s.lines()).collect()
    }
}

/// Reads slide text back out of a presentation package.
pub struct SlideTextReader;

impl SlideTextReader {
    pub fn new() -> Self {
        Self
    }

    /// Read every slide in presentation order.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideText>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let order = self.slide_order(&mut archive)?;
        log::debug!("Reading {} slides", order.len());

        order
            .iter()
            .enumerate()
            .map(|(index, path)| {
                let content = read_part(&mut archive, path)?;
                let mut slide = extract_slide(&content);
                slide.number = index + 1;
                Ok(slide)
            })
            .collect()
    }

    /// Slide part paths ordered by the presentation's slide id list.
    fn slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels = read_part(archive, "ppt/_rels/presentation.xml.rels")?;
        let presentation = read_part(archive, "ppt/presentation.xml")?;

        let mut targets: Vec<(String, String)> = Vec::new();
        let mut reader = Reader::from_str(&rels);
        reader.trim_text(true);
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = String::new();
                    let mut rel_type = String::new();
                    let mut target = String::new();
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match attr.key.as_ref() {
                            b"Id" => id = value,
                            b"Type" => rel_type = value,
                            b"Target" => target = value,
                            _ => {}
                        }
                    }
                    if rel_type.ends_with("/slide") {
                        let path = match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("ppt/{}", target),
                        };
                        targets.push((id, path));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )))
                }
                _ => {}
            }
        }

        let mut order = Vec::new();
        let mut reader = Reader::from_str(&presentation);
        reader.trim_text(true);
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sldId" =>
                {
                    for attr in e.attributes().flatten() {
                        if local_name(attr.key.as_ref()) == b"id" && attr.key.as_ref() != b"id" {
                            let rel_id = String::from_utf8_lossy(&attr.value).to_string();
                            if let Some((_, path)) = targets.iter().find(|(id, _)| *id == rel_id) {
                                order.push(path.clone());
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing presentation: {}",
                        e
                    )))
                }
                _ => {}
            }
        }
        Ok(order)
    }
}

impl Default for SlideTextReader {
    fn default() -> Self {
        Self::new()
    }
}

/// A shape and where it sits on the slide.
#[derive(Debug, Default)]
struct ShapeInfo {
    text: String,
    x: i64,
    y: i64,
}

fn extract_slide(xml: &str) -> SlideText {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut slide = SlideText::default();
    let mut shapes: Vec<ShapeInfo> = Vec::new();
    let mut current: Option<ShapeInfo> = None;
    let mut depth = 0usize;
    let mut in_text = false;
    let mut run_bold = false;
    let mut run_text = String::new();
    let mut paragraph_count = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    if depth == 0 {
                        current = Some(ShapeInfo::default());
                        paragraph_count = 0;
                    }
                    depth += 1;
                }
                b"p" if current.is_some() => {
                    if let Some(shape) = current.as_mut() {
                        if paragraph_count > 0 {
                            shape.text.push('\n');
                        }
                    }
                    paragraph_count += 1;
                }
                b"r" => {
                    run_bold = false;
                    run_text.clear();
                }
                b"rPr" => run_bold = is_bold(e),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => {
                    if let Some(shape) = current.as_mut() {
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0);
                            match attr.key.as_ref() {
                                b"x" => shape.x = value,
                                b"y" => shape.y = value,
                                _ => {}
                            }
                        }
                    }
                }
                b"rPr" => run_bold = is_bold(e),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e.unescape().unwrap_or_default();
                run_text.push_str(&text);
                if let Some(shape) = current.as_mut() {
                    shape.text.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(mut shape) = current.take() {
                            shape.text = shape.text.trim().to_string();
                            if !shape.text.is_empty() {
                                shapes.push(shape);
                            }
                        }
                    }
                }
                b"t" => in_text = false,
                b"r" => {
                    if run_bold && !run_text.is_empty() {
                        slide.bold_runs.push(std::mem::take(&mut run_text));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error (continuing): {}", e);
            }
            _ => {}
        }
    }

    shapes.sort_by(|a, b| a.y.cmp(&b.y).then(a.x.cmp(&b.x)));
    slide.shapes = shapes.into_iter().map(|s| s.text).collect();
    slide
}

fn is_bold(e: &quick_xml::events::BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"b" && matches!(a.value.as_ref(), b"1" | b"true"))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;
    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}
