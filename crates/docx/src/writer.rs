//! Word document writer.

use crate::parts::{self, BULLET_NUM_ID, FIRST_NUMBERED_NUM_ID};
use medislide_core::spans::{note_body, prefixed_spans, render_spans, Span};
use medislide_core::{
    ContentItem, DocumentExporter, Error, ExportFormat, ListItem, Result, Slide, TableRow,
};
use quick_xml::escape::escape;
use std::fmt::{self, Write as _};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Layout and colour settings for Word export.
#[derive(Debug, Clone, PartialEq)]
pub struct DocxOptions {
    /// Total table width in twentieths of a point.
    pub table_width: u32,
    pub header_fill: String,
    pub stripe_fill: String,
    pub border_color: String,
    /// Spacing after a heading, in twentieths of a point.
    pub heading_spacing: u32,
    pub paragraph_spacing: u32,
    pub list_item_spacing: u32,
}

impl Default for DocxOptions {
    fn default() -> Self {
        Self {
            table_width: 9000,
            header_fill: "EBF2FA".to_string(),
            stripe_fill: "F5F5F5".to_string(),
            border_color: "D3D3D3".to_string(),
            heading_spacing: 200,
            paragraph_spacing: 100,
            list_item_spacing: 50,
        }
    }
}

impl DocxOptions {
    pub fn with_table_width(mut self, table_width: u32) -> Self {
        self.table_width = table_width;
        self
    }

    pub fn with_header_fill(mut self, fill: impl Into<String>) -> Self {
        self.header_fill = fill.into();
        self
    }

    pub fn with_stripe_fill(mut self, fill: impl Into<String>) -> Self {
        self.stripe_fill = fill.into();
        self
    }
}

/// Exports a deck as a .docx package.
#[derive(Debug, Clone, Default)]
pub struct DocxExporter {
    options: DocxOptions,
    title: Option<String>,
}

impl DocxExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: DocxOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the document title stored in the package properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn write_package(&self, document: &str, numbering: &str) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let title = self.title.as_deref().unwrap_or_default();
        let styles = parts::styles();
        let core = parts::core_properties(title);
        let entries: [(&str, &str); 7] = [
            ("[Content_Types].xml", parts::content_types()),
            ("_rels/.rels", parts::package_rels()),
            ("docProps/core.xml", &core),
            ("word/_rels/document.xml.rels", parts::document_rels()),
            ("word/styles.xml", &styles),
            ("word/numbering.xml", numbering),
            ("word/document.xml", document),
        ];

        for (name, content) in entries {
            zip.start_file(name, options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(content.as_bytes())
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

impl DocumentExporter for DocxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn export(&self, slides: &[Slide]) -> Result<Vec<u8>> {
        let mut body = DocumentBody::new(&self.options);
        for slide in slides {
            body.slide(slide)
                .map_err(|e| Error::XmlError(format!("Failed to write '{}': {}", slide.title, e)))?;
        }
        log::debug!(
            "Writing Word document: {} slides, {} numbered lists",
            slides.len(),
            body.numbered_lists
        );

        let numbering =
            parts::numbering(body.numbered_lists).map_err(|e| Error::XmlError(e.to_string()))?;
        self.write_package(&body.finish(), &numbering)
    }
}

/// Text that is legal inside an XML element.
fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    escape(&cleaned).into_owned()
}

/// Accumulates `word/document.xml`.
struct DocumentBody<'a> {
    options: &'a DocxOptions,
    xml: String,
    numbered_lists: u32,
}

impl<'a> DocumentBody<'a> {
    fn new(options: &'a DocxOptions) -> Self {
        Self {
            options,
            xml: String::new(),
            numbered_lists: 0,
        }
    }

    fn slide(&mut self, slide: &Slide) -> fmt::Result {
        self.heading(&slide.title)?;
        for item in &slide.content {
            self.item(item)?;
        }
        Ok(())
    }

    fn item(&mut self, item: &ContentItem) -> fmt::Result {
        let spacing = self.options.paragraph_spacing;
        match item {
            ContentItem::Paragraph { text, bold } => {
                self.paragraph(&render_spans(text, bold), spacing, false)
            }
            ContentItem::BulletList { items } => self.list(items, BULLET_NUM_ID),
            ContentItem::NumberedList { items } => {
                if items.is_empty() {
                    return Ok(());
                }
                let num_id = FIRST_NUMBERED_NUM_ID + self.numbered_lists;
                self.numbered_lists += 1;
                self.list(items, num_id)
            }
            ContentItem::Note { text } => {
                let spans = prefixed_spans::<&str>("Note: ", note_body(text), &[]);
                self.paragraph(&spans, spacing, true)
            }
            ContentItem::Table { headers, rows } => self.table(headers, rows),
        }
    }

    fn heading(&mut self, title: &str) -> fmt::Result {
        write!(
            self.xml,
            "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/><w:spacing w:after=\"{}\"/></w:pPr>",
            self.options.heading_spacing
        )?;
        self.runs(&[Span::plain(title)], false)?;
        self.xml.push_str("</w:p>");
        Ok(())
    }

    fn paragraph(&mut self, spans: &[Span], spacing_after: u32, italic: bool) -> fmt::Result {
        write!(
            self.xml,
            "<w:p><w:pPr><w:spacing w:after=\"{}\"/></w:pPr>",
            spacing_after
        )?;
        self.runs(spans, italic)?;
        self.xml.push_str("</w:p>");
        Ok(())
    }

    fn list(&mut self, items: &[ListItem], num_id: u32) -> fmt::Result {
        for item in items {
            write!(
                self.xml,
                "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"{}\"/></w:numPr>\
                 <w:spacing w:after=\"{}\"/></w:pPr>",
                num_id, self.options.list_item_spacing
            )?;
            self.runs(&render_spans(&item.text, &item.bold), false)?;
            self.xml.push_str("</w:p>");
        }
        Ok(())
    }

    fn runs(&mut self, spans: &[Span], italic: bool) -> fmt::Result {
        for span in spans.iter().filter(|s| !s.text.is_empty()) {
            self.xml.push_str("<w:r>");
            if span.bold || italic {
                self.xml.push_str("<w:rPr>");
                if span.bold {
                    self.xml.push_str("<w:b/>");
                }
                if italic {
                    self.xml.push_str("<w:i/>");
                }
                self.xml.push_str("</w:rPr>");
            }
            write!(
                self.xml,
                "<w:t xml:space=\"preserve\">{}</w:t></w:r>",
                xml_text(&span.text)
            )?;
        }
        Ok(())
    }

    fn table(&mut self, headers: &[String], rows: &[TableRow]) -> fmt::Result {
        if headers.is_empty() {
            log::warn!("Skipping table without headers");
            return Ok(());
        }
        let options = self.options;
        let column_width = options.table_width / headers.len() as u32;

        write!(
            self.xml,
            "<w:tbl><w:tblPr><w:tblW w:w=\"{}\" w:type=\"dxa\"/><w:tblBorders>",
            options.table_width
        )?;
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            write!(
                self.xml,
                "<w:{} w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"{}\"/>",
                edge, options.border_color
            )?;
        }
        self.xml.push_str("</w:tblBorders><w:tblLook w:val=\"04A0\"/></w:tblPr><w:tblGrid>");
        for _ in headers {
            write!(self.xml, "<w:gridCol w:w=\"{}\"/>", column_width)?;
        }
        self.xml.push_str("</w:tblGrid>");

        self.xml.push_str("<w:tr><w:trPr><w:tblHeader/></w:trPr>");
        for header in headers {
            self.cell(header, column_width, Some(&options.header_fill), true)?;
        }
        self.xml.push_str("</w:tr>");

        for (index, row) in rows.iter().enumerate() {
            let fill = (index % 2 == 1).then_some(options.stripe_fill.as_str());
            self.xml.push_str("<w:tr>");
            for column in 0..headers.len() {
                let text = row.cells.get(column).map(String::as_str).unwrap_or_default();
                self.cell(text, column_width, fill, false)?;
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");

        self.paragraph(&[], options.heading_spacing, false)
    }

    fn cell(&mut self, text: &str, width: u32, fill: Option<&str>, header: bool) -> fmt::Result {
        write!(self.xml, "<w:tc><w:tcPr><w:tcW w:w=\"{}\" w:type=\"dxa\"/>", width)?;
        if let Some(fill) = fill {
            write!(
                self.xml,
                "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/>",
                fill
            )?;
        }
        self.xml.push_str("</w:tcPr><w:p>");
        if header {
            self.xml.push_str("<w:pPr><w:jc w:val=\"center\"/></w:pPr>");
        }
        let span = if header { Span::bold(text) } else { Span::plain(text) };
        self.runs(&[span], false)?;
        self.xml.push_str("</w:p></w:tc>");
        Ok(())
    }

    fn finish(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
             <w:body>{}<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
             <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" \
             w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr></w:body></w:document>",
            self.xml
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;
    use zip::ZipArchive;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    /// Paragraph texts of the document with (text, bold, italic) runs.
    fn paragraphs(xml: &str) -> Vec<Vec<(String, bool, bool)>> {
        let mut reader = Reader::from_str(xml);
        let mut paragraphs = Vec::new();
        let mut runs = Vec::new();
        let (mut bold, mut italic, mut in_text) = (false, false, false);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"w:r" => {
                    bold = false;
                    italic = false;
                }
                Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
                Event::Empty(e) if e.name().as_ref() == b"w:b" => bold = true,
                Event::Empty(e) if e.name().as_ref() == b"w:i" => italic = true,
                Event::Text(t) if in_text => {
                    runs.push((t.unescape().unwrap().into_owned(), bold, italic))
                }
                Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
                Event::End(e) if e.name().as_ref() == b"w:p" => {
                    paragraphs.push(std::mem::take(&mut runs))
                }
                Event::Eof => break,
                _ => {}
            }
        }
        paragraphs
    }

    fn text_of(paragraph: &[(String, bool, bool)]) -> String {
        paragraph.iter().map(|(t, _, _)| t.as_str()).collect()
    }

    fn sample() -> Vec<Slide> {
        vec![
            Slide::new("Sepsis & Shock")
                .with_item(ContentItem::Paragraph {
                    text: "Give early antibiotics now".into(),
                    bold: vec!["early antibiotics".into()],
                })
                .with_item(ContentItem::BulletList {
                    items: vec![ListItem::new("Fever"), ListItem::new("Tachycardia")],
                })
                .with_item(ContentItem::NumberedList {
                    items: vec![ListItem::new("Cultures"), ListItem::new("Fluids")],
                })
                .with_item(ContentItem::Note {
                    text: "Note: reassess lactate".into(),
                }),
            Slide::new("Staging")
                .with_item(ContentItem::NumberedList {
                    items: vec![ListItem::new("Recognise")],
                })
                .with_item(ContentItem::Table {
                    headers: vec!["Stage".into(), "Criteria".into()],
                    rows: vec![
                        TableRow::new(["1", "SIRS"]),
                        TableRow::new(["2", "Organ dysfunction"]),
                    ],
                }),
        ]
    }

    #[test]
    fn test_package_parts_present() {
        let bytes = DocxExporter::new().export(&sample()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }
    }

    #[test]
    fn test_titles_and_text_preserved() {
        let slides = sample();
        let bytes = DocxExporter::new().export(&slides).unwrap();
        let document = part(&bytes, "word/document.xml");
        let texts: Vec<String> = paragraphs(&document).iter().map(|p| text_of(p)).collect();

        assert_eq!(texts[0], "Sepsis & Shock");
        for slide in &slides {
            for fragment in slide.text_fragments() {
                let fragment = note_body(fragment);
                assert!(
                    texts.iter().any(|t| t.contains(fragment)),
                    "missing {:?}",
                    fragment
                );
            }
        }
        assert!(document.contains("<w:pStyle w:val=\"Heading1\"/>"));
    }

    #[test]
    fn test_bold_runs() {
        let bytes = DocxExporter::new().export(&sample()).unwrap();
        let document = part(&bytes, "word/document.xml");
        let paragraph = &paragraphs(&document)[1];
        assert_eq!(
            paragraph,
            &vec![
                ("Give ".to_string(), false, false),
                ("early antibiotics".to_string(), true, false),
                (" now".to_string(), false, false),
            ]
        );
    }

    #[test]
    fn test_note_is_italic_with_single_label() {
        let bytes = DocxExporter::new().export(&sample()).unwrap();
        let document = part(&bytes, "word/document.xml");
        let note = paragraphs(&document)
            .into_iter()
            .find(|p| text_of(p).starts_with("Note: "))
            .unwrap();
        assert_eq!(text_of(&note), "Note: reassess lactate");
        assert!(note.iter().all(|(_, _, italic)| *italic));
    }

    #[test]
    fn test_each_numbered_list_restarts() {
        let bytes = DocxExporter::new().export(&sample()).unwrap();
        let document = part(&bytes, "word/document.xml");
        assert_eq!(document.matches("<w:numId w:val=\"1\"/>").count(), 2);
        assert_eq!(document.matches("<w:numId w:val=\"2\"/>").count(), 2);
        assert_eq!(document.matches("<w:numId w:val=\"3\"/>").count(), 1);

        let numbering = part(&bytes, "word/numbering.xml");
        assert_eq!(numbering.matches("<w:startOverride w:val=\"1\"/>").count(), 2);
    }

    #[test]
    fn test_table_shading_and_header() {
        let bytes = DocxExporter::new().export(&sample()).unwrap();
        let document = part(&bytes, "word/document.xml");
        assert_eq!(document.matches("<w:tblHeader/>").count(), 1);
        assert_eq!(document.matches("w:fill=\"EBF2FA\"").count(), 2);
        assert_eq!(document.matches("w:fill=\"F5F5F5\"").count(), 2);
        assert_eq!(document.matches("<w:gridCol w:w=\"4500\"/>").count(), 2);
        assert!(document.contains("w:color=\"D3D3D3\""));
    }

    #[test]
    fn test_table_without_headers_skipped() {
        let slides = vec![Slide::new("Empty").with_item(ContentItem::Table {
            headers: vec![],
            rows: vec![TableRow::new(["orphan"])],
        })];
        let bytes = DocxExporter::new().export(&slides).unwrap();
        let document = part(&bytes, "word/document.xml");
        assert!(!document.contains("<w:tbl>"));
        assert!(!document.contains("orphan"));
    }

    #[test]
    fn test_control_characters_stripped() {
        let slides = vec![Slide::with_message("Ctl", "a\u{0001}b <c>")];
        let bytes = DocxExporter::new().export(&slides).unwrap();
        let document = part(&bytes, "word/document.xml");
        assert!(document.contains(">ab &lt;c&gt;<"));
    }

    #[test]
    fn test_title_in_core_properties() {
        let bytes = DocxExporter::new()
            .with_title("Septic shock")
            .export(&sample())
            .unwrap();
        assert!(part(&bytes, "docProps/core.xml").contains("<dc:title>Septic shock</dc:title>"));
        assert_eq!(DocxExporter::new().format(), ExportFormat::Docx);
    }
}
