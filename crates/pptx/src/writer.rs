//! PowerPoint presentation writer.

use crate::blocks::{blocks, Block, Marker, TextParagraph};
use crate::fit::{
    gap_after, row_heights, table_font_size, text_height, SizingReference, BLOCK_GAP_PT,
    LIST_INDENT_PT,
};
use crate::parts::{self, SLIDE_HEIGHT, SLIDE_WIDTH};
use chrono::Utc;
use medislide_core::spans::Span;
use medislide_core::{DocumentExporter, Error, ExportFormat, Result, Slide, TableRow};
use quick_xml::escape::escape;
use std::fmt::{self, Write as _};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const EMU_PER_PT: f32 = 12_700.0;
const MARGIN_X: i64 = 457_200;
const TITLE_Y: i64 = 228_600;
const TITLE_HEIGHT: i64 = 914_400;
const BODY_Y: i64 = 1_371_600;
const BODY_WIDTH: i64 = SLIDE_WIDTH - 2 * MARGIN_X;
const BODY_BOTTOM: i64 = SLIDE_HEIGHT - MARGIN_X;

const NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#,
);

fn emu(points: f32) -> i64 {
    (points * EMU_PER_PT).round() as i64
}

/// Ratio applied to body blocks that overflow the body area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shrink {
    available: i64,
    needed: i64,
}

impl Shrink {
    const NONE: Shrink = Shrink {
        available: 1,
        needed: 1,
    };

    fn is_none(&self) -> bool {
        self.available >= self.needed
    }

    /// Scaled EMU length, rounded down so scaled parts never outgrow the whole.
    fn apply(&self, length: i64) -> i64 {
        if self.is_none() {
            length
        } else {
            length * self.available / self.needed
        }
    }

    fn factor(&self) -> f32 {
        if self.is_none() {
            1.0
        } else {
            self.available as f32 / self.needed as f32
        }
    }
}

/// Top edges and heights for blocks stacked in the body area.
///
/// Blocks keep their natural heights when they fit. Otherwise the gaps
/// narrow and every block shrinks by the same ratio so the last one ends
/// at the bottom margin.
fn stack(natural: &[i64]) -> (Shrink, Vec<(i64, i64)>) {
    let body = BODY_BOTTOM - BODY_Y;
    let gap_count = natural.len().saturating_sub(1) as i64;
    let gap = if gap_count == 0 {
        0
    } else {
        emu(BLOCK_GAP_PT).min(body / 4 / gap_count)
    };
    let shrink = Shrink {
        available: body - gap * gap_count,
        needed: natural.iter().sum::<i64>().max(1),
    };

    let mut y = BODY_Y;
    let frames = natural
        .iter()
        .map(|height| {
            let frame = (y, shrink.apply(*height));
            y += frame.1 + gap;
            frame
        })
        .collect();
    (shrink, frames)
}

/// Colours, title size and the sizing reference for PowerPoint export.
#[derive(Debug, Clone, PartialEq)]
pub struct PptxOptions {
    pub sizing: SizingReference,
    pub title_size: u32,
    pub title_color: String,
    pub text_color: String,
    pub header_fill: String,
    pub header_text_color: String,
    pub stripe_fill: String,
    pub border_color: String,
}

impl Default for PptxOptions {
    fn default() -> Self {
        Self {
            sizing: SizingReference::default(),
            title_size: 28,
            title_color: "4A90E2".to_string(),
            text_color: "333333".to_string(),
            header_fill: "DCE6F0".to_string(),
            header_text_color: "2C3E50".to_string(),
            stripe_fill: "F5F5F5".to_string(),
            border_color: "C8C8C8".to_string(),
        }
    }
}

impl PptxOptions {
    pub fn with_sizing(mut self, sizing: SizingReference) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_title_color(mut self, color: impl Into<String>) -> Self {
        self.title_color = color.into();
        self
    }
}

/// Exports a deck as a .pptx package.
#[derive(Debug, Clone, Default)]
pub struct PptxExporter {
    options: PptxOptions,
    title: Option<String>,
}

impl PptxExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: PptxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingReference) -> Self {
        self.options.sizing = sizing;
        self
    }

    /// Set the presentation title stored in the package properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Body font size chosen for `slide`.
    pub fn body_font_size(&self, slide: &Slide) -> u32 {
        self.options.sizing.fit(&blocks(slide))
    }

    fn slide_xml(&self, slide: &Slide) -> Result<String> {
        let size = self.body_font_size(slide);
        log::debug!("Slide '{}' body size {}pt", slide.title, size);
        let mut writer = SlideWriter::new(&self.options);
        writer
            .write(slide, size)
            .map_err(|e| Error::XmlError(format!("Failed to write '{}': {}", slide.title, e)))?;
        Ok(writer.finish())
    }
}

impl DocumentExporter for PptxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pptx
    }

    fn export(&self, slides: &[Slide]) -> Result<Vec<u8>> {
        let count = slides.len();
        let title = self
            .title
            .clone()
            .or_else(|| slides.first().map(|s| s.title.clone()))
            .unwrap_or_default();

        let mut package: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".into(), parts::content_types(count)?),
            ("_rels/.rels".into(), parts::package_rels()?),
            ("docProps/app.xml".into(), parts::app_properties(count).into_bytes()),
            (
                "docProps/core.xml".into(),
                parts::core_properties(&title, Utc::now()).into_bytes(),
            ),
            ("ppt/presentation.xml".into(), parts::presentation(count).into_bytes()),
            ("ppt/_rels/presentation.xml.rels".into(), parts::presentation_rels(count)?),
            ("ppt/theme/theme1.xml".into(), parts::theme().as_bytes().to_vec()),
            (
                "ppt/slideMasters/slideMaster1.xml".into(),
                parts::slide_master().into_bytes(),
            ),
            (
                "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
                parts::relationships(&[
                    ("slideLayout", "../slideLayouts/slideLayout1.xml"),
                    ("theme", "../theme/theme1.xml"),
                ])?,
            ),
            (
                "ppt/slideLayouts/slideLayout1.xml".into(),
                parts::slide_layout().into_bytes(),
            ),
            (
                "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
                parts::relationships(&[("slideMaster", "../slideMasters/slideMaster1.xml")])?,
            ),
        ];

        let slide_rels =
            parts::relationships(&[("slideLayout", "../slideLayouts/slideLayout1.xml")])?;
        for (index, slide) in slides.iter().enumerate() {
            let number = index + 1;
            package.push((
                format!("ppt/slides/slide{}.xml", number),
                self.slide_xml(slide)?.into_bytes(),
            ));
            package.push((
                format!("ppt/slides/_rels/slide{}.xml.rels", number),
                slide_rels.clone(),
            ));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in &package {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(content)
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))?;
        }
        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        log::debug!("Wrote presentation with {} slides", count);
        Ok(cursor.into_inner())
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

/// Builds one slide's shape tree.
struct SlideWriter<'a> {
    options: &'a PptxOptions,
    xml: String,
    next_id: u32,
}

impl<'a> SlideWriter<'a> {
    fn new(options: &'a PptxOptions) -> Self {
        Self {
            options,
            xml: String::new(),
            next_id: 2,
        }
    }

    fn shape_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn write(&mut self, slide: &Slide, body_size: u32) -> fmt::Result {
        let options = self.options;
        self.text_box(
            "Title",
            (MARGIN_X, TITLE_Y, BODY_WIDTH, TITLE_HEIGHT),
            "b",
            |w| {
                w.xml.push_str("<a:p><a:pPr><a:buNone/></a:pPr>");
                w.run(
                    &Span::bold(slide.title.as_str()),
                    options.title_size,
                    false,
                    &options.title_color,
                )?;
                w.xml.push_str("</a:p>");
                Ok(())
            },
        )?;

        let width_pt = BODY_WIDTH as f32 / EMU_PER_PT;
        let blocks = blocks(slide);
        let table_size = table_font_size(body_size);
        let row_emus: Vec<Vec<i64>> = blocks
            .iter()
            .map(|block| match block {
                Block::Text(_) => Vec::new(),
                Block::Table { headers, rows } => {
                    row_heights(headers, rows, table_size as f32, width_pt)
                        .into_iter()
                        .map(emu)
                        .collect()
                }
            })
            .collect();
        let natural: Vec<i64> = blocks
            .iter()
            .zip(&row_emus)
            .map(|(block, rows)| match block {
                Block::Text(paragraphs) => {
                    emu(text_height(paragraphs, body_size as f32, width_pt))
                }
                Block::Table { .. } => rows.iter().sum(),
            })
            .collect();

        let (shrink, frames) = stack(&natural);
        if !shrink.is_none() {
            log::warn!(
                "Slide '{}' overflows at {}pt; scaling its body to {:.0}%",
                slide.title,
                body_size,
                shrink.factor() * 100.0
            );
        }

        for ((block, rows), (y, height)) in blocks.iter().zip(&row_emus).zip(frames) {
            match block {
                Block::Text(paragraphs) => {
                    self.text_box_scaled(
                        "Body",
                        (MARGIN_X, y, BODY_WIDTH, height),
                        "t",
                        shrink,
                        |w| {
                            for paragraph in paragraphs {
                                w.paragraph(paragraph, body_size)?;
                            }
                            Ok(())
                        },
                    )?;
                }
                Block::Table { headers, rows: cells } => {
                    let size = ((table_size as f32 * shrink.factor()).floor() as u32).max(1);
                    let heights: Vec<i64> = rows.iter().map(|h| shrink.apply(*h)).collect();
                    self.table(headers, cells, &heights, size, y)?;
                }
            }
        }
        Ok(())
    }

    fn text_box<F>(
        &mut self,
        name: &str,
        frame: (i64, i64, i64, i64),
        anchor: &str,
        body: F,
    ) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.text_box_scaled(name, frame, anchor, Shrink::NONE, body)
    }

    fn text_box_scaled<F>(
        &mut self,
        name: &str,
        frame: (i64, i64, i64, i64),
        anchor: &str,
        shrink: Shrink,
        body: F,
    ) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        let id = self.shape_id();
        let (x, y, cx, cy) = frame;
        write!(
            self.xml,
            "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name} {id}\"/>\
             <p:cNvSpPr txBox=\"1\"/><p:nvPr/></p:nvSpPr>\
             <p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
             <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>\
             <p:txBody><a:bodyPr wrap=\"square\" lIns=\"0\" tIns=\"0\" \
             rIns=\"0\" bIns=\"0\" anchor=\"{anchor}\">"
        )?;
        if shrink.is_none() {
            self.xml.push_str("<a:normAutofit/>");
        } else {
            // fontScale is in thousandths of a percent, at least 1%.
            let scale = ((shrink.factor() * 100_000.0).floor() as i64).clamp(1_000, 100_000);
            write!(self.xml, "<a:normAutofit fontScale=\"{}\"/>", scale)?;
        }
        self.xml.push_str("</a:bodyPr><a:lstStyle/>");
        body(self)?;
        self.xml.push_str("</p:txBody></p:sp>");
        Ok(())
    }

    fn paragraph(&mut self, paragraph: &TextParagraph, size: u32) -> fmt::Result {
        let spacing = (gap_after(paragraph, size as f32) * 100.0).round() as i64;
        let indent = emu(LIST_INDENT_PT);
        match paragraph.marker {
            Marker::None => write!(self.xml, "<a:p><a:pPr marL=\"0\" indent=\"0\">")?,
            Marker::Bullet | Marker::Number(_) => write!(
                self.xml,
                "<a:p><a:pPr marL=\"{}\" indent=\"-{}\">",
                indent, indent
            )?,
        }
        write!(
            self.xml,
            "<a:lnSpc><a:spcPct val=\"100000\"/></a:lnSpc><a:spcAft><a:spcPts val=\"{}\"/>\
             </a:spcAft>",
            spacing
        )?;
        match paragraph.marker {
            Marker::Bullet => self
                .xml
                .push_str("<a:buFont typeface=\"Arial\"/><a:buChar char=\"\u{2022}\"/>"),
            Marker::None | Marker::Number(_) => self.xml.push_str("<a:buNone/>"),
        }
        self.xml.push_str("</a:pPr>");

        let options = self.options;
        for span in paragraph.spans.iter().filter(|s| !s.text.is_empty()) {
            self.run(span, size, paragraph.italic, &options.text_color)?;
        }
        write!(self.xml, "<a:endParaRPr lang=\"en-US\" sz=\"{}\"/></a:p>", size * 100)
    }

    fn run(&mut self, span: &Span, size: u32, italic: bool, color: &str) -> fmt::Result {
        write!(self.xml, "<a:r><a:rPr lang=\"en-US\" sz=\"{}\"", size * 100)?;
        if span.bold {
            self.xml.push_str(" b=\"1\"");
        }
        if italic {
            self.xml.push_str(" i=\"1\"");
        }
        write!(
            self.xml,
            " dirty=\"0\"><a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill></a:rPr>\
             <a:t>{}</a:t></a:r>",
            color,
            xml_text(&span.text)
        )
    }

    /// A native table; `heights` are row heights in EMU, header first.
    fn table(
        &mut self,
        headers: &[String],
        rows: &[TableRow],
        heights: &[i64],
        size: u32,
        y: i64,
    ) -> fmt::Result {
        let options = self.options;
        let id = self.shape_id();
        let columns = headers.len() as i64;
        let column_width = BODY_WIDTH / columns;
        let total_height: i64 = heights.iter().sum();

        write!(
            self.xml,
            "<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id=\"{id}\" name=\"Table {id}\"/>\
             <p:cNvGraphicFramePr><a:graphicFrameLocks noGrp=\"1\"/></p:cNvGraphicFramePr>\
             <p:nvPr/></p:nvGraphicFramePr>\
             <p:xfrm><a:off x=\"{MARGIN_X}\" y=\"{y}\"/>\
             <a:ext cx=\"{BODY_WIDTH}\" cy=\"{total_height}\"/></p:xfrm>\
             <a:graphic>\
             <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/table\">\
             <a:tbl><a:tblPr firstRow=\"1\" bandRow=\"1\"/><a:tblGrid>"
        )?;
        for _ in headers {
            write!(self.xml, "<a:gridCol w=\"{}\"/>", column_width)?;
        }
        self.xml.push_str("</a:tblGrid>");

        let header_cells: Vec<&str> = headers.iter().map(String::as_str).collect();
        self.table_row(
            &header_cells,
            heights.first().copied().unwrap_or_default(),
            size,
            true,
            Some(&options.header_fill),
        )?;
        for (index, row) in rows.iter().enumerate() {
            let cells: Vec<&str> = (0..headers.len())
                .map(|c| row.cells.get(c).map(String::as_str).unwrap_or_default())
                .collect();
            let fill = (index % 2 == 1).then_some(options.stripe_fill.as_str());
            let height = heights.get(index + 1).copied().unwrap_or_default();
            self.table_row(&cells, height, size, false, fill)?;
        }

        self.xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
        Ok(())
    }

    fn table_row(
        &mut self,
        cells: &[&str],
        height: i64,
        size: u32,
        header: bool,
        fill: Option<&str>,
    ) -> fmt::Result {
        let options = self.options;
        write!(self.xml, "<a:tr h=\"{}\">", height)?;
        for cell in cells {
            self.xml.push_str("<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p>");
            if header {
                self.xml.push_str("<a:pPr algn=\"ctr\"/>");
            }
            if !cell.is_empty() {
                let span = Span {
                    text: cell.to_string(),
                    bold: header,
                };
                let color = if header {
                    &options.header_text_color
                } else {
                    &options.text_color
                };
                self.run(&span, size, false, color)?;
            }
            write!(
                self.xml,
                "<a:endParaRPr lang=\"en-US\" sz=\"{}\"/></a:p></a:txBody><a:tcPr>",
                size * 100
            )?;
            for edge in ["lnL", "lnR", "lnT", "lnB"] {
                write!(
                    self.xml,
                    "<a:{edge} w=\"6350\"><a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>\
                     </a:{edge}>",
                    options.border_color
                )?;
            }
            match fill {
                Some(fill) => write!(
                    self.xml,
                    "<a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>",
                    fill
                )?,
                None => self.xml.push_str("<a:noFill/>"),
            }
            self.xml.push_str("</a:tcPr></a:tc>");
        }
        self.xml.push_str("</a:tr>");
        Ok(())
    }

    fn finish(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<p:sld {}>\
             <p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/>\
             <p:nvPr/></p:nvGrpSpPr>\
             <p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>\
             <a:chOff x=\"0\" y=\"0\"/>\
             <a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>{}</p:spTree></p:cSld>\
             <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
            NAMESPACES, self.xml
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SlideTextReader;
    use medislide_core::spans::note_body;
    use medislide_core::{ContentItem, ListItem};
    use std::io::Read;
    use zip::ZipArchive;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn sample() -> Vec<Slide> {
        vec![
            Slide::new("Septic Shock")
                .with_item(ContentItem::Paragraph {
                    text: "Give early antibiotics within the hour".into(),
                    bold: vec!["early antibiotics".into()],
                })
                .with_item(ContentItem::BulletList {
                    items: vec![ListItem::new("MAP < 65"), ListItem::new("Lactate > 2")],
                })
                .with_item(ContentItem::Note {
                    text: "Note: reassess after fluids".into(),
                }),
            Slide::new("Staging")
                .with_item(ContentItem::NumberedList {
                    items: vec![ListItem::new("Recognise"), ListItem::new("Resuscitate")],
                })
                .with_item(ContentItem::Table {
                    headers: vec!["Stage".into(), "Criteria".into()],
                    rows: vec![
                        TableRow::new(["1", "SIRS"]),
                        TableRow::new(["2", "Organ dysfunction"]),
                        TableRow::new(["3", "Refractory hypotension"]),
                    ],
                }),
        ]
    }

    #[test]
    fn test_one_slide_per_deck_slide() {
        let bytes = PptxExporter::new().export(&sample()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert!(archive.by_name("ppt/slides/slide2.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide3.xml").is_err());
        assert!(archive.by_name("ppt/slides/_rels/slide1.xml.rels").is_ok());
        assert!(part(&bytes, "docProps/app.xml").contains("<Slides>2</Slides>"));
    }

    #[test]
    fn test_exported_text_reads_back() {
        let slides = sample();
        let bytes = PptxExporter::new().export(&slides).unwrap();
        let read = SlideTextReader::new().read(Cursor::new(bytes)).unwrap();

        assert_eq!(read.len(), 2);
        assert_eq!(read[0].title(), Some("Septic Shock"));
        assert_eq!(read[1].title(), Some("Staging"));
        for (slide, text) in slides.iter().zip(&read) {
            let all = text.lines().join("\n");
            for fragment in slide.text_fragments() {
                assert!(all.contains(note_body(fragment)), "missing {:?}", fragment);
            }
        }
    }

    #[test]
    fn test_bold_spans_become_bold_runs() {
        let bytes = PptxExporter::new().export(&sample()).unwrap();
        let read = SlideTextReader::new().read(Cursor::new(bytes)).unwrap();
        assert!(read[0].bold_runs.iter().any(|r| r == "early antibiotics"));
        assert!(read[0].bold_runs.iter().any(|r| r == "Septic Shock"));
        assert!(!read[0].bold_runs.iter().any(|r| r.contains("within")));
        assert!(read[1].bold_runs.iter().any(|r| r == "Criteria"));
    }

    #[test]
    fn test_lists_and_notes() {
        let bytes = PptxExporter::new().export(&sample()).unwrap();
        let first = part(&bytes, "ppt/slides/slide1.xml");
        assert_eq!(first.matches("<a:buChar char=\"\u{2022}\"/>").count(), 2);
        assert!(first.contains(" i=\"1\""));
        assert!(first.contains("<a:t>Note: </a:t>"));

        let read = SlideTextReader::new()
            .read(Cursor::new(bytes))
            .unwrap();
        let lines = read[1].lines();
        assert!(lines.iter().any(|l| *l == "1. Recognise"));
        assert!(lines.iter().any(|l| *l == "2. Resuscitate"));
    }

    #[test]
    fn test_native_table() {
        let bytes = PptxExporter::new().export(&sample()).unwrap();
        let second = part(&bytes, "ppt/slides/slide2.xml");
        assert_eq!(second.matches("<a:tr ").count(), 4);
        assert_eq!(second.matches("<a:gridCol ").count(), 2);
        assert!(second.contains("<a:srgbClr val=\"DCE6F0\"/>"));
        assert_eq!(second.matches("<a:srgbClr val=\"F5F5F5\"/>").count(), 2);
        assert!(second.contains("drawingml/2006/table"));
    }

    #[test]
    fn test_font_size_follows_reference() {
        let items = (0..18)
            .map(|i| ListItem::new(format!("Consideration {} for the differential", i)))
            .collect();
        let long = Slide::new("Long").with_item(ContentItem::BulletList { items });
        let short = Slide::with_message("Short", "Brief");

        let exporter = PptxExporter::new();
        let long_size = exporter.body_font_size(&long);
        assert_eq!(exporter.body_font_size(&short), 20);
        assert!(long_size < 20);

        let bytes = exporter.export(&[long]).unwrap();
        let xml = part(&bytes, "ppt/slides/slide1.xml");
        assert!(xml.contains(&format!("sz=\"{}\"", long_size * 100)));
        assert!(!xml.contains("sz=\"2000\""));
    }

    /// Top edge and height of every positioned shape on a slide.
    fn shape_frames(xml: &str) -> Vec<(i64, i64)> {
        fn attr(tag: &str, name: &str) -> i64 {
            let start = tag.find(name).unwrap() + name.len() + 2;
            let end = start + tag[start..].find('"').unwrap();
            tag[start..end].parse().unwrap()
        }
        xml.split("<a:off ")
            .skip(1)
            .map(|rest| {
                let ext = &rest[rest.find("<a:ext ").unwrap()..];
                (attr(rest, " y"), attr(ext, " cy"))
            })
            .collect()
    }

    fn overflowing_slide() -> Slide {
        let rows = (1..=40)
            .map(|i| TableRow::new([format!("Day {}", i), format!("Review dose {}", i)]))
            .collect();
        Slide::new("Vancomycin Monitoring")
            .with_item(ContentItem::Table {
                headers: vec!["Day".into(), "Action".into()],
                rows,
            })
            .with_item(ContentItem::Paragraph {
                text: "Trough levels guide the next dose".into(),
                bold: vec![],
            })
    }

    #[test]
    fn test_stack_keeps_natural_heights_when_they_fit() {
        let (shrink, frames) = stack(&[100_000, 200_000]);
        assert!(shrink.is_none());
        assert_eq!(frames[0], (BODY_Y, 100_000));
        assert_eq!(frames[1], (BODY_Y + 100_000 + emu(BLOCK_GAP_PT), 200_000));
    }

    #[test]
    fn test_stack_shrinks_to_body_bottom() {
        let natural = vec![3_000_000; 30];
        let (shrink, frames) = stack(&natural);
        assert!(!shrink.is_none());
        let (y, height) = frames.last().copied().unwrap();
        assert!(y + height <= BODY_BOTTOM);
        assert!(frames.iter().all(|(_, h)| *h > 0));
    }

    #[test]
    fn test_overflowing_body_stays_on_slide() {
        let slide = overflowing_slide();
        let bytes = PptxExporter::new().export(&[slide.clone()]).unwrap();
        let xml = part(&bytes, "ppt/slides/slide1.xml");

        let frames = shape_frames(&xml);
        assert_eq!(frames.len(), 4);
        for (y, cy) in frames {
            assert!(y >= 0 && y + cy <= SLIDE_HEIGHT, "shape at {} + {} is off the slide", y, cy);
        }
        assert_eq!(xml.matches("<a:tr ").count(), 41);
        assert!(xml.contains("<a:normAutofit fontScale=\""));

        let read = SlideTextReader::new().read(Cursor::new(bytes)).unwrap();
        let all = read[0].lines().join("\n");
        for fragment in slide.text_fragments() {
            assert!(all.contains(note_body(fragment)), "missing {:?}", fragment);
        }
    }

    #[test]
    fn test_fitting_body_is_not_scaled() {
        let bytes = PptxExporter::new().export(&sample()).unwrap();
        for name in ["ppt/slides/slide1.xml", "ppt/slides/slide2.xml"] {
            let xml = part(&bytes, name);
            assert!(!xml.contains("fontScale"));
            for (y, cy) in shape_frames(&xml) {
                assert!(y + cy <= BODY_BOTTOM);
            }
        }
    }

    #[test]
    fn test_empty_deck_is_valid_package() {
        let bytes = PptxExporter::new().export(&[]).unwrap();
        assert!(part(&bytes, "ppt/presentation.xml").contains("<p:sldIdLst></p:sldIdLst>"));
        assert!(SlideTextReader::new().read(Cursor::new(bytes)).unwrap().is_empty());
    }

    #[test]
    fn test_title_defaults_to_first_slide() {
        let bytes = PptxExporter::new().export(&sample()).unwrap();
        assert!(part(&bytes, "docProps/core.xml").contains("<dc:title>Septic Shock</dc:title>"));
        let bytes = PptxExporter::new()
            .with_title("Sepsis & shock")
            .export(&sample())
            .unwrap();
        assert!(part(&bytes, "docProps/core.xml").contains("Sepsis &amp; shock"));
    }
}
