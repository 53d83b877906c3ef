//! Slide deck layout onto A4 pages.

use crate::document::{mm_to_pt, pt_to_mm, Font, PdfDocument, Rgb};
use crate::fonts::{FontProgram, FontSet};
use medislide_core::layout::{wrap_spans_with, wrap_text_with, Line, Measure};
use medislide_core::spans::{note_body, prefixed_spans, render_spans, Span};
use medislide_core::{
    ContentItem, DocumentExporter, Error, ExportFormat, Result, Slide, TableRow,
};
use std::sync::Arc;

/// Line height in millimetres per point of font size.
const LINE_HEIGHT_FACTOR: f32 = 0.4;

/// Baseline offset below the top of a line, as a share of the line height.
const BASELINE_FACTOR: f32 = 0.8;

/// Page geometry, type sizes and colours.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub title_size: f32,
    pub paragraph_size: f32,
    pub list_size: f32,
    pub table_size: f32,
    pub list_indent: f32,
    pub item_spacing: f32,
    pub block_spacing: f32,
    pub title_spacing: f32,
    pub cell_padding: f32,
    pub title_color: Rgb,
    pub text_color: Rgb,
    pub header_fill: Rgb,
    pub header_text: Rgb,
    pub odd_row_fill: Rgb,
    pub border_color: Rgb,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 20.0,
            title_size: 18.0,
            paragraph_size: 12.0,
            list_size: 11.0,
            table_size: 10.0,
            list_indent: 10.0,
            item_spacing: 3.0,
            block_spacing: 10.0,
            title_spacing: 15.0,
            cell_padding: 2.0,
            title_color: Rgb(0x4A, 0x90, 0xE2),
            text_color: Rgb(0x33, 0x33, 0x33),
            header_fill: Rgb(220, 230, 240),
            header_text: Rgb(0x2C, 0x3E, 0x50),
            odd_row_fill: Rgb(245, 245, 245),
            border_color: Rgb(200, 200, 200),
        }
    }
}

impl PdfOptions {
    pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_title_color(mut self, color: Rgb) -> Self {
        self.title_color = color;
        self
    }

    fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }
}

/// Exports a deck as a PDF with one or more pages per slide.
///
/// Text is set in the bundled DejaVu Sans faces unless other faces are
/// given; fallback fonts cover characters those faces lack.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    options: PdfOptions,
    title: Option<String>,
    faces: Option<(Arc<FontProgram>, Arc<FontProgram>)>,
    fallbacks: Vec<Arc<FontProgram>>,
}

impl PdfExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: PdfOptions) -> Self {
        self.options = options;
        self
    }

    /// Document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replace the bundled regular and bold faces.
    pub fn with_fonts(mut self, regular: FontProgram, bold: FontProgram) -> Self {
        self.faces = Some((Arc::new(regular), Arc::new(bold)));
        self
    }

    /// Add a font for characters the main faces do not cover.
    pub fn with_fallback_font(mut self, font: FontProgram) -> Self {
        self.fallbacks.push(Arc::new(font));
        self
    }

    fn font_set(&self) -> Result<FontSet> {
        let fonts = match &self.faces {
            Some((regular, bold)) => FontSet::new(regular.clone(), bold.clone()),
            None => FontSet::bundled()?,
        };
        Ok(self
            .fallbacks
            .iter()
            .cloned()
            .fold(fonts, FontSet::with_fallback))
    }
}

impl DocumentExporter for PdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn export(&self, slides: &[Slide]) -> Result<Vec<u8>> {
        let opts = &self.options;
        if opts.content_width() <= 0.0 || opts.page_height <= 2.0 * opts.margin {
            return Err(Error::ExportError(
                "page is too small for its margins".to_string(),
            ));
        }

        let mut doc = PdfDocument::new(opts.page_width, opts.page_height, self.font_set()?);
        if let Some(title) = &self.title {
            doc = doc.with_title(title.as_str());
        }

        let mut layout = PageLayout::new(opts, doc);
        for (index, slide) in slides.iter().enumerate() {
            if index > 0 {
                layout.new_page();
            }
            layout.slide(slide);
        }

        log::debug!(
            "Laid out {} slide(s) on {} page(s)",
            slides.len(),
            layout.doc.page_count()
        );
        layout.doc.finish()
    }
}

fn line_height(size: f32) -> f32 {
    size * LINE_HEIGHT_FACTOR
}

/// Cursor over the page sequence.
struct PageLayout<'a> {
    opts: &'a PdfOptions,
    doc: PdfDocument,
    y: f32,
}

impl<'a> PageLayout<'a> {
    fn new(opts: &'a PdfOptions, mut doc: PdfDocument) -> Self {
        doc.add_page();
        Self {
            opts,
            doc,
            y: opts.margin,
        }
    }

    fn bottom(&self) -> f32 {
        self.opts.page_height - self.opts.margin
    }

    fn new_page(&mut self) {
        self.doc.add_page();
        self.y = self.opts.margin;
    }

    /// Break the page if `height` does not fit below the cursor.
    fn reserve(&mut self, height: f32) {
        if self.y + height > self.bottom() && self.y > self.opts.margin {
            self.new_page();
        }
    }

    fn slide(&mut self, slide: &Slide) {
        let opts = self.opts;
        let spans = vec![Span::bold(slide.title.as_str())];
        self.text_block(
            &spans,
            opts.margin,
            opts.content_width(),
            opts.title_size,
            opts.title_color,
            false,
        );
        self.y += opts.title_spacing;

        for item in &slide.content {
            self.item(item);
        }
    }

    fn item(&mut self, item: &ContentItem) {
        let opts = self.opts;
        match item {
            ContentItem::Paragraph { text, bold } => {
                let spans = render_spans(text, bold);
                self.text_block(
                    &spans,
                    opts.margin,
                    opts.content_width(),
                    opts.paragraph_size,
                    opts.text_color,
                    false,
                );
            }
            ContentItem::BulletList { items } | ContentItem::NumberedList { items } => {
                let numbered = matches!(item, ContentItem::NumberedList { .. });
                for (i, entry) in items.iter().enumerate() {
                    let prefix = if numbered {
                        format!("{}. ", i + 1)
                    } else {
                        "\u{2022} ".to_string()
                    };
                    let spans = prefixed_spans(&prefix, &entry.text, &entry.bold);
                    self.text_block(
                        &spans,
                        opts.margin + opts.list_indent,
                        opts.content_width() - opts.list_indent,
                        opts.list_size,
                        opts.text_color,
                        false,
                    );
                    self.y += opts.item_spacing;
                }
            }
            ContentItem::Note { text } => {
                let spans = vec![Span::plain(format!("Note: {}", note_body(text)))];
                self.text_block(
                    &spans,
                    opts.margin,
                    opts.content_width(),
                    opts.list_size,
                    opts.text_color,
                    true,
                );
            }
            ContentItem::Table { headers, rows } => self.table(headers, rows),
        }
        self.y += opts.block_spacing;
    }

    /// Wrap and draw styled text, keeping the block on one page when it fits.
    fn text_block(
        &mut self,
        spans: &[Span],
        x: f32,
        width: f32,
        size: f32,
        color: Rgb,
        italic: bool,
    ) {
        let lh = line_height(size);
        // Metrics are in points when measured at the point size.
        let lines: Vec<Line> = wrap_spans_with(self.doc.fonts(), spans, size, mm_to_pt(width));
        if lines.is_empty() {
            return;
        }

        self.reserve(lines.len() as f32 * lh);
        for line in &lines {
            if self.y + lh > self.bottom() && self.y > self.opts.margin {
                self.new_page();
            }
            let baseline = self.y + lh * BASELINE_FACTOR;
            let mut cursor = x;
            for span in &line.spans {
                let font = Font::for_style(span.bold, italic);
                self.doc
                    .text(cursor, baseline, font, size, color, &span.text);
                cursor += pt_to_mm(self.doc.fonts().width(&span.text, span.bold, size));
            }
            self.y += lh;
        }
    }

    fn cell_lines(&self, text: &str, bold: bool, col_width: f32) -> Vec<String> {
        let inner = (col_width - 2.0 * self.opts.cell_padding).max(1.0);
        let lines = wrap_text_with(
            self.doc.fonts(),
            text,
            bold,
            self.opts.table_size,
            mm_to_pt(inner),
        );
        if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        }
    }

    fn row_height(&self, cells: &[Vec<String>]) -> f32 {
        let lh = line_height(self.opts.table_size);
        let max_lines = cells.iter().map(Vec::len).max().unwrap_or(1);
        max_lines as f32 * lh + 2.0 * self.opts.cell_padding
    }

    fn draw_row(
        &mut self,
        cells: &[Vec<String>],
        height: f32,
        col_width: f32,
        header: bool,
        fill: Rgb,
    ) {
        let opts = self.opts;
        let lh = line_height(opts.table_size);
        let (font, color) = if header {
            (Font::Bold, opts.header_text)
        } else {
            (Font::Regular, opts.text_color)
        };
        let top = self.y;

        for (col, lines) in cells.iter().enumerate() {
            let x = opts.margin + col as f32 * col_width;
            let page = self.doc.current_page();
            page.fill_rect(x, top, col_width, height, fill);
            if !header {
                page.stroke_rect(x, top, col_width, height, opts.border_color);
            }
            let offset = (height - 2.0 * opts.cell_padding - lines.len() as f32 * lh) / 2.0;
            for (i, line) in lines.iter().enumerate() {
                let baseline =
                    top + opts.cell_padding + offset + i as f32 * lh + lh * BASELINE_FACTOR;
                self.doc
                    .text(x + opts.cell_padding, baseline, font, opts.table_size, color, line);
            }
        }
        self.y += height;
    }

    fn table(&mut self, headers: &[String], rows: &[TableRow]) {
        if headers.is_empty() {
            log::warn!("Skipping table without headers");
            return;
        }
        let opts = self.opts;
        let col_width = opts.content_width() / headers.len() as f32;

        let header_cells: Vec<Vec<String>> = headers
            .iter()
            .map(|h| self.cell_lines(h, true, col_width))
            .collect();
        let header_height = self.row_height(&header_cells);

        self.reserve(line_height(opts.table_size) + 2.0 * opts.cell_padding);
        self.draw_row(&header_cells, header_height, col_width, true, opts.header_fill);

        for (index, row) in rows.iter().enumerate() {
            let cells: Vec<Vec<String>> = row
                .cells
                .iter()
                .map(|c| self.cell_lines(c, false, col_width))
                .collect();
            let height = self.row_height(&cells);

            if self.y + height > self.bottom() {
                self.new_page();
                self.draw_row(&header_cells, header_height, col_width, true, opts.header_fill);
            }

            let fill = if index % 2 == 0 { Rgb::WHITE } else { opts.odd_row_fill };
            self.draw_row(&cells, height, col_width, false, fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readback::{shown_text, text_blocks};
    use medislide_core::ListItem;

    fn export(slides: &[Slide]) -> Vec<u8> {
        PdfExporter::new().export(slides).unwrap()
    }

    fn page_count(pdf: &[u8]) -> usize {
        String::from_utf8_lossy(pdf).matches("/Type /Page ").count()
    }

    #[test]
    fn test_titles_and_text_survive() {
        let slide = Slide::new("Septic Shock")
            .with_item(ContentItem::Paragraph {
                text: "Start early antibiotics".into(),
                bold: vec!["early antibiotics".into()],
            })
            .with_item(ContentItem::BulletList {
                items: vec![ListItem::new("Lactate")],
            })
            .with_item(ContentItem::NumberedList {
                items: vec![ListItem::new("Fluids"), ListItem::new("Pressors")],
            });

        let shown = shown_text(&export(&[slide]));

        assert_eq!(shown[0], "Septic Shock");
        assert!(shown.contains(&"Start ".to_string()));
        assert!(shown.contains(&"early antibiotics".to_string()));
        assert!(shown.contains(&"\u{2022} Lactate".to_string()));
        assert!(shown.contains(&"2. Pressors".to_string()));
    }

    #[test]
    fn test_non_latin_text_is_kept_literally() {
        let slide = Slide::new("β-blockers in HFrEF")
            .with_item(ContentItem::paragraph("β-blockers, HR ≤ 70"))
            .with_item(ContentItem::Table {
                headers: vec!["Target".into()],
                rows: vec![TableRow::new(["SpO2 ≥ 94%"])],
            });

        let shown = shown_text(&export(&[slide]));

        assert_eq!(shown[0], "β-blockers in HFrEF");
        assert!(shown.contains(&"β-blockers, HR ≤ 70".to_string()));
        assert!(shown.contains(&"SpO2 ≥ 94%".to_string()));
    }

    #[test]
    fn test_uncovered_script_still_reads_back() {
        let slide = Slide::new("T").with_item(ContentItem::paragraph("Target HR ≤ 70 bpm; 心衰"));
        let shown = shown_text(&export(&[slide]));
        assert!(shown.contains(&"Target HR ≤ 70 bpm; 心衰".to_string()));
    }

    #[test]
    fn test_fallback_font_draws_missing_characters() {
        // The bundled bold face lacks the sans-serif mathematical letters.
        let exporter =
            PdfExporter::new().with_fallback_font(FontProgram::bundled_regular().unwrap());
        let pdf = exporter.export(&[Slide::new("\u{1D5A0}b")]).unwrap();
        let blocks = text_blocks(&pdf);
        assert_eq!(blocks[0].text, "\u{1D5A0}b");
        assert_eq!(blocks[0].fonts, vec!["F3", "F2"]);
    }

    #[test]
    fn test_custom_faces_replace_bundled() {
        let exporter = PdfExporter::new().with_fonts(
            FontProgram::bundled_bold().unwrap(),
            FontProgram::bundled_regular().unwrap(),
        );
        let pdf = exporter.export(&[Slide::new("Sepsis")]).unwrap();
        let raw = String::from_utf8_lossy(&pdf).into_owned();
        assert!(raw.contains("+DejaVuSans /Encoding /Identity-H"));
        assert!(!raw.contains("DejaVuSans-Bold"));
        assert_eq!(shown_text(&pdf), vec!["Sepsis"]);
    }

    #[test]
    fn test_bold_span_uses_bold_face() {
        let slide = Slide::new("T").with_item(ContentItem::Paragraph {
            text: "Give MAP target".into(),
            bold: vec!["MAP".into()],
        });
        let blocks = text_blocks(&export(&[slide]));
        let bold = blocks.iter().find(|b| b.text == "MAP").unwrap();
        assert_eq!(bold.fonts, vec!["F2"]);
        assert_eq!(bold.size, 12.0);
        let plain = blocks.iter().find(|b| b.text == "Give ").unwrap();
        assert_eq!(plain.fonts, vec!["F1"]);
    }

    #[test]
    fn test_one_page_per_slide() {
        let pdf = export(&[Slide::new("A"), Slide::new("B"), Slide::new("C")]);
        assert_eq!(page_count(&pdf), 3);
    }

    #[test]
    fn test_note_is_italic_with_single_label() {
        let slide = Slide::new("T").with_item(ContentItem::Note {
            text: "Note: check potassium".into(),
        });
        let blocks = text_blocks(&export(&[slide]));
        let note = blocks
            .iter()
            .find(|b| b.text.contains("check potassium"))
            .unwrap();
        assert!(note.italic);
        assert_eq!(note.text, "Note: check potassium");
        assert!(!blocks[0].italic);
    }

    #[test]
    fn test_long_table_repeats_header_on_next_page() {
        let rows = (0..60)
            .map(|i| TableRow::new([format!("Row {}", i), "value".to_string()]))
            .collect();
        let slide = Slide::new("Labs").with_item(ContentItem::Table {
            headers: vec!["Test".into(), "Result".into()],
            rows,
        });

        let pdf = export(&[slide]);
        let shown = shown_text(&pdf);

        assert!(page_count(&pdf) >= 2);
        assert!(shown.iter().filter(|s| *s == "Test").count() >= 2);
        assert!(shown.contains(&"Row 59".to_string()));
    }

    #[test]
    fn test_long_paragraph_spills_onto_new_page() {
        let text = "Hemodynamic monitoring guides resuscitation. ".repeat(200);
        let slide = Slide::new("Monitoring").with_item(ContentItem::paragraph(text));
        let pdf = export(&[slide]);
        assert!(page_count(&pdf) >= 2);
    }

    #[test]
    fn test_empty_deck_is_valid_pdf() {
        let pdf = export(&[]);
        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn test_margins_larger_than_page_fail() {
        let exporter = PdfExporter::new().with_options(PdfOptions::default().with_margin(120.0));
        assert!(matches!(exporter.export(&[]), Err(Error::ExportError(_))));
    }
}
