//! Minimal PDF 1.4 object writer.
//!
//! Pages are drawn in millimetres from the top-left corner; the writer
//! converts to PDF points with a bottom-left origin. Content streams are left
//! uncompressed. Text is shown through Type0 fonts with two-byte codes
//! assigned per face in first-use order; each embedded face is subset to the
//! glyphs it draws.

use crate::encoding::{hex_codes, text_string, to_unicode_cmap};
use crate::fonts::{FontProgram, FontSet};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use medislide_core::Result;
use std::collections::HashMap;
use std::io::Write;

const PT_PER_MM: f32 = 72.0 / 25.4;

/// Horizontal shear of the slanted text matrix (tan 12°).
const OBLIQUE_SKEW: f32 = 0.2126;

/// Millimetres to points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

/// Points to millimetres.
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / PT_PER_MM
}

/// Text styles. Italic styles slant the regular or bold face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Font {
    pub fn for_style(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Self::Regular,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (true, true) => Self::BoldItalic,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }
}

/// Resource name of a face.
fn resource(face: usize) -> String {
    format!("F{}", face + 1)
}

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Parse `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    fn components(&self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0
        )
    }
}

/// Drawing operations for one page.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    ops: Vec<u8>,
    page_height_mm: f32,
}

impl Canvas {
    fn new(page_height_mm: f32) -> Self {
        Self {
            ops: Vec::new(),
            page_height_mm,
        }
    }

    fn y_pt(&self, y_mm: f32) -> f32 {
        mm_to_pt(self.page_height_mm - y_mm)
    }

    pub fn fill_rect(&mut self, x_mm: f32, y_mm: f32, w_mm: f32, h_mm: f32, color: Rgb) {
        let _ = writeln!(
            self.ops,
            "{} rg {:.2} {:.2} {:.2} {:.2} re f",
            color.components(),
            mm_to_pt(x_mm),
            self.y_pt(y_mm + h_mm),
            mm_to_pt(w_mm),
            mm_to_pt(h_mm)
        );
    }

    pub fn stroke_rect(&mut self, x_mm: f32, y_mm: f32, w_mm: f32, h_mm: f32, color: Rgb) {
        let _ = writeln!(
            self.ops,
            "{} RG 0.5 w {:.2} {:.2} {:.2} {:.2} re S",
            color.components(),
            mm_to_pt(x_mm),
            self.y_pt(y_mm + h_mm),
            mm_to_pt(w_mm),
            mm_to_pt(h_mm)
        );
    }
}

/// Codes handed out for one face. Code `n` is `chars[n - 1]`; code 0 is unused.
#[derive(Debug, Clone, Default)]
struct CodeMap {
    chars: Vec<(char, u16)>,
    codes: HashMap<char, u16>,
}

impl CodeMap {
    fn code(&mut self, c: char, glyph: u16) -> u16 {
        if let Some(code) = self.codes.get(&c) {
            return *code;
        }
        let Ok(code) = u16::try_from(self.chars.len() + 1) else {
            log::warn!("Out of character codes; U+{:04X} is not drawn", u32::from(c));
            return 0;
        };
        self.chars.push((c, glyph));
        self.codes.insert(c, code);
        code
    }

    fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// A document under construction.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    width_mm: f32,
    height_mm: f32,
    title: Option<String>,
    pages: Vec<Canvas>,
    fonts: FontSet,
    codes: Vec<CodeMap>,
}

impl PdfDocument {
    pub fn new(width_mm: f32, height_mm: f32, fonts: FontSet) -> Self {
        let codes = vec![CodeMap::default(); fonts.faces().len()];
        Self {
            width_mm,
            height_mm,
            title: None,
            pages: Vec::new(),
            fonts,
            codes,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The fonts text is measured and drawn with.
    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Start a new page and return it.
    pub fn add_page(&mut self) -> &mut Canvas {
        self.pages.push(Canvas::new(self.height_mm));
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// The page being drawn on, starting one if none exists.
    pub fn current_page(&mut self) -> &mut Canvas {
        if self.pages.is_empty() {
            return self.add_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Show `text` on the current page with its baseline at `baseline_mm`.
    pub fn text(
        &mut self,
        x_mm: f32,
        baseline_mm: f32,
        font: Font,
        size: f32,
        color: Rgb,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }

        let mut runs: Vec<(usize, Vec<u16>)> = Vec::new();
        for c in text.chars() {
            let c = if c.is_control() { ' ' } else { c };
            let glyph = self.fonts.resolve(c, font.is_bold());
            let code = self.codes[glyph.face].code(c, glyph.glyph);
            match runs.last_mut() {
                Some((face, codes)) if *face == glyph.face => codes.push(code),
                _ => runs.push((glyph.face, vec![code])),
            }
        }

        let skew = if font.is_italic() { OBLIQUE_SKEW } else { 0.0 };
        let page = self.current_page();
        let y = page.y_pt(baseline_mm);
        let _ = write!(
            page.ops,
            "BT {} rg 1 0 {:.3} 1 {:.2} {:.2} Tm",
            color.components(),
            skew,
            mm_to_pt(x_mm),
            y
        );
        for (face, codes) in &runs {
            let _ = write!(
                page.ops,
                " /{} {:.1} Tf <{}> Tj",
                resource(*face),
                size,
                hex_codes(codes)
            );
        }
        page.ops.extend_from_slice(b" ET\n");
    }

    /// Serialize the document.
    pub fn finish(&self) -> Result<Vec<u8>> {
        let mut pages = self.pages.clone();
        if pages.is_empty() {
            pages.push(Canvas::new(self.height_mm));
        }

        const FIRST_FONT: usize = 3;
        const OBJECTS_PER_FONT: usize = 6;
        let used: Vec<usize> = (0..self.codes.len())
            .filter(|face| !self.codes[*face].is_empty())
            .collect();
        let info_id = FIRST_FONT + OBJECTS_PER_FONT * used.len();
        let first_page_id = info_id + 1;
        let object_count = first_page_id + 2 * pages.len();

        let mut out: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; object_count];
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut begin = |out: &mut Vec<u8>, id: usize| -> std::io::Result<()> {
            offsets[id] = out.len();
            writeln!(out, "{} 0 obj", id)
        };

        begin(&mut out, 1)?;
        out.extend_from_slice(b"<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        begin(&mut out, 2)?;
        let kids = (0..pages.len())
            .map(|i| format!("{} 0 R", first_page_id + 2 * i))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            out,
            "<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
            kids,
            pages.len()
        )?;

        for (i, face) in used.iter().enumerate() {
            let first_id = FIRST_FONT + OBJECTS_PER_FONT * i;
            let objects = FontObjects::build(self.fonts.face(*face), &self.codes[*face], *face)?;
            for (offset, body) in objects.bodies(first_id).into_iter().enumerate() {
                begin(&mut out, first_id + offset)?;
                out.extend(body);
                out.extend_from_slice(b"\nendobj\n");
            }
        }

        begin(&mut out, info_id)?;
        out.extend_from_slice(b"<< /Producer (medislide)");
        if let Some(title) = &self.title {
            out.extend_from_slice(b" /Title ");
            out.extend(text_string(title));
        }
        out.extend_from_slice(b" >>\nendobj\n");

        let font_resources = used
            .iter()
            .enumerate()
            .map(|(i, face)| {
                format!(
                    "/{} {} 0 R",
                    resource(*face),
                    FIRST_FONT + OBJECTS_PER_FONT * i
                )
            })
            .collect::<Vec<_>>()
            .join(" ");

        for (i, page) in pages.iter().enumerate() {
            let page_id = first_page_id + 2 * i;
            let contents_id = page_id + 1;

            begin(&mut out, page_id)?;
            write!(
                out,
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << {} >> >> /Contents {} 0 R >>\nendobj\n",
                mm_to_pt(self.width_mm),
                mm_to_pt(self.height_mm),
                font_resources,
                contents_id
            )?;

            begin(&mut out, contents_id)?;
            write!(out, "<< /Length {} >>\nstream\n", page.ops.len())?;
            out.extend_from_slice(&page.ops);
            out.extend_from_slice(b"\nendstream\nendobj\n");
        }

        let xref_at = out.len();
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", object_count)?;
        for offset in &offsets[1..] {
            write!(out, "{:010} 00000 n \n", offset)?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count, info_id, xref_at
        )?;

        Ok(out)
    }
}

/// The six objects describing one embedded face: Type0 font, CID font,
/// descriptor, font file, ToUnicode map and CID-to-glyph map.
struct FontObjects {
    base_font: String,
    widths: Vec<f32>,
    metrics: [i32; 7],
    font_file: Vec<u8>,
    font_file_length: usize,
    to_unicode: String,
    cid_to_gid: Vec<u8>,
}

impl FontObjects {
    fn build(program: &FontProgram, codes: &CodeMap, face: usize) -> Result<Self> {
        let mut glyphs: Vec<u16> = codes
            .chars
            .iter()
            .map(|(_, glyph)| *glyph)
            .filter(|glyph| *glyph != 0)
            .collect();
        glyphs.push(0);
        glyphs.sort_unstable();
        glyphs.dedup();

        let subset = program.subset(&glyphs)?;
        let renumbered = |glyph: u16| -> u16 {
            glyphs
                .binary_search(&glyph)
                .ok()
                .and_then(|position| u16::try_from(position).ok())
                .unwrap_or(0)
        };

        let mut cid_to_gid = vec![0u8, 0u8];
        for (_, glyph) in &codes.chars {
            cid_to_gid.extend_from_slice(&renumbered(*glyph).to_be_bytes());
        }

        let m = program.metrics();
        let scale = |units: i16| program.to_thousandths(i32::from(units)).round() as i32;
        let tag: String = (0..6)
            .map(|i| char::from(b'A' + ((face * 7 + i * 3) % 26) as u8))
            .collect();

        log::debug!(
            "Embedding {} with {} glyph(s) in {} bytes",
            program.name(),
            glyphs.len(),
            subset.len()
        );
        Ok(Self {
            base_font: format!("{}+{}", tag, program.name()),
            widths: codes
                .chars
                .iter()
                .map(|(_, glyph)| program.advance(*glyph))
                .collect(),
            metrics: [
                scale(m.bbox[0]),
                scale(m.bbox[1]),
                scale(m.bbox[2]),
                scale(m.bbox[3]),
                scale(m.ascent),
                scale(m.descent),
                scale(m.cap_height),
            ],
            font_file: deflate(&subset)?,
            font_file_length: subset.len(),
            to_unicode: to_unicode_cmap(
                &codes
                    .chars
                    .iter()
                    .enumerate()
                    .map(|(i, (c, _))| ((i + 1) as u16, *c))
                    .collect::<Vec<_>>(),
            ),
            cid_to_gid: deflate(&cid_to_gid)?,
        })
    }

    fn bodies(&self, first_id: usize) -> Vec<Vec<u8>> {
        let [cid_font, descriptor, file, to_unicode, cid_map] =
            [1, 2, 3, 4, 5].map(|offset| first_id + offset);
        let widths = self
            .widths
            .iter()
            .map(|w| format!("{:.0}", w))
            .collect::<Vec<_>>()
            .join(" ");
        let [x_min, y_min, x_max, y_max, ascent, descent, cap_height] = self.metrics;

        let mut font_file = format!(
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            self.font_file.len(),
            self.font_file_length
        )
        .into_bytes();
        font_file.extend_from_slice(&self.font_file);
        font_file.extend_from_slice(b"\nendstream");

        let mut cid_to_gid = format!(
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            self.cid_to_gid.len()
        )
        .into_bytes();
        cid_to_gid.extend_from_slice(&self.cid_to_gid);
        cid_to_gid.extend_from_slice(b"\nendstream");

        vec![
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
                 /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
                self.base_font, cid_font, to_unicode
            )
            .into_bytes(),
            format!(
                "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
                 /FontDescriptor {} 0 R /DW 1000 /W [1 [{}]] /CIDToGIDMap {} 0 R >>",
                self.base_font, descriptor, widths, cid_map
            )
            .into_bytes(),
            format!(
                "<< /Type /FontDescriptor /FontName /{} /Flags 32 \
                 /FontBBox [{} {} {} {}] /ItalicAngle 0 /Ascent {} /Descent {} \
                 /CapHeight {} /StemV 80 /FontFile2 {} 0 R >>",
                self.base_font, x_min, y_min, x_max, y_max, ascent, descent, cap_height, file
            )
            .into_bytes(),
            font_file,
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                self.to_unicode.len(),
                self.to_unicode
            )
            .into_bytes(),
            cid_to_gid,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readback::shown_text;

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn document() -> PdfDocument {
        PdfDocument::new(210.0, 297.0, FontSet::bundled().unwrap())
    }

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("#4A90E2"), Some(Rgb(0x4A, 0x90, 0xE2)));
        assert_eq!(Rgb::from_hex("333333"), Some(Rgb(0x33, 0x33, 0x33)));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#GG0000"), None);
    }

    #[test]
    fn test_structure_and_xref() {
        let mut doc = document().with_title("Sepsis");
        doc.add_page();
        doc.text(20.0, 30.0, Font::Bold, 18.0, Rgb(0, 0, 0), "Hello (world)");
        doc.add_page().fill_rect(20.0, 20.0, 50.0, 10.0, Rgb::WHITE);

        let bytes = doc.finish().unwrap();
        let text = as_text(&bytes);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("/Count 2"));
        assert!(text.contains("/Subtype /Type0"));
        assert!(text.contains("+DejaVuSans-Bold /Encoding /Identity-H"));
        assert!(text.contains("/FontFile2 "));
        assert!(text.contains("/Title (Sepsis)"));
        assert!(text.trim_end().ends_with("%%EOF"));

        let startxref = text.rfind("startxref\n").unwrap();
        let offset: usize = text[startxref + 10..].lines().next().unwrap().parse().unwrap();
        assert_eq!(&bytes[offset..offset + 4], b"xref");
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = document();
        doc.text(20.0, 30.0, Font::Regular, 12.0, Rgb(0, 0, 0), "β");
        let bytes = doc.finish().unwrap();
        let xref = bytes.windows(6).rposition(|w| w == b"\nxref\n").unwrap();
        let table = as_text(&bytes[xref + 1..]);
        let entries: Vec<usize> = table
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 2 + 6 + 1 + 2);
        for (i, offset) in entries.iter().enumerate() {
            assert!(bytes[*offset..].starts_with(format!("{} 0 obj", i + 1).as_bytes()));
        }
    }

    #[test]
    fn test_unicode_text_reads_back() {
        let mut doc = document();
        doc.text(20.0, 30.0, Font::Regular, 12.0, Rgb(0, 0, 0), "β-blockers, HR ≤ 70");
        let shown = shown_text(&doc.finish().unwrap());
        assert_eq!(shown, vec!["β-blockers, HR ≤ 70"]);
    }

    #[test]
    fn test_codes_are_shared_across_pages() {
        let mut doc = document();
        doc.text(20.0, 30.0, Font::Regular, 12.0, Rgb(0, 0, 0), "aba");
        doc.add_page();
        doc.text(20.0, 30.0, Font::Regular, 12.0, Rgb(0, 0, 0), "ab");
        let text = as_text(&doc.finish().unwrap());
        assert!(text.contains("<000100020001> Tj"));
        assert!(text.contains("<00010002> Tj"));
        assert!(text.contains("2 beginbfchar"));
    }

    #[test]
    fn test_only_used_faces_are_embedded() {
        let mut doc = document();
        doc.text(20.0, 30.0, Font::Italic, 12.0, Rgb(0, 0, 0), "note");
        let text = as_text(&doc.finish().unwrap());
        assert_eq!(text.matches("/Subtype /Type0").count(), 1);
        assert!(text.contains("/Font << /F1 3 0 R >>"));
        assert!(text.contains("1 0 0.213 1 "));
    }

    #[test]
    fn test_unicode_title_is_utf16() {
        let doc = document().with_title("β-blockers");
        let text = as_text(&doc.finish().unwrap());
        assert!(text.contains("/Title <FEFF03B2002D0062"));
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let bytes = document().finish().unwrap();
        let text = as_text(&bytes);
        assert!(text.contains("/Count 1"));
        assert!(!text.contains("/Type0"));
    }

    #[test]
    fn test_unit_conversion() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
        assert!((pt_to_mm(mm_to_pt(20.0)) - 20.0).abs() < 1e-4);
    }
}
