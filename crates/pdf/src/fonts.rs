//! TrueType fonts embedded in the document.
//!
//! A [`FontProgram`] is a parsed font file: its Unicode cmap, advance
//! widths and the metrics the font descriptor needs. A [`FontSet`] picks the
//! face each character is drawn with, trying the regular or bold face first
//! and then any fallback fonts in order.

use allsorts::binary::read::ReadScope;
use allsorts::font_data::FontData;
use allsorts::subset::{subset, CmapTarget, SubsetProfile};
use allsorts::tables::cmap::{Cmap, CmapSubtable};
use allsorts::tables::FontTableProvider;
use allsorts::tag;
use medislide_core::layout::Measure;
use medislide_core::{Error, Result};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static DEJAVU_SANS: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");
static DEJAVU_SANS_BOLD: &[u8] = include_bytes!("../fonts/DejaVuSans-Bold.ttf");

fn font_error(e: impl fmt::Display) -> Error {
    Error::ExportError(format!("font error: {}", e))
}

fn be_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| font_error("truncated table"))
}

fn be_i16(bytes: &[u8], at: usize) -> Result<i16> {
    be_u16(bytes, at).map(|v| v as i16)
}

fn table_bytes(provider: &impl FontTableProvider, table: u32, name: &str) -> Result<Vec<u8>> {
    let data = provider
        .table_data(table)
        .map_err(font_error)?
        .ok_or_else(|| font_error(format!("missing {} table", name)))?;
    Ok(data.as_ref().to_vec())
}

/// Lower is better; `None` for subtables that are not Unicode.
fn unicode_preference(platform_id: u16, encoding_id: u16) -> Option<u8> {
    match (platform_id, encoding_id) {
        (3, 10) => Some(0),
        (0, 4) | (0, 6) => Some(1),
        (3, 1) => Some(2),
        (0, _) => Some(3),
        _ => None,
    }
}

/// Font-wide metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    /// `[x_min, y_min, x_max, y_max]`
    pub bbox: [i16; 4],
}

/// A parsed TrueType font.
pub struct FontProgram {
    name: String,
    data: Cow<'static, [u8]>,
    cmap: Vec<u8>,
    cmap_subtable: usize,
    advances: Vec<u16>,
    metrics: FontMetrics,
}

impl fmt::Debug for FontProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontProgram")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl FontProgram {
    /// Parse a TrueType font. `name` becomes the PDF base font name.
    pub fn parse(name: impl Into<String>, data: impl Into<Cow<'static, [u8]>>) -> Result<Self> {
        let name: String = name
            .into()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let data: Cow<'static, [u8]> = data.into();

        let (cmap, head, hhea, hmtx, os2) = {
            let scope = ReadScope::new(&data);
            let font = scope.read::<FontData<'_>>().map_err(font_error)?;
            let provider = font.table_provider(0).map_err(font_error)?;
            (
                table_bytes(&provider, tag::CMAP, "cmap")?,
                table_bytes(&provider, tag::HEAD, "head")?,
                table_bytes(&provider, tag::HHEA, "hhea")?,
                table_bytes(&provider, tag::HMTX, "hmtx")?,
                table_bytes(&provider, tag::OS_2, "OS/2").ok(),
            )
        };

        let cmap_subtable = {
            let scope = ReadScope::new(&cmap);
            let table = scope.read::<Cmap<'_>>().map_err(font_error)?;
            table
                .encoding_records()
                .filter_map(|record| {
                    unicode_preference(record.platform_id.0, record.encoding_id.0)
                        .map(|rank| (rank, record.offset as usize))
                })
                .filter(|(_, offset)| scope.offset(*offset).read::<CmapSubtable<'_>>().is_ok())
                .min_by_key(|(rank, _)| *rank)
                .map(|(_, offset)| offset)
                .ok_or_else(|| font_error(format!("{} has no Unicode cmap", name)))?
        };

        let metric_count = usize::from(be_u16(&hhea, 34)?);
        let advances: Vec<u16> = hmtx
            .chunks_exact(4)
            .take(metric_count)
            .map(|m| u16::from_be_bytes([m[0], m[1]]))
            .collect();
        if advances.is_empty() {
            return Err(font_error(format!("{} has no horizontal metrics", name)));
        }

        let units_per_em = be_u16(&head, 18)?;
        if units_per_em == 0 {
            return Err(font_error(format!("{} has zero units per em", name)));
        }
        let ascent = be_i16(&hhea, 4)?;
        let cap_height = os2
            .as_deref()
            .filter(|t| be_u16(t, 0).is_ok_and(|version| version >= 2))
            .and_then(|t| be_i16(t, 88).ok())
            .unwrap_or(ascent);

        let metrics = FontMetrics {
            units_per_em,
            ascent,
            descent: be_i16(&hhea, 6)?,
            cap_height,
            bbox: [
                be_i16(&head, 36)?,
                be_i16(&head, 38)?,
                be_i16(&head, 40)?,
                be_i16(&head, 42)?,
            ],
        };

        log::debug!(
            "Loaded font {} ({} bytes, {} metrics)",
            name,
            data.len(),
            advances.len()
        );
        Ok(Self {
            name,
            data,
            cmap,
            cmap_subtable,
            advances,
            metrics,
        })
    }

    /// DejaVu Sans, bundled with the crate.
    pub fn bundled_regular() -> Result<Self> {
        Self::parse("DejaVuSans", DEJAVU_SANS)
    }

    /// DejaVu Sans Bold, bundled with the crate.
    pub fn bundled_bold() -> Result<Self> {
        Self::parse("DejaVuSans-Bold", DEJAVU_SANS_BOLD)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Glyph for `c`, or `None` when the font does not cover it.
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        let subtable = ReadScope::new(&self.cmap)
            .offset(self.cmap_subtable)
            .read::<CmapSubtable<'_>>()
            .ok()?;
        match subtable.map_glyph(u32::from(c)) {
            Ok(Some(glyph)) if glyph != 0 => Some(glyph),
            _ => None,
        }
    }

    /// Advance width of `glyph` in 1/1000 em.
    pub fn advance(&self, glyph: u16) -> f32 {
        let units = self
            .advances
            .get(usize::from(glyph))
            .or(self.advances.last())
            .copied()
            .unwrap_or(0);
        self.to_thousandths(i32::from(units))
    }

    /// Font units scaled to 1/1000 em.
    pub fn to_thousandths(&self, units: i32) -> f32 {
        units as f32 * 1000.0 / f32::from(self.metrics.units_per_em)
    }

    /// A font file holding only `glyph_ids`, renumbered in the order given.
    /// The first id must be 0.
    pub fn subset(&self, glyph_ids: &[u16]) -> Result<Vec<u8>> {
        let scope = ReadScope::new(&self.data);
        let font = scope.read::<FontData<'_>>().map_err(font_error)?;
        let provider = font.table_provider(0).map_err(font_error)?;
        subset(
            &provider,
            glyph_ids,
            &SubsetProfile::Pdf,
            CmapTarget::default(),
        )
        .map_err(font_error)
    }
}

/// The face and glyph a character is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Index into the set's faces.
    pub face: usize,
    /// 0 when no face covers the character.
    pub glyph: u16,
}

/// Regular and bold faces plus fallbacks, shared by measuring and drawing.
#[derive(Debug, Clone)]
pub struct FontSet {
    faces: Vec<Arc<FontProgram>>,
    resolved: RefCell<HashMap<(char, bool), Glyph>>,
}

impl FontSet {
    const REGULAR: usize = 0;
    const BOLD: usize = 1;

    pub fn new(regular: Arc<FontProgram>, bold: Arc<FontProgram>) -> Self {
        Self {
            faces: vec![regular, bold],
            resolved: RefCell::new(HashMap::new()),
        }
    }

    /// The bundled DejaVu Sans faces.
    pub fn bundled() -> Result<Self> {
        Ok(Self::new(
            Arc::new(FontProgram::bundled_regular()?),
            Arc::new(FontProgram::bundled_bold()?),
        ))
    }

    /// Add a font tried for characters the primary faces lack.
    pub fn with_fallback(mut self, font: Arc<FontProgram>) -> Self {
        self.faces.push(font);
        self.resolved.get_mut().clear();
        self
    }

    pub fn faces(&self) -> &[Arc<FontProgram>] {
        &self.faces
    }

    pub fn face(&self, index: usize) -> &FontProgram {
        &self.faces[index]
    }

    /// Pick the first face covering `c`. Control characters resolve as spaces.
    pub fn resolve(&self, c: char, bold: bool) -> Glyph {
        let c = if c.is_control() { ' ' } else { c };
        if let Some(glyph) = self.resolved.borrow().get(&(c, bold)) {
            return *glyph;
        }

        let primary = if bold { Self::BOLD } else { Self::REGULAR };
        let glyph = std::iter::once(primary)
            .chain(2..self.faces.len())
            .find_map(|face| {
                self.faces[face]
                    .glyph_id(c)
                    .map(|glyph| Glyph { face, glyph })
            })
            .unwrap_or(Glyph {
                face: primary,
                glyph: 0,
            });

        if glyph.glyph == 0 {
            log::warn!("No font covers U+{:04X}; drawing a missing-glyph box", u32::from(c));
        }
        self.resolved.borrow_mut().insert((c, bold), glyph);
        glyph
    }
}

impl Measure for FontSet {
    fn width(&self, text: &str, bold: bool, size: f32) -> f32 {
        let units: f32 = text
            .chars()
            .map(|c| {
                let glyph = self.resolve(c, bold);
                self.faces[glyph.face].advance(glyph.glyph)
            })
            .sum();
        units * size / 1000.0
    }
}
