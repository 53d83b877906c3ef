//! Glyph advance widths for the standard Helvetica faces.
//!
//! Widths are in 1/1000 em, taken from the Adobe core-font metrics for the
//! printable ASCII range. Anything else is measured as an average glyph.

/// Advance used for characters outside the table.
const DEFAULT_WIDTH: u16 = 556;

/// Bullet glyph, present in both faces.
const BULLET_WIDTH: u16 = 350;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // 'p'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Advance width of one character in 1/1000 em.
pub fn char_width(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c {
        ' '..='~' => table[c as usize - 32],
        '\u{2022}' => BULLET_WIDTH,
        _ => DEFAULT_WIDTH,
    }
}

/// Width of `text` set at `size`, in the unit `size` is given in.
pub fn text_width(text: &str, bold: bool, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, bold))).sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(char_width(' ', false), 278);
        assert_eq!(char_width('W', false), 944);
        assert_eq!(char_width('i', false), 222);
        assert_eq!(char_width('i', true), 278);
        assert_eq!(char_width('~', true), 584);
        assert_eq!(char_width('•', false), 350);
        assert_eq!(char_width('é', false), DEFAULT_WIDTH);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let w10 = text_width("Sepsis", false, 10.0);
        let w20 = text_width("Sepsis", false, 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-4);
    }

    #[test]
    fn test_bold_is_wider() {
        assert!(text_width("management", true, 12.0) > text_width("management", false, 12.0));
    }
}
