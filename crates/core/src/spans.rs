//! Bold-span rendering.
//!
//! Splits a text field into plain and emphasized runs given a list of
//! substrings to bold. Every renderer and exporter goes through
//! [`render_spans`], so emphasis is identical on screen, in PDF, in Word and
//! in PowerPoint.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Leading "Note:" label that the model sometimes repeats inside note text.
static NOTE_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^note:\s*").unwrap());

/// A run of text that is either plain or bold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

/// Decompose `text` into plain/bold spans.
///
/// Bold substrings are matched literally, in the order given (earlier entries
/// win when two candidates start at the same position). Substrings that do not
/// occur are ignored. Concatenating the returned spans yields `text`.
pub fn render_spans<S: AsRef<str>>(text: &str, bold: &[S]) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }

    let needles: Vec<&str> = bold
        .iter()
        .map(AsRef::as_ref)
        .filter(|b| !b.is_empty())
        .collect();
    if needles.is_empty() {
        return vec![Span::plain(text)];
    }

    let pattern = needles
        .iter()
        .map(|b| regex::escape(b))
        .collect::<Vec<_>>()
        .join("|");

    let regex = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(e) => {
            log::warn!("Bold pattern rejected, rendering plain text: {}", e);
            return vec![Span::plain(text)];
        }
    };

    let mut spans = Vec::new();
    let mut cursor = 0;
    for found in regex.find_iter(text) {
        if found.start() > cursor {
            spans.push(Span::plain(&text[cursor..found.start()]));
        }
        spans.push(Span::bold(found.as_str()));
        cursor = found.end();
    }
    if cursor < text.len() {
        spans.push(Span::plain(&text[cursor..]));
    }

    spans
}

/// Prefix every span sequence with a plain marker such as "• " or "3. ".
pub fn prefixed_spans<S: AsRef<str>>(prefix: &str, text: &str, bold: &[S]) -> Vec<Span> {
    let mut spans = Vec::with_capacity(2);
    if !prefix.is_empty() {
        spans.push(Span::plain(prefix));
    }
    spans.extend(render_spans(text, bold));
    spans
}

/// Note text without a duplicated leading "Note:" label.
pub fn note_body(text: &str) -> &str {
    match NOTE_PREFIX_REGEX.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(spans: &[Span]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(render_spans("", &["x"]).is_empty());
    }

    #[test]
    fn test_no_bold_is_single_plain_span() {
        let spans = render_spans::<&str>("Sepsis is common", &[]);
        assert_eq!(spans, vec![Span::plain("Sepsis is common")]);
    }

    #[test]
    fn test_bold_in_middle() {
        let spans = render_spans("Give early antibiotics now", &["early antibiotics"]);
        assert_eq!(
            spans,
            vec![
                Span::plain("Give "),
                Span::bold("early antibiotics"),
                Span::plain(" now"),
            ]
        );
    }

    #[test]
    fn test_repeated_and_edge_matches() {
        let spans = render_spans("MAP MAP target MAP", &["MAP"]);
        assert_eq!(spans.iter().filter(|s| s.bold).count(), 3);
        assert!(spans[0].bold);
        assert_eq!(joined(&spans), "MAP MAP target MAP");
    }

    #[test]
    fn test_missing_substring_is_inert() {
        let spans = render_spans("Lactate above 2", &["procalcitonin"]);
        assert_eq!(spans, vec![Span::plain("Lactate above 2")]);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let spans = render_spans("Dose (mg/kg) x2.5?", &["(mg/kg)", "x2.5?"]);
        assert_eq!(
            spans,
            vec![
                Span::plain("Dose "),
                Span::bold("(mg/kg)"),
                Span::plain(" "),
                Span::bold("x2.5?"),
            ]
        );
    }

    #[test]
    fn test_alternation_order_decides_overlap() {
        let shorter_first = render_spans("septic shock", &["septic", "septic shock"]);
        assert_eq!(shorter_first[0], Span::bold("septic"));
        assert_eq!(shorter_first[1], Span::plain(" shock"));

        let longer_first = render_spans("septic shock", &["septic shock", "septic"]);
        assert_eq!(longer_first, vec![Span::bold("septic shock")]);
    }

    #[test]
    fn test_empty_bold_entries_ignored() {
        let spans = render_spans("Heart rate", &["", "rate"]);
        assert_eq!(spans, vec![Span::plain("Heart "), Span::bold("rate")]);
    }

    #[test]
    fn test_lossless_decomposition() {
        let cases: &[(&str, &[&str])] = &[
            ("qSOFA ≥ 2 suggests sepsis", &["qSOFA", "sepsis"]),
            ("ÄÖÜ mixed ünïcode", &["ünï", "Ä"]),
            ("a.b.c", &["."]),
            ("overlap abcabc", &["abc", "bca"]),
        ];
        for (text, bold) in cases {
            assert_eq!(joined(&render_spans(text, bold)), *text);
        }
    }

    #[test]
    fn test_prefixed_spans() {
        let spans = prefixed_spans("1. ", "Assess airway", &["airway"]);
        assert_eq!(spans[0], Span::plain("1. "));
        assert_eq!(spans[2], Span::bold("airway"));
    }

    #[test]
    fn test_note_body() {
        assert_eq!(note_body("Note: check renal dose"), "check renal dose");
        assert_eq!(note_body("NOTE:   caution"), "caution");
        assert_eq!(note_body("No label here"), "No label here");
    }
}
