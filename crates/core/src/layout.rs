//! Greedy word wrapping of styled spans.

use crate::metrics::text_width;
use crate::spans::Span;

/// Measures set text.
pub trait Measure {
    /// Width of `text` set at `size`, in the unit `size` is given in.
    fn width(&self, text: &str, bold: bool, size: f32) -> f32;
}

/// The standard Helvetica metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Helvetica;

impl Measure for Helvetica {
    fn width(&self, text: &str, bold: bool, size: f32) -> f32 {
        text_width(text, bold, size)
    }
}

/// Slack for accumulated floating-point error when comparing widths.
const EPSILON: f32 = 1e-3;

/// One wrapped line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub spans: Vec<Span>,
    /// Measured width, in the unit of the font size passed to the wrapper.
    pub width: f32,
}

impl Line {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn push(&mut self, text: &str, bold: bool, width: f32) {
        match self.spans.last_mut() {
            Some(last) if last.bold == bold => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                bold,
            }),
        }
        self.width += width;
    }

    fn trim_end(&mut self, measure: &impl Measure, size: f32) {
        while let Some(last) = self.spans.last_mut() {
            let trimmed_len = last.text.trim_end().len();
            let removed = &last.text[trimmed_len..];
            self.width -= measure.width(removed, last.bold, size);
            last.text.truncate(trimmed_len);
            if last.text.is_empty() {
                self.spans.pop();
            } else {
                break;
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Split spans into alternating whitespace and word tokens.
fn tokens(spans: &[Span]) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    for span in spans {
        let text = span.text.as_str();
        let mut start = 0;
        let mut in_space: Option<bool> = None;
        for (i, c) in text.char_indices() {
            let space = c.is_whitespace();
            if in_space.is_some_and(|s| s != space) {
                out.push((&text[start..i], span.bold));
                start = i;
            }
            in_space = Some(space);
        }
        if start < text.len() {
            out.push((&text[start..], span.bold));
        }
    }
    out
}

/// Wrap `spans` into lines no wider than `max_width`, measured with the
/// Helvetica metrics.
pub fn wrap_spans(spans: &[Span], size: f32, max_width: f32) -> Vec<Line> {
    wrap_spans_with(&Helvetica, spans, size, max_width)
}

/// Wrap `spans` into lines no wider than `max_width`.
///
/// Whitespace at the start of a wrapped line is dropped and a word wider
/// than a whole line is broken between characters. Empty input yields no
/// lines.
pub fn wrap_spans_with(
    measure: &impl Measure,
    spans: &[Span],
    size: f32,
    max_width: f32,
) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for (token, bold) in tokens(spans) {
        let width = measure.width(token, bold, size);

        if token.chars().all(char::is_whitespace) {
            if !line.is_empty() {
                let flat = token.replace(['\n', '\r', '\t'], " ");
                line.push(&flat, bold, measure.width(&flat, bold, size));
            }
            continue;
        }

        if line.width + width <= max_width + EPSILON {
            line.push(token, bold, width);
            continue;
        }

        if !line.is_empty() {
            line.trim_end(measure, size);
            lines.push(std::mem::take(&mut line));
        }

        if width <= max_width + EPSILON {
            line.push(token, bold, width);
            continue;
        }

        for c in token.chars() {
            let mut buf = [0u8; 4];
            let piece: &str = c.encode_utf8(&mut buf);
            let piece_width = measure.width(piece, bold, size);
            if !line.is_empty() && line.width + piece_width > max_width + EPSILON {
                lines.push(std::mem::take(&mut line));
            }
            line.push(piece, bold, piece_width);
        }
    }

    line.trim_end(measure, size);
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Wrap plain text, returning only the line strings.
pub fn wrap_text(text: &str, bold: bool, size: f32, max_width: f32) -> Vec<String> {
    wrap_text_with(&Helvetica, text, bold, size, max_width)
}

pub fn wrap_text_with(
    measure: &impl Measure,
    text: &str,
    bold: bool,
    size: f32,
    max_width: f32,
) -> Vec<String> {
    let span = Span {
        text: text.to_string(),
        bold,
    };
    wrap_spans_with(measure, std::slice::from_ref(&span), size, max_width)
        .iter()
        .map(Line::text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    #[test]
    fn test_short_text_is_one_line() {
        let lines = wrap_spans(&[Span::plain("Fever and chills")], 10.0, 500.0);
        assert_eq!(texts(&lines), vec!["Fever and chills"]);
    }

    #[test]
    fn test_wraps_on_word_boundaries() {
        let width = text_width("alpha beta", false, 10.0);
        let lines = wrap_spans(&[Span::plain("alpha beta alpha beta")], 10.0, width);
        assert_eq!(texts(&lines), vec!["alpha beta", "alpha beta"]);
        assert!(lines.iter().all(|l| l.width <= width + EPSILON));
    }

    #[test]
    fn test_bold_runs_survive_wrapping() {
        let spans = vec![
            Span::plain("Give "),
            Span::bold("early IV"),
            Span::plain(" now"),
        ];
        let width = text_width("Give early", false, 10.0) + 2.0;
        let lines = wrap_spans(&spans, 10.0, width);
        assert_eq!(lines[0].spans, vec![Span::plain("Give "), Span::bold("early")]);
        assert_eq!(lines[1].spans[0], Span::bold("IV"));
        assert_eq!(lines[1].text(), "IV now");
    }

    #[test]
    fn test_overlong_word_is_broken() {
        let lines = wrap_text("Pneumonoultramicroscopic", false, 10.0, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "Pneumonoultramicroscopic");
    }

    #[test]
    fn test_leading_whitespace_dropped() {
        let lines = wrap_text("   indented", false, 10.0, 500.0);
        assert_eq!(lines, vec!["indented"]);
    }

    /// Every character is one unit wide.
    struct Monospace;

    impl Measure for Monospace {
        fn width(&self, text: &str, _bold: bool, size: f32) -> f32 {
            text.chars().count() as f32 * size
        }
    }

    #[test]
    fn test_custom_measure() {
        let lines = wrap_text_with(&Monospace, "ab cd ef", false, 1.0, 5.0);
        assert_eq!(lines, vec!["ab cd", "ef"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(wrap_text("", false, 10.0, 100.0).is_empty());
        assert!(wrap_text("   ", false, 10.0, 100.0).is_empty());
    }
}
