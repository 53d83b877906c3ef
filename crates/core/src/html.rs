//! On-screen rendering of slides as HTML fragments.

use crate::spans::{note_body, render_spans, Span};
use crate::types::{ContentItem, ListItem, Slide};
use std::fmt::Write;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_spans(out: &mut String, spans: &[Span]) {
    for span in spans {
        if span.bold {
            let _ = write!(out, "<strong>{}</strong>", escape_html(&span.text));
        } else {
            out.push_str(&escape_html(&span.text));
        }
    }
}

fn push_list(out: &mut String, tag: &str, items: &[ListItem]) {
    let _ = write!(out, "<{}>", tag);
    for item in items {
        out.push_str("<li>");
        push_spans(out, &render_spans(&item.text, &item.bold));
        out.push_str("</li>");
    }
    let _ = write!(out, "</{}>", tag);
}

/// Render one content block.
pub fn render_item(item: &ContentItem) -> String {
    let mut out = String::new();
    match item {
        ContentItem::Paragraph { text, bold } => {
            out.push_str("<p>");
            push_spans(&mut out, &render_spans(text, bold));
            out.push_str("</p>");
        }
        ContentItem::BulletList { items } => push_list(&mut out, "ul", items),
        ContentItem::NumberedList { items } => push_list(&mut out, "ol", items),
        ContentItem::Note { text } => {
            let _ = write!(
                out,
                "<p class=\"note\"><em>Note: {}</em></p>",
                escape_html(note_body(text))
            );
        }
        ContentItem::Table { headers, rows } => {
            out.push_str("<table><thead><tr>");
            for header in headers {
                let _ = write!(out, "<th>{}</th>", escape_html(header));
            }
            out.push_str("</tr></thead><tbody>");
            for row in rows {
                out.push_str("<tr>");
                for cell in &row.cells {
                    let _ = write!(out, "<td>{}</td>", escape_html(cell));
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody></table>");
        }
    }
    out
}

/// Render one slide as a `<section>`.
pub fn render_slide(slide: &Slide) -> String {
    let mut out = String::from("<section class=\"slide\">");
    let _ = write!(out, "<h2>{}</h2>", escape_html(&slide.title));
    for item in &slide.content {
        out.push_str(&render_item(item));
    }
    out.push_str("</section>");
    out
}

/// Render a deck, one section per slide.
pub fn render_slides(slides: &[Slide]) -> String {
    slides
        .iter()
        .map(render_slide)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableRow;

    #[test]
    fn test_paragraph_bold_and_escaping() {
        let item = ContentItem::Paragraph {
            text: "Na < 135 is hyponatremia".into(),
            bold: vec!["hyponatremia".into()],
        };
        assert_eq!(
            render_item(&item),
            "<p>Na &lt; 135 is <strong>hyponatremia</strong></p>"
        );
    }

    #[test]
    fn test_note_label_not_doubled() {
        let item = ContentItem::Note {
            text: "Note: adjust for renal function".into(),
        };
        assert_eq!(
            render_item(&item),
            "<p class=\"note\"><em>Note: adjust for renal function</em></p>"
        );
    }

    #[test]
    fn test_lists_and_tables() {
        let slide = Slide::new("Staging")
            .with_item(ContentItem::NumberedList {
                items: vec![ListItem::new("First").with_bold("First")],
            })
            .with_item(ContentItem::Table {
                headers: vec!["Stage".into()],
                rows: vec![TableRow::new(["I"])],
            });
        let html = render_slide(&slide);
        assert!(html.starts_with("<section class=\"slide\"><h2>Staging</h2>"));
        assert!(html.contains("<ol><li><strong>First</strong></li></ol>"));
        assert!(html.contains("<th>Stage</th>"));
        assert!(html.contains("<td>I</td>"));
    }

    #[test]
    fn test_render_slides_joins_sections() {
        let html = render_slides(&[Slide::new("A"), Slide::new("B")]);
        assert_eq!(html.matches("<section").count(), 2);
    }
}
