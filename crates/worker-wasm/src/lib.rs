//! WASM wrapper for slide validation, rendering and export.
//!
//! Exposes the validator, the bold-span renderer, the HTML renderer and the
//! three document exporters to JavaScript hosts. AI calls stay on the host
//! side; this crate only turns slide JSON into checked slides and documents.

use medislide_core::{DocumentExporter, ExportFormat, Slide, SlideValidator, Span};
use medislide_docx::DocxExporter;
use medislide_pdf::PdfExporter;
use medislide_pptx::PptxExporter;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Result of validating raw slide JSON.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// The accepted slides.
    pub slides: Vec<Slide>,
    /// Indices of slides whose table rows were padded or truncated.
    pub repaired_slides: Vec<usize>,
    pub repaired_rows: usize,
    /// Content items that were dropped.
    pub rejected: Vec<RejectedItemResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectedItemResult {
    pub slide: usize,
    pub item: usize,
    pub reason: String,
}

/// Validate raw model output (or a saved `{"slides": [...]}` document).
///
/// # Returns
/// A JavaScript object with the slides and the repair report, or throws when
/// the text holds no usable slides.
#[wasm_bindgen]
pub fn validate_slides(text: &str) -> Result<JsValue, JsValue> {
    let result = validate_slides_impl(text).map_err(|e| JsValue::from_str(&e))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn validate_slides_impl(text: &str) -> Result<ValidationResult, String> {
    let validated = SlideValidator::new()
        .validate_text(text)
        .map_err(|e| e.to_string())?;
    let report = validated.report;

    Ok(ValidationResult {
        slides: validated.slides,
        repaired_slides: report.repaired_slides,
        repaired_rows: report.repaired_rows,
        rejected: report
            .rejected_items
            .into_iter()
            .map(|r| RejectedItemResult {
                slide: r.slide,
                item: r.item,
                reason: r.reason,
            })
            .collect(),
    })
}

/// Split `text` into `{text, bold}` runs.
///
/// # Arguments
/// * `text` - The text field to render
/// * `bold` - Array of substrings to emphasize
#[wasm_bindgen]
pub fn render_spans(text: &str, bold: JsValue) -> Result<JsValue, JsValue> {
    let bold: Vec<String> = if bold.is_undefined() || bold.is_null() {
        Vec::new()
    } else {
        serde_wasm_bindgen::from_value(bold)
            .map_err(|e| JsValue::from_str(&format!("Invalid bold array: {}", e)))?
    };

    let spans: Vec<Span> = medislide_core::render_spans(text, bold.as_slice());
    serde_wasm_bindgen::to_value(&spans)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Render an array of slides as HTML.
#[wasm_bindgen]
pub fn render_html(slides: JsValue) -> Result<String, JsValue> {
    let slides = slides_from_js(slides)?;
    Ok(medislide_core::html::render_slides(&slides))
}

/// Export slides as a document.
///
/// # Arguments
/// * `format` - `pdf`, `docx` or `pptx` (also `word` and `powerpoint`)
/// * `slides` - Array of slides
/// * `title` - Document title; PowerPoint falls back to the first slide title
///
/// # Returns
/// The document bytes as a `Uint8Array`.
#[wasm_bindgen]
pub fn export_document(
    format: &str,
    slides: JsValue,
    title: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    let slides = slides_from_js(slides)?;
    export_document_impl(format, &slides, title.as_deref()).map_err(|e| JsValue::from_str(&e))
}

fn export_document_impl(
    format: &str,
    slides: &[Slide],
    title: Option<&str>,
) -> Result<Vec<u8>, String> {
    let format = parse_format(format)?;
    let exporter: Box<dyn DocumentExporter> = match (format, title) {
        (ExportFormat::Pdf, Some(t)) => Box::new(PdfExporter::new().with_title(t)),
        (ExportFormat::Pdf, None) => Box::new(PdfExporter::new()),
        (ExportFormat::Docx, Some(t)) => Box::new(DocxExporter::new().with_title(t)),
        (ExportFormat::Docx, None) => Box::new(DocxExporter::new()),
        (ExportFormat::Pptx, Some(t)) => Box::new(PptxExporter::new().with_title(t)),
        (ExportFormat::Pptx, None) => Box::new(PptxExporter::new()),
    };

    exporter
        .export(slides)
        .map_err(|e| format!("{} export error: {}", format, e))
}

/// File name for an exported document, e.g. `Heart_Failure.pdf`.
#[wasm_bindgen]
pub fn export_file_name(topic: &str, format: &str) -> Result<String, JsValue> {
    let format = parse_format(format).map_err(|e| JsValue::from_str(&e))?;
    Ok(medislide_core::export_file_name(topic, format))
}

fn parse_format(format: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_extension(format).ok_or_else(|| format!("Unknown export format: {}", format))
}

fn slides_from_js(slides: JsValue) -> Result<Vec<Slide>, JsValue> {
    serde_wasm_bindgen::from_value(slides)
        .map_err(|e| JsValue::from_str(&format!("Invalid slides array: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medislide_core::ContentItem;

    #[test]
    fn test_validate_reports_repairs() {
        let text = r#"```json
        [{"title":"Lab values","content":[
            {"type":"table","headers":["Test","Value"],"rows":[{"cells":["Na"]},{"cells":["K","4.1","extra"]}]},
            {"type":"video","url":"x"}
        ]}]
        ```"#;

        let result = validate_slides_impl(text).unwrap();
        assert_eq!(result.slides.len(), 1);
        assert_eq!(result.repaired_slides, vec![0]);
        assert_eq!(result.repaired_rows, 2);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].item, 1);
    }

    #[test]
    fn test_validate_rejects_prose() {
        assert!(validate_slides_impl("no slides here").is_err());
    }

    #[test]
    fn test_export_each_format() {
        let slides = vec![
            Slide::new("Asthma").with_item(ContentItem::paragraph("Reversible obstruction")),
        ];

        let pdf = export_document_impl("pdf", &slides, Some("Asthma")).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));

        let docx = export_document_impl("word", &slides, None).unwrap();
        assert!(docx.starts_with(b"PK"));

        let pptx = export_document_impl("pptx", &slides, None).unwrap();
        assert!(pptx.starts_with(b"PK"));
    }

    #[test]
    fn test_unknown_format() {
        assert_eq!(
            parse_format("odt").unwrap_err(),
            "Unknown export format: odt"
        );
        assert_eq!(parse_format("PowerPoint").unwrap(), ExportFormat::Pptx);
    }

    #[test]
    fn test_validation_result_is_camel_case() {
        let result = validate_slides_impl(r#"{"title":"T","content":[]}"#).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("repairedRows").is_some());
        assert!(json.get("repairedSlides").is_some());
    }
}
