//! Prompt builders for each content-service call.

use crate::types::Slide;
use std::fmt::Write;

/// Title forced onto the first slide of a case-based outline.
pub const CASE_SUMMARY_TITLE: &str = "Clinical Case Summary and Key Questions";

/// Outline topic whose slide is built only from the original case.
pub const CASE_ANALYSIS_TOPIC: &str = "Clinical Question, Answer, and Analysis Summary";

/// Title the model uses for the case-analysis slide.
pub const CASE_PRESENTATION_TITLE: &str = "Case Presentation";

const CONTENT_SCHEMA: &str = r#"Content item schema:
- {"type": "paragraph", "text": "...", "bold": ["..."]}
- {"type": "bullet_list", "items": [{"text": "...", "bold": ["..."]}]}
- {"type": "numbered_list", "items": [{"text": "...", "bold": ["..."]}]}
- {"type": "note", "text": "..."}
- {"type": "table", "headers": ["...", "..."], "rows": [{"cells": ["...", "..."]}]}

Rules:
- Every content item MUST have a "type" field.
- Use the "bold" array to list substrings of "text" to emphasize. Never use markdown such as **text**.
- Every table row MUST have exactly as many cells as there are headers."#;

pub fn diagnosis(patient_data: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a medical AI assistant. Analyze the following patient data and provide \
         provisional diagnoses with a confidence level and reasoning.\n\n\
         Output MUST be a valid JSON array of objects. Each object has \"diagnosis\", \
         \"confidenceLevel\" (a number between 0 and 1), \"reasoning\" and \
         \"missingInformation\" (an object with \"information\" and \"tests\" string arrays).",
    );
    if let Some(data) = patient_data {
        let _ = write!(prompt, "\n\nPatient Data: {}", data);
    }
    prompt
}

pub fn clinical_answer(question: Option<&str>) -> String {
    let mut prompt = String::from(
        "Answer the following clinical question in detail with reasoning.\n\n\
         Output MUST be a valid JSON object with the keys \"answer\", \"reasoning\" and \"topic\".",
    );
    if let Some(question) = question {
        let _ = write!(prompt, "\n\nQuestion: {}", question);
    }
    prompt
}

pub fn summary(question: Option<&str>) -> String {
    let mut prompt = String::from(
        "Summarize the following clinical question or patient data into a concise \
         1-2 sentence summary for a case title.",
    );
    if let Some(question) = question {
        let _ = write!(prompt, "\n\nInput: {}", question);
    }
    prompt
}

pub fn topic_outline(topic: &str) -> String {
    format!(
        "Generate a concise, high-yield presentation outline for the medical topic: {}.\n\
         Provide exactly 15 slide titles.\n\
         Output a valid JSON object with a single key \"outline\" whose value is an array of 15 strings.",
        topic
    )
}

pub fn case_outline(question: &str, answer: &str, reasoning: &str) -> String {
    format!(
        "Generate a presentation outline of 10-12 topics based on the clinical case below.\n\
         The very first topic MUST be \"{}\".\n\
         Output a valid JSON object with a single key \"outline\" containing an array of strings.\n\n\
         Question: {}\nAnswer: {}\nReasoning: {}",
        CASE_SUMMARY_TITLE, question, answer, reasoning
    )
}

pub fn slide_batch(
    topic: &str,
    full_question: Option<&str>,
    full_answer: Option<&str>,
    full_reasoning: Option<&str>,
    selected_topics: &[String],
) -> String {
    let mut prompt = String::from(
        "You are an expert in medical education. Generate detailed slide content for a \
         presentation from the list of topics below.\n\n",
    );
    let _ = writeln!(prompt, "Main topic: {}", topic);
    if let Some(q) = full_question {
        let _ = writeln!(prompt, "Full original question: {}", q);
    }
    if let Some(a) = full_answer {
        let _ = writeln!(prompt, "Full original answer: {}", a);
    }
    if let Some(r) = full_reasoning {
        let _ = writeln!(prompt, "Full original reasoning: {}", r);
    }

    prompt.push_str("\nTopics for slide generation:\n");
    for t in selected_topics {
        let _ = writeln!(prompt, "- {}", t);
    }

    let _ = write!(
        prompt,
        "\nInstructions:\n\
         1. Generate exactly one slide per topic. Each slide title must match its topic.\n\
         2. If \"{analysis}\" is listed, title that slide \"{presentation}\" and build it only from \
         the original question, answer and a summary of the reasoning.\n\
         3. For every other topic produce technically rich, condensed content for a professional \
         medical audience. Prefer lists and tables, at most 6-8 points per slide.\n\
         4. Do not add a conclusion or summary slide unless it is requested.\n\n\
         {schema}\n\n\
         Produce ONLY a JSON array of {{\"title\", \"content\"}} slide objects.",
        analysis = CASE_ANALYSIS_TOPIC,
        presentation = CASE_PRESENTATION_TITLE,
        schema = CONTENT_SCHEMA,
    );
    prompt
}

pub fn single_slide(topic: &str) -> String {
    format!(
        "You are an expert in medical education. Generate the content of a single \
         presentation slide.\n\n\
         Topic: {}\n\n\
         The slide \"title\" must be exactly the topic above. Break the topic into small, \
         distinct points using lists or tables. Do not write a conclusion.\n\n\
         {}\n\n\
         Produce ONLY one JSON object with a \"title\" and a \"content\" array.",
        topic, CONTENT_SCHEMA
    )
}

pub fn suggest_topics(question: Option<&str>, topic: Option<&str>, existing: &[String]) -> String {
    let (subject, source) = match (topic, question) {
        (Some(t), _) => ("medical topic", format!("Topic: {}", t)),
        (None, q) => ("clinical question", format!("Question: {}", q.unwrap_or_default())),
    };
    format!(
        "Based on the following {}, suggest 5-7 new, highly technical medical topics for a \
         presentation.\n\
         Exclude existing topics: {}\n\n\
         Output a JSON object with a single key \"topics\" containing an array of strings.\n\
         {}",
        subject,
        existing.join(", "),
        source
    )
}

pub fn modify_slides(slides_json: &str, selected: &[usize], action: &str) -> String {
    let indices = selected
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Modify the following medical presentation slides using the action: {}.\n\
         Selected indices: {}\n\
         Current slides: {}\n\n\
         {}\n\n\
         Output the COMPLETE JSON array of all slides, modified and unmodified, in order.",
        action, indices, slides_json, CONTENT_SCHEMA
    )
}

/// Compact JSON of the deck sent with a modification request.
pub fn slides_json(slides: &[Slide]) -> String {
    serde_json::to_string(slides).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_outline_forces_first_title() {
        let prompt = case_outline("Q", "A", "R");
        assert!(prompt.contains(CASE_SUMMARY_TITLE));
        assert!(prompt.contains("10-12"));
    }

    #[test]
    fn test_slide_batch_lists_topics() {
        let topics = vec!["Etiology".to_string(), "Staging".to_string()];
        let prompt = slide_batch("Lymphoma", None, None, None, &topics);
        assert!(prompt.contains("- Etiology\n- Staging\n"));
        assert!(!prompt.contains("Full original question"));
    }

    #[test]
    fn test_suggest_prefers_topic() {
        let prompt = suggest_topics(Some("q"), Some("Sepsis"), &["Intro".to_string()]);
        assert!(prompt.contains("Topic: Sepsis"));
        assert!(prompt.contains("Exclude existing topics: Intro"));
    }

    #[test]
    fn test_modify_lists_indices_and_action() {
        let prompt = modify_slides("[]", &[0, 2], "expand_selected");
        assert!(prompt.contains("action: expand_selected"));
        assert!(prompt.contains("Selected indices: 0, 2"));
    }
}
