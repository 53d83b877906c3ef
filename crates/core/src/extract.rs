//! Extraction of a JSON payload from free-form model output.
//!
//! Models wrap their JSON in prose or code fences. Every AI call site goes
//! through [`extract_json`] so the tolerance rules are the same everywhere.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The outer JSON shape a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// First `[` to last `]`.
    Array,
    /// First `{` to last `}`.
    Object,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            Self::Array => ('[', ']'),
            Self::Object => ('{', '}'),
        }
    }
}

/// Slice the widest `open … close` region out of `text`.
pub fn json_region(text: &str, shape: JsonShape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Extract and parse the JSON value of the given shape from model output.
pub fn extract_json(text: &str, shape: JsonShape) -> Result<Value> {
    let region = json_region(text, shape).ok_or_else(|| {
        Error::MalformedResponse(format!("no JSON {:?} found in response", shape))
    })?;

    serde_json::from_str(region)
        .map_err(|e| Error::MalformedResponse(format!("invalid JSON {:?}: {}", shape, e)))
}

/// Extract and deserialize a typed payload from model output.
pub fn extract_as<T: DeserializeOwned>(text: &str, shape: JsonShape) -> Result<T> {
    let value = extract_json(text, shape)?;
    serde_json::from_value(value)
        .map_err(|e| Error::MalformedResponse(format!("unexpected JSON layout: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_array_with_surrounding_prose() {
        let text = "Here you go:\n```json\n[{\"title\": \"A\"}]\n```\nHope this helps.";
        let value = extract_json(text, JsonShape::Array).unwrap();
        assert_eq!(value[0]["title"], "A");
    }

    #[test]
    fn test_extracts_object() {
        let text = "Sure! {\"outline\": [\"One\", \"Two\"]} done";
        let value = extract_json(text, JsonShape::Object).unwrap();
        assert_eq!(value["outline"][1], "Two");
    }

    #[test]
    fn test_missing_delimiters_is_malformed() {
        let err = extract_json("I cannot help with that.", JsonShape::Array).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_reversed_delimiters_is_malformed() {
        assert!(json_region("] then [", JsonShape::Array).is_none());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = extract_json("[{\"title\": }]", JsonShape::Array).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_as_typed() {
        #[derive(serde::Deserialize)]
        struct Topics {
            topics: Vec<String>,
        }
        let parsed: Topics =
            extract_as("text {\"topics\": [\"Renal dosing\"]}", JsonShape::Object).unwrap();
        assert_eq!(parsed.topics, vec!["Renal dosing"]);
    }
}
