//! Parsing of JSON payloads that a model may wrap in markdown code fences.

use serde::de::DeserializeOwned;

use crate::error::{NotesError, Result};

/// Remove every "```json" and "```" marker and trim the remainder.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Strip fences, trim, parse. Anything unparsable is a `ModelResponse` error.
pub fn parse_fenced_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let stripped = strip_code_fences(text);
    serde_json::from_str(&stripped).map_err(|e| {
        NotesError::ModelResponse(format!("reply is not valid JSON ({e}): {}", preview(&stripped)))
    })
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}...")
    }
}
