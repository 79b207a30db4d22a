//! JSON extraction and counting-based repair.
//!
//! Model output arrives wrapped in prose and is frequently truncated
//! mid-structure. The repair is deliberately dumb: locate the outermost
//! brace span, count unmatched openers, append the missing closers, parse.
//! Counting does not understand string literals, so a brace inside a quoted
//! string can still produce a balanced-but-wrong document; that is an
//! accepted limitation of the heuristic, not a bug.

use std::fmt;

use log::debug;
use serde_json::Value;

#[derive(Debug)]
pub enum ExtractError {
    /// The text contains no `{` at all.
    NoJsonFound,
    /// The repaired snippet still failed to parse; carries the parser
    /// diagnostic.
    MalformedJson(serde_json::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJsonFound => write!(f, "no JSON object found in model output"),
            Self::MalformedJson(e) => write!(f, "malformed JSON after repair: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedJson(e) => Some(e),
            Self::NoJsonFound => None,
        }
    }
}

/// Cut the brace-delimited snippet out of `text` and balance it.
///
/// The span runs from the first `{` to the last `}`; a truncated tail with
/// no closing brace at all extends the span to the end of the input so the
/// balancing pass can finish the job. Closers are appended counting-wise:
/// all missing `]` first, then all missing `}` (an inner array is always
/// closed before the object that holds it survives truncation).
pub fn repair_snippet(text: &str) -> Result<String, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoJsonFound)?;
    let snippet = match text.rfind('}') {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    };

    let mut open_braces = 0usize;
    let mut close_braces = 0usize;
    let mut open_brackets = 0usize;
    let mut close_brackets = 0usize;
    for c in snippet.chars() {
        match c {
            '{' => open_braces += 1,
            '}' => close_braces += 1,
            '[' => open_brackets += 1,
            ']' => close_brackets += 1,
            _ => {}
        }
    }

    let missing_brackets = open_brackets.saturating_sub(close_brackets);
    let missing_braces = open_braces.saturating_sub(close_braces);
    if missing_brackets + missing_braces > 0 {
        debug!(
            "repairing truncated snippet: appending {} ']' and {} '}}'",
            missing_brackets, missing_braces
        );
    }

    let mut repaired = String::with_capacity(snippet.len() + missing_brackets + missing_braces);
    repaired.push_str(snippet);
    for _ in 0..missing_brackets {
        repaired.push(']');
    }
    for _ in 0..missing_braces {
        repaired.push('}');
    }
    Ok(repaired)
}

/// Extract the first brace-delimited JSON object from arbitrary text,
/// healing common truncation defects before the parse.
pub fn extract_object(text: &str) -> Result<Value, ExtractError> {
    let snippet = repair_snippet(text)?;
    serde_json::from_str(&snippet).map_err(ExtractError::MalformedJson)
}
