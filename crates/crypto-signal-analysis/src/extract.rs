//! Recovering a JSON object from free-form model output.
//!
//! Models wrap JSON in markdown fences, prepend commentary, or answer with
//! bare JSON. Strategies are tried in order and the first parse wins:
//!
//! 1. the body of a fence opened with ```` ```json ````
//! 2. the first balanced `{ ... }` span
//! 3. the whole trimmed text

use serde_json::Value;
use tracing::debug;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Content between a ```` ```json ```` marker and the next fence (or end of text).
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &text[start..];
    let end = rest.find(FENCE).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// The span from the first `{` to its matching `}` by nesting depth.
/// Braces inside string literals are counted too.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse(candidate: &str, strategy: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{strategy} candidate did not parse: {e}");
            None
        }
    }
}

/// Extract the first JSON value recoverable from `text`.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(value) = fenced_block(text).and_then(|block| parse(block, "fenced")) {
        return Some(value);
    }

    if let Some(value) = balanced_object(text).and_then(|span| parse(span, "brace")) {
        return Some(value);
    }

    parse(text.trim(), "whole-text")
}
