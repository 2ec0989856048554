//! JSON extraction from free-form model text.
//!
//! Models wrap structured output in prose, code fences, or slightly broken
//! JSON. The layered strategy: a fenced code block first, else the first
//! balanced brace-delimited object, else the first bracket-delimited array.
//! Parsing gets one best-effort repair pass (quote bare keys, strip trailing
//! commas) before giving up.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static BARE_KEYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("bare key regex")
});

static TRAILING_COMMAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex"));

/// Pull the most plausible JSON payload out of model text.
pub fn extract_payload(text: &str) -> Option<String> {
    let text = normalize_whitespace(text);
    if let Some(fenced) = fenced_block(&text) {
        // The fence may itself wrap prose around the object.
        if let Some(object) = balanced(&fenced, '{', '}') {
            return Some(object);
        }
        if let Some(array) = balanced(&fenced, '[', ']') {
            return Some(array);
        }
    }
    if let Some(object) = balanced(&text, '{', '}') {
        return Some(object);
    }
    balanced(&text, '[', ']')
}

/// Pull the first bracket-delimited array out of model text.
pub fn extract_array(text: &str) -> Option<String> {
    let text = normalize_whitespace(text);
    if let Some(fenced) = fenced_block(&text) {
        if let Some(array) = balanced(&fenced, '[', ']') {
            return Some(array);
        }
    }
    balanced(&text, '[', ']')
}

/// Parse a payload, repairing common model mistakes once on failure.
pub fn parse_lenient(payload: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(payload) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let repaired = repair(payload);
            serde_json::from_str(&repaired).map_err(|_| first_error)
        }
    }
}

/// Normalize whitespace oddities models emit: CRLF, non-breaking spaces,
/// byte-order marks and zero-width characters.
pub fn normalize_whitespace(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\u{a0}', " ")
        .replace(['\u{feff}', '\u{200b}'], "")
}

/// Content of the first fenced code block, language tag stripped.
fn fenced_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // skip an optional language tag up to the first newline
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

/// First balanced `open`..`close` region, string- and escape-aware.
fn balanced(text: &str, open: char, close: char) -> Option<String> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Quote bare keys and strip trailing commas.
fn repair(payload: &str) -> String {
    let quoted = BARE_KEYS.replace_all(payload, "${1}\"${2}\":");
    TRAILING_COMMAS.replace_all(&quoted, "${1}").to_string()
}
