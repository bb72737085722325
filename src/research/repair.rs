//! Best-effort JSON object recovery from model output
//!
//! Models asked for "only JSON" still wrap it in prose, emit reasoning
//! blocks, forget to quote keys or leave trailing commas. [`try_repair`] runs
//! an ordered chain of total rewrite stages over the text and re-attempts a
//! parse after each one; the first stage that yields a JSON object wins.
//!
//! Stage order:
//! 1. parse as-is
//! 2. strip reasoning/scratchpad blocks (`<think>...</think>` and friends)
//! 3. keep only the first brace-delimited object
//! 4. quote bare object keys
//! 5. drop trailing commas before `}` / `]`
//!
//! Every stage is string-literal aware, so URLs such as `"http://a"` are
//! never mistaken for keys.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// A JSON object as recovered from model output.
pub type JsonObject = Map<String, Value>;

type Stage = fn(&str) -> String;

const STAGES: &[(&str, Stage)] = &[
    ("strip_reasoning", strip_reasoning),
    ("extract_object", extract_object),
    ("quote_bare_keys", quote_bare_keys),
    ("remove_trailing_commas", remove_trailing_commas),
];

static REASONING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:think|thinking|reasoning|scratchpad)>.*?</(?:think|thinking|reasoning|scratchpad)>")
        .expect("reasoning block pattern is valid")
});

/// Run the repair chain. `None` means no stage produced a JSON object.
pub fn try_repair(raw: &str) -> Option<JsonObject> {
    if let Some(object) = parse_object(raw) {
        return Some(object);
    }

    let mut text = raw.to_string();
    for (name, stage) in STAGES {
        text = stage(&text);
        if let Some(object) = parse_object(&text) {
            tracing::debug!(stage = name, "Recovered JSON object from model output");
            return Some(object);
        }
    }

    None
}

/// Like [`try_repair`] but never fails: unrecoverable input becomes `{}`.
/// Callers treat missing fields as "no data".
pub fn repair(raw: &str) -> JsonObject {
    try_repair(raw).unwrap_or_else(|| {
        tracing::warn!(chars = raw.len(), "Could not recover JSON from model output");
        JsonObject::new()
    })
}

/// Collect the string members of `object[field]`, ignoring anything that is
/// not a string.
pub fn string_array(object: &JsonObject, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").into_owned()
}

/// Keep the first balanced `{...}`. An object that is never closed is kept
/// up to the end of the text.
fn extract_object(text: &str) -> String {
    let Some(start) = text.find('{') else {
        return text.to_string();
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return text[start..end].to_string();
                }
            }
            _ => {}
        }
    }

    text[start..].to_string()
}

/// Quote identifiers that appear in key position (after `{` or `,` and
/// followed by `:`) outside string literals.
fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if in_string {
            out.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    in_string = false;
                    last_significant = Some('"');
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        let key_position = matches!(last_significant, Some('{') | Some(','));
        if key_position && (ch.is_alphabetic() || ch == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();

            let mut lookahead = i;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }

            if chars.get(lookahead) == Some(&':') {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            last_significant = ident.chars().last();
            continue;
        }

        if ch == '"' {
            in_string = true;
        }
        if !ch.is_whitespace() {
            last_significant = Some(ch);
        }
        out.push(ch);
        i += 1;
    }

    out
}

/// Drop commas that are directly (modulo whitespace) followed by `}` or `]`.
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }

    out
}
