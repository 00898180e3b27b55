//! Cache / dedup key derivation
//!
//! Keys are `{prefix}:{part}|{part}|...`. Text parts are normalized (Unicode
//! NFC, trimmed, lowercased); structured parts are serialized as JSON so enum
//! values contribute their stable serde names. `\` and `|` inside a part are
//! escaped, so distinct part lists never render to the same key.

use crate::style::display_subject;
use crate::types::GenerationRequest;
use serde::Serialize;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Key prefix for portrait generation requests
pub const PORTRAIT_KEY_PREFIX: &str = "portrait";

/// One component of a key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
    Text(String),
    Structured(Value),
}

impl KeyPart {
    pub fn text(value: impl Into<String>) -> Self {
        KeyPart::Text(value.into())
    }

    pub fn structured<T: Serialize>(value: &T) -> Self {
        KeyPart::Structured(serde_json::to_value(value).unwrap_or(Value::Null))
    }

    fn render(&self) -> String {
        match self {
            KeyPart::Text(text) => normalize_text(text),
            KeyPart::Structured(value) => value.to_string(),
        }
    }
}

/// Trim, NFC-normalize and lowercase.
pub fn normalize_text(text: &str) -> String {
    text.trim().nfc().collect::<String>().to_lowercase()
}

fn escape(rendered: &str) -> String {
    rendered.replace('\\', "\\\\").replace('|', "\\|")
}

/// Build a deterministic key from a type prefix and normalized parts.
pub fn build_key(prefix: &str, parts: &[KeyPart]) -> String {
    let body = parts
        .iter()
        .map(|part| escape(&part.render()))
        .collect::<Vec<_>>()
        .join("|");
    format!("{}:{}", prefix, body)
}

/// Cache key for a request, or `None` if the request is not cache-eligible.
pub fn request_key(request: &GenerationRequest) -> Option<String> {
    if !request.is_cache_eligible() {
        return None;
    }
    let subject = display_subject(&request.subject, false);
    Some(build_key(
        PORTRAIT_KEY_PREFIX,
        &[
            KeyPart::text(subject),
            KeyPart::structured(&request.style),
            KeyPart::structured(&request.aspect_ratio),
        ],
    ))
}
