//! Phonetic lookups for items carrying a `phonetics: {locale: string}` map.
//!
//! The canonical form never depends on the display locale, so it is the one
//! used for answer equality.

use serde_json::{Map, Value};

use super::types::QuizItem;

const FALLBACK_FIELDS: [&str; 3] = ["sound", "romanization", "transliteration"];

/// Lowercased base subtag, letters only, at most five characters; empty when nothing is left.
pub fn normalize_locale(locale: &str) -> String {
    let lowered = locale.trim().to_lowercase().replace('_', "-");
    let base = lowered.split('-').next().unwrap_or_default();
    base.chars()
        .filter(|c| c.is_ascii_lowercase())
        .take(5)
        .collect()
}

fn phonetic_map(item: &QuizItem) -> Option<&Map<String, Value>> {
    item.get("phonetics").and_then(Value::as_object)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn first_phonetic(map: &Map<String, Value>) -> Option<String> {
    map.values().find_map(text_of)
}

pub fn canonical_phonetic(item: &QuizItem) -> String {
    if let Some(phonetic) = item.text("phonetic") {
        return phonetic;
    }
    if let Some(map) = phonetic_map(item) {
        if let Some(en) = map.get("en").and_then(text_of) {
            return en;
        }
        if let Some(first) = first_phonetic(map) {
            return first;
        }
    }
    FALLBACK_FIELDS
        .iter()
        .find_map(|field| item.text(field))
        .unwrap_or_default()
}

pub fn phonetic_for_locale(item: &QuizItem, locale: &str) -> String {
    let Some(map) = phonetic_map(item) else {
        return canonical_phonetic(item);
    };
    let normalized = normalize_locale(locale);
    if !normalized.is_empty() {
        if let Some(value) = map.get(&normalized).and_then(text_of) {
            return value;
        }
    }
    map.get("en")
        .and_then(text_of)
        .or_else(|| first_phonetic(map))
        .unwrap_or_else(|| canonical_phonetic(item))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneticBundle {
    pub canonical: String,
    pub display: String,
}

pub fn phonetic_bundle(item: &QuizItem, locale: &str) -> PhoneticBundle {
    let canonical = canonical_phonetic(item);
    let display = phonetic_for_locale(item, locale);
    PhoneticBundle {
        display: if display.is_empty() {
            canonical.clone()
        } else {
            display
        },
        canonical,
    }
}
