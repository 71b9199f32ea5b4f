use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dataset entry. The schema is open: consumers pick fields by name.
///
/// The composite loader tags clones with their source and a namespaced key;
/// those tags serialize under the `__`-prefixed names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    #[serde(
        rename = "__sourceQuizId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_quiz_id: Option<String>,
    #[serde(
        rename = "__compositeKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub composite_key: Option<String>,
    #[serde(
        rename = "__compositeKeyRaw",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub composite_key_raw: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl QuizItem {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Wraps a non-object JSON value as `{ "value": ... }`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                Self::from_fields(fields)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field rendered as text; `None` for missing, null and empty-string values.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn english(&self) -> String {
        self.text("english").unwrap_or_default()
    }

    pub fn thai(&self) -> String {
        self.text("thai").unwrap_or_default()
    }

    pub fn emoji(&self) -> String {
        self.text("emoji").unwrap_or_default()
    }
}

pub type SharedItem = Arc<QuizItem>;

/// One rendered question.
#[derive(Debug, Clone)]
pub struct Round {
    pub answer: SharedItem,
    pub choices: Vec<SharedItem>,
}

impl Round {
    pub fn answer_position(&self) -> Option<usize> {
        self.choices
            .iter()
            .position(|choice| Arc::ptr_eq(choice, &self.answer))
    }
}

/// Progress-independent inputs for drawing a round.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundContext<'a> {
    pub correct_answers: u32,
    pub previous_answer: Option<&'a QuizItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
}

/// Worked example shown after a correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Example {
    Text(String),
    Rich {
        text: String,
        #[serde(default)]
        highlight: Highlight,
    },
}

impl Example {
    pub fn text(&self) -> &str {
        match self {
            Example::Text(text) => text,
            Example::Rich { text, .. } => text,
        }
    }
}

pub type ExampleMap = HashMap<String, Example>;

/// Symbol block shown above the choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbol {
    pub english: String,
    pub thai: String,
    pub emoji: String,
}

impl Symbol {
    pub fn english_thai(item: &QuizItem) -> Self {
        Self {
            english: item.english(),
            thai: item.thai(),
            emoji: item.emoji(),
        }
    }
}
