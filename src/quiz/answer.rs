use super::phonetics;
use super::types::QuizItem;
use crate::constants::DEFAULT_ANSWER_KEY;

/// How a quiz reads the answer out of an item.
///
/// `equality_key` decides correctness and distractor uniqueness;
/// `display` is what the player sees on a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerResolver {
    /// A plain field such as `phonetic`, `final` or `sounds`.
    Field(String),
    /// Canonical phonetic for equality, locale-specific phonetic for display.
    Phonetic,
}

impl Default for AnswerResolver {
    fn default() -> Self {
        AnswerResolver::Field(DEFAULT_ANSWER_KEY.to_string())
    }
}

impl AnswerResolver {
    pub fn field(name: &str) -> Self {
        AnswerResolver::Field(name.to_string())
    }

    pub fn equality_key(&self, item: &QuizItem) -> Option<String> {
        match self {
            AnswerResolver::Field(name) => item.text(name),
            AnswerResolver::Phonetic => {
                let canonical = phonetics::canonical_phonetic(item);
                (!canonical.is_empty()).then_some(canonical)
            }
        }
    }

    pub fn display(&self, item: &QuizItem, locale: &str) -> String {
        match self {
            AnswerResolver::Field(name) => item.text(name).unwrap_or_default(),
            AnswerResolver::Phonetic => phonetics::phonetic_bundle(item, locale).display,
        }
    }

    /// Default correctness: both items resolve to the same non-empty key.
    pub fn matches(&self, choice: &QuizItem, answer: &QuizItem) -> bool {
        match (self.equality_key(choice), self.equality_key(answer)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn field_resolver_reads_named_field() {
        let resolver = AnswerResolver::field("final");
        let item = QuizItem::from_value(json!({"final": "k", "phonetic": "kor"}));
        assert_eq!(resolver.equality_key(&item).as_deref(), Some("k"));
        assert_eq!(resolver.display(&item, "en"), "k");
    }

    #[test]
    fn phonetic_equality_ignores_display_locale() {
        let resolver = AnswerResolver::Phonetic;
        let a = QuizItem::from_value(json!({
            "phonetic": "nueng",
            "phonetics": {"en": "nueng", "de": "nüng"}
        }));
        let b = QuizItem::from_value(json!({"phonetic": "nueng"}));
        assert!(resolver.matches(&a, &b));
        assert_eq!(resolver.display(&a, "de"), "nüng");
        assert_eq!(resolver.display(&a, "en"), "nueng");
    }

    #[test]
    fn missing_keys_never_match() {
        let resolver = AnswerResolver::default();
        let a = QuizItem::from_value(json!({"english": "x"}));
        let b = QuizItem::from_value(json!({"english": "y"}));
        assert!(!resolver.matches(&a, &b));
    }
}
