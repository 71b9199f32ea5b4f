use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use super::answer::AnswerResolver;
use super::selector::RoundSelector;
use super::types::{Example, ExampleMap, QuizItem, Round, RoundContext, SharedItem, Symbol};

pub const ANSWER_LABEL_PREFIX: &str = "Answer: ";
pub const SYMBOL_LABEL_PREFIX: &str = "English and Thai: ";

pub type CorrectnessFn = Arc<dyn Fn(&QuizItem, &QuizItem) -> bool + Send + Sync>;
pub type SymbolFn = Arc<dyn Fn(&QuizItem) -> Symbol + Send + Sync>;
pub type ItemKeyFn = Arc<dyn Fn(&QuizItem) -> Option<String> + Send + Sync>;

/// Everything a session needs from a quiz definition.
pub trait RoundPicker: Send {
    fn pick_round(&self, ctx: &RoundContext<'_>, rng: &mut dyn RngCore) -> Option<Round>;

    fn is_correct(&self, choice: &QuizItem, answer: &QuizItem) -> bool;

    fn choice_label(&self, choice: &QuizItem, locale: &str) -> String;

    fn choice_aria_label(&self, choice: &QuizItem, locale: &str) -> String {
        format!("{ANSWER_LABEL_PREFIX}{}", self.choice_label(choice, locale))
    }

    fn symbol(&self, answer: &QuizItem) -> Symbol {
        Symbol::english_thai(answer)
    }

    /// Worked example shown after a correct answer.
    fn example_for(&self, _answer: &QuizItem) -> Option<Example> {
        None
    }

    fn has_examples(&self) -> bool {
        false
    }
}

/// Single-dataset quiz: selector rules plus optional examples and overrides.
#[derive(Clone)]
pub struct StandardQuiz {
    data: Vec<SharedItem>,
    selector: RoundSelector,
    examples: Option<ExampleMap>,
    example_key: Option<ItemKeyFn>,
    symbol: Option<SymbolFn>,
    is_correct: Option<CorrectnessFn>,
}

impl fmt::Debug for StandardQuiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardQuiz")
            .field("items", &self.data.len())
            .field("selector", &self.selector)
            .field("examples", &self.examples.as_ref().map(|e| e.len()))
            .finish_non_exhaustive()
    }
}

impl StandardQuiz {
    pub fn new(data: Vec<QuizItem>) -> Self {
        Self::from_shared(data.into_iter().map(Arc::new).collect())
    }

    pub fn from_shared(data: Vec<SharedItem>) -> Self {
        Self {
            data,
            selector: RoundSelector::default(),
            examples: None,
            example_key: None,
            symbol: None,
            is_correct: None,
        }
    }

    pub fn with_selector(mut self, selector: RoundSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_examples(mut self, examples: Option<ExampleMap>) -> Self {
        self.examples = examples;
        self
    }

    /// Example lookup key; defaults to the answer's `english`.
    pub fn with_example_key(mut self, key: ItemKeyFn) -> Self {
        self.example_key = Some(key);
        self
    }

    pub fn with_symbol(mut self, symbol: SymbolFn) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_is_correct(mut self, is_correct: CorrectnessFn) -> Self {
        self.is_correct = Some(is_correct);
        self
    }

    pub fn data(&self) -> &[SharedItem] {
        &self.data
    }

    pub fn selector(&self) -> &RoundSelector {
        &self.selector
    }

    pub fn resolver(&self) -> &AnswerResolver {
        &self.selector.resolver
    }

    fn example_key_for(&self, answer: &QuizItem) -> Option<String> {
        match &self.example_key {
            Some(key) => key(answer),
            None => answer.text("english"),
        }
    }
}

impl RoundPicker for StandardQuiz {
    fn pick_round(&self, ctx: &RoundContext<'_>, rng: &mut dyn RngCore) -> Option<Round> {
        self.selector.pick_round(ctx, &self.data, rng)
    }

    fn is_correct(&self, choice: &QuizItem, answer: &QuizItem) -> bool {
        match &self.is_correct {
            Some(custom) => custom(choice, answer),
            None => std::ptr::eq(choice, answer) || self.selector.resolver.matches(choice, answer),
        }
    }

    fn choice_label(&self, choice: &QuizItem, locale: &str) -> String {
        self.selector.resolver.display(choice, locale)
    }

    fn symbol(&self, answer: &QuizItem) -> Symbol {
        match &self.symbol {
            Some(build) => build(answer),
            None => Symbol::english_thai(answer),
        }
    }

    fn example_for(&self, answer: &QuizItem) -> Option<Example> {
        let examples = self.examples.as_ref()?;
        let key = self.example_key_for(answer)?;
        examples.get(&key).cloned()
    }

    fn has_examples(&self) -> bool {
        self.examples.is_some()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    use super::*;

    fn quiz() -> StandardQuiz {
        StandardQuiz::new(vec![
            QuizItem::from_value(json!({"english": "red", "thai": "แดง", "phonetic": "daeng"})),
            QuizItem::from_value(json!({"english": "blue", "thai": "ฟ้า", "phonetic": "faa"})),
        ])
    }

    #[test]
    fn default_correctness_and_labels_use_answer_key() {
        let quiz = quiz();
        let red = &quiz.data()[0];
        let blue = &quiz.data()[1];
        assert!(quiz.is_correct(red, red));
        assert!(!quiz.is_correct(blue, red));
        assert_eq!(quiz.choice_label(red, "en"), "daeng");
        assert_eq!(quiz.choice_aria_label(red, "en"), "Answer: daeng");
        assert_eq!(quiz.symbol(red).thai, "แดง");
    }

    #[test]
    fn keyless_answer_matches_itself() {
        let quiz = StandardQuiz::new(vec![
            QuizItem::from_value(json!({"english": "blue", "thai": "ฟ้า"})),
            QuizItem::from_value(json!({"english": "green", "thai": "เขียว"})),
        ]);
        let blue = &quiz.data()[0];
        let green = &quiz.data()[1];
        assert!(quiz.is_correct(blue, blue));
        assert!(!quiz.is_correct(green, blue));
    }

    #[test]
    fn examples_default_to_english_key() {
        let examples: ExampleMap = serde_json::from_value(json!({"red": "The car is red."})).unwrap();
        let quiz = quiz().with_examples(Some(examples));
        assert!(quiz.has_examples());
        let red = quiz.data()[0].clone();
        assert_eq!(
            quiz.example_for(&red).map(|e| e.text().to_string()),
            Some("The car is red.".to_string())
        );
        assert!(quiz.example_for(&quiz.data()[1]).is_none());
    }

    #[test]
    fn overrides_replace_defaults() {
        let quiz = quiz()
            .with_is_correct(Arc::new(|_, _| true))
            .with_symbol(Arc::new(|item| Symbol {
                english: item.english().to_uppercase(),
                ..Symbol::default()
            }));
        let red = quiz.data()[0].clone();
        let blue = quiz.data()[1].clone();
        assert!(quiz.is_correct(&blue, &red));
        assert_eq!(quiz.symbol(&red).english, "RED");
    }

    #[test]
    fn picks_through_dyn_rng() {
        let quiz = quiz();
        let mut rng = StdRng::seed_from_u64(4);
        let round = quiz
            .pick_round(&RoundContext::default(), &mut rng)
            .unwrap();
        assert_eq!(round.choices.len(), 2);
    }
}
