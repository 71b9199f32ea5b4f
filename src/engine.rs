use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{QuizEnvConfig, SpeechConfig};
use crate::constants::{
    AUTO_ADVANCE_MS, AUTO_ADVANCE_WITH_EXAMPLE_MS, DEFAULT_ANSWER_KEY, DEFAULT_BASE_CHOICES,
    DEFAULT_PHONETIC_LOCALE, DEFAULT_QUESTION_CAP,
};
use crate::quiz::answer::AnswerResolver;
use crate::quiz::composite::{
    combine_sources, CombineOptions, CompositeQuiz, DataSource, ExamplesSource, SourceDescriptor,
};
use crate::quiz::loader::{
    validate_answer_keys, validate_examples, DatasetLoader, LoadError, QuizMeta,
};
use crate::quiz::picker::{RoundPicker, StandardQuiz};
use crate::quiz::progressive::ProgressiveDifficulty;
use crate::quiz::rating::{PlayerCard, RatingModel};
use crate::quiz::selector::RoundSelector;
use crate::quiz::session::{QuizSession, SessionError, SessionOptions};
use crate::quiz::timer::AdvanceScheduler;
use crate::quiz::view::QuizView;
use crate::services::speech::Speaker;
use crate::store::keys;
use crate::store::operations::player::LatestAttempt;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no quiz ids given")]
    NoQuizzes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub max_questions: u32,
    pub choices: usize,
    /// `None` keeps the base choice count for the whole session.
    pub progressive_difficulty: Option<ProgressiveDifficulty>,
    pub answer_key: String,
    pub phonetic_locale: String,
    pub sound_enabled: bool,
    pub auto_advance_ms: u64,
    pub auto_advance_with_example_ms: u64,
    pub enable_keyboard: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_questions: DEFAULT_QUESTION_CAP,
            choices: DEFAULT_BASE_CHOICES,
            progressive_difficulty: Some(ProgressiveDifficulty::default()),
            answer_key: DEFAULT_ANSWER_KEY.to_string(),
            phonetic_locale: DEFAULT_PHONETIC_LOCALE.to_string(),
            sound_enabled: false,
            auto_advance_ms: AUTO_ADVANCE_MS,
            auto_advance_with_example_ms: AUTO_ADVANCE_WITH_EXAMPLE_MS,
            enable_keyboard: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env_config(quiz: &QuizEnvConfig, speech: &SpeechConfig) -> Self {
        Self {
            max_questions: quiz.question_cap.max(1),
            choices: quiz.base_choices.max(1),
            progressive_difficulty: quiz
                .progressive_difficulty
                .then(ProgressiveDifficulty::default),
            phonetic_locale: quiz.phonetic_locale.clone(),
            sound_enabled: speech.enabled,
            auto_advance_ms: quiz.auto_advance_ms,
            auto_advance_with_example_ms: quiz.auto_advance_with_example_ms,
            ..Self::default()
        }
    }
}

/// Where a quiz's data lives and how it is keyed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizRecipe {
    pub quiz_id: String,
    /// Defaults to `data/<quizId>.json`.
    pub data: Option<String>,
    pub examples: Option<String>,
    pub answer_key: Option<String>,
    /// Item fields tried in order for the example lookup.
    pub example_fields: Vec<String>,
}

impl QuizRecipe {
    pub fn new(quiz_id: &str) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            ..Self::default()
        }
    }

    pub fn from_meta(meta: &QuizMeta) -> Self {
        Self {
            quiz_id: meta.id.clone(),
            data: None,
            examples: meta.examples.clone(),
            answer_key: meta.answer_key.clone(),
            example_fields: meta.example_fields.clone(),
        }
    }

    pub fn with_examples(mut self, location: &str) -> Self {
        self.examples = Some(location.to_string());
        self
    }

    pub fn with_answer_key(mut self, answer_key: &str) -> Self {
        self.answer_key = Some(answer_key.to_string());
        self
    }

    pub fn with_example_fields(mut self, fields: &[&str]) -> Self {
        self.example_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn data_location(&self) -> String {
        self.data
            .clone()
            .unwrap_or_else(|| format!("data/{}.json", self.quiz_id))
    }
}

pub struct QuizEngine {
    store: Arc<Store>,
    loader: Arc<DatasetLoader>,
    rating: RatingModel,
    config: EngineConfig,
}

impl QuizEngine {
    pub fn new(store: Arc<Store>, loader: Arc<DatasetLoader>, config: EngineConfig) -> Self {
        Self {
            store,
            loader,
            rating: RatingModel::default(),
            config,
        }
    }

    pub fn with_rating(mut self, rating: RatingModel) -> Self {
        self.rating = rating;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn loader(&self) -> &Arc<DatasetLoader> {
        &self.loader
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rating(&self) -> &RatingModel {
        &self.rating
    }

    /// `phonetic` gets locale-aware display; any other key is read verbatim.
    pub fn resolver(answer_key: &str) -> AnswerResolver {
        if answer_key == DEFAULT_ANSWER_KEY {
            AnswerResolver::Phonetic
        } else {
            AnswerResolver::field(answer_key)
        }
    }

    pub fn selector(&self, answer_key: &str) -> RoundSelector {
        RoundSelector::new(Self::resolver(answer_key))
            .with_base_choices(self.config.choices)
            .with_progressive(self.config.progressive_difficulty.clone())
    }

    /// The stored preference wins over the configured default.
    pub fn phonetic_locale(&self) -> String {
        match self.store.get_item(keys::PHONETIC_LOCALE_KEY) {
            Ok(Some(_)) => self.store.preferred_phonetic_locale(),
            _ => self.config.phonetic_locale.clone(),
        }
    }

    /// Catalog entry for each id; ids the catalog cannot describe get a bare recipe.
    pub async fn recipes(&self, quiz_ids: &[String]) -> Vec<QuizRecipe> {
        let catalog = match self.loader.fetch_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(error = %e, "Quiz catalog unavailable");
                Vec::new()
            }
        };
        quiz_ids
            .iter()
            .map(|id| match catalog.iter().find(|meta| &meta.id == id) {
                Some(meta) => QuizRecipe::from_meta(meta),
                None => QuizRecipe::new(id),
            })
            .collect()
    }

    pub fn session_options(&self, quiz_id: &str) -> SessionOptions {
        SessionOptions {
            quiz_id: quiz_id.to_string(),
            max_questions: self.config.max_questions,
            sound_enabled: self.config.sound_enabled,
            phonetic_locale: self.phonetic_locale(),
            auto_advance_ms: self.config.auto_advance_ms,
            auto_advance_with_example_ms: self.config.auto_advance_with_example_ms,
            enable_keyboard: self.config.enable_keyboard,
        }
    }

    pub async fn standard_quiz(&self, recipe: &QuizRecipe) -> Result<StandardQuiz, LoadError> {
        let location = recipe.data_location();
        let items = self.loader.fetch_items(&location).await?;
        let answer_key = recipe
            .answer_key
            .clone()
            .unwrap_or_else(|| self.config.answer_key.clone());
        let selector = self.selector(&answer_key);
        validate_answer_keys(&items, &selector.resolver);

        let examples = match recipe.examples.as_deref() {
            Some(examples_location) => match self.loader.fetch_examples(examples_location, true).await
            {
                Ok(map) => Some(map),
                Err(e) => {
                    tracing::warn!(quiz_id = %recipe.quiz_id, error = %e, "Examples unavailable");
                    None
                }
            },
            None => None,
        };

        let fields = if recipe.example_fields.is_empty() {
            vec!["english".to_string()]
        } else {
            recipe.example_fields.clone()
        };
        if let Some(map) = &examples {
            validate_examples(&items, map, &fields[0]);
        }

        tracing::info!(
            quiz_id = %recipe.quiz_id,
            items = items.len(),
            examples = examples.as_ref().map_or(0, |m| m.len()),
            "Quiz data loaded"
        );

        Ok(StandardQuiz::new(items)
            .with_selector(selector)
            .with_examples(examples)
            .with_example_key(Arc::new(move |item| {
                fields.iter().find_map(|field| item.text(field))
            })))
    }

    /// Merges the recipes into one pool. Fails only when every source failed.
    pub async fn composite_quiz(&self, recipes: &[QuizRecipe]) -> Result<CompositeQuiz, EngineError> {
        if recipes.is_empty() {
            return Err(EngineError::NoQuizzes);
        }
        let descriptors = recipes.iter().map(source_descriptor).collect();
        let combined = combine_sources(&self.loader, CombineOptions::new(descriptors)).await;

        for failure in &combined.errors {
            tracing::warn!(source_id = %failure.source_id, error = %failure.error, "Source skipped");
        }
        if combined.data.is_empty() {
            if let Some(failure) = combined.errors.first() {
                return Err(failure.error.clone().into());
            }
        }

        let answer_key = recipes
            .iter()
            .find_map(|r| r.answer_key.clone())
            .unwrap_or_else(|| self.config.answer_key.clone());
        Ok(CompositeQuiz::new(combined, self.selector(&answer_key)))
    }

    /// One recipe plays standalone; several are merged.
    pub async fn quiz(&self, recipes: &[QuizRecipe]) -> Result<Box<dyn RoundPicker>, EngineError> {
        let picker: Box<dyn RoundPicker> = match recipes {
            [] => return Err(EngineError::NoQuizzes),
            [single] => Box::new(self.standard_quiz(single).await?),
            many => Box::new(self.composite_quiz(many).await?),
        };
        Ok(picker)
    }

    pub fn session<V: QuizView>(
        &self,
        quiz_id: &str,
        picker: Box<dyn RoundPicker>,
        view: V,
        scheduler: Box<dyn AdvanceScheduler>,
        speaker: Option<Arc<dyn Speaker>>,
    ) -> Result<QuizSession<V>, SessionError> {
        let session = QuizSession::new(
            picker,
            Arc::clone(&self.store),
            view,
            scheduler,
            self.session_options(quiz_id),
        )?;
        Ok(match speaker {
            Some(speaker) => session.with_speaker(speaker),
            None => session,
        })
    }

    pub fn player_card(&self) -> PlayerCard {
        let entries = self.store.list_all_progress_entries();
        self.rating
            .player_card(self.store.player_display_name(), &entries)
    }

    pub fn latest_attempt(&self) -> Option<LatestAttempt> {
        self.store.latest_attempt()
    }

    pub fn reset_all_progress(&self) {
        self.store.reset_all_progress();
        tracing::info!("All quiz progress cleared");
    }
}

/// Session id for a set of quiz ids: the ids joined with `+`.
pub fn combined_quiz_id(recipes: &[QuizRecipe]) -> String {
    recipes
        .iter()
        .map(|r| r.quiz_id.as_str())
        .collect::<Vec<_>>()
        .join("+")
}

fn source_descriptor(recipe: &QuizRecipe) -> SourceDescriptor {
    let mut descriptor = SourceDescriptor::quiz(&recipe.quiz_id);
    if let Some(data) = &recipe.data {
        descriptor.data = DataSource::Url(data.clone());
    }
    if let Some(examples) = &recipe.examples {
        descriptor = descriptor.with_examples(ExamplesSource::Url(examples.clone()));
    }
    if !recipe.example_fields.is_empty() {
        let fields = recipe.example_fields.clone();
        descriptor = descriptor.with_example_key(Arc::new(move |item, _, _| {
            fields.iter().find_map(|field| item.text(field))
        }));
    }
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_config_maps_onto_engine_config() {
        let quiz = QuizEnvConfig {
            question_cap: 0,
            base_choices: 3,
            progressive_difficulty: false,
            phonetic_locale: "th".into(),
            auto_advance_ms: 10,
            auto_advance_with_example_ms: 20,
        };
        let speech = SpeechConfig {
            enabled: true,
            command: String::new(),
        };
        let cfg = EngineConfig::from_env_config(&quiz, &speech);
        assert_eq!(cfg.max_questions, 1);
        assert_eq!(cfg.choices, 3);
        assert!(cfg.progressive_difficulty.is_none());
        assert!(cfg.sound_enabled);
        assert_eq!(cfg.answer_key, "phonetic");
    }

    #[test]
    fn engine_config_deserializes_camel_case_with_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"maxQuestions": 20, "answerKey": "final"}"#).unwrap();
        assert_eq!(cfg.max_questions, 20);
        assert_eq!(cfg.answer_key, "final");
        assert_eq!(cfg.choices, 4);
        assert!(cfg.progressive_difficulty.is_some());
    }

    #[test]
    fn resolver_by_answer_key() {
        assert_eq!(QuizEngine::resolver("phonetic"), AnswerResolver::Phonetic);
        assert_eq!(QuizEngine::resolver("final"), AnswerResolver::field("final"));
    }

    #[test]
    fn recipe_locations() {
        let recipe = QuizRecipe::new("colors");
        assert_eq!(recipe.data_location(), "data/colors.json");
        let pair = [QuizRecipe::new("colors"), QuizRecipe::new("foods")];
        assert_eq!(combined_quiz_id(&pair), "colors+foods");
    }

    #[test]
    fn stored_locale_overrides_config() {
        let store = Arc::new(Store::in_memory());
        let loader = Arc::new(DatasetLoader::new(".", 1));
        let engine = QuizEngine::new(
            Arc::clone(&store),
            loader,
            EngineConfig {
                phonetic_locale: "th".into(),
                ..EngineConfig::default()
            },
        );
        assert_eq!(engine.phonetic_locale(), "th");
        store.set_preferred_phonetic_locale("en");
        assert_eq!(engine.phonetic_locale(), "en");
    }
}
