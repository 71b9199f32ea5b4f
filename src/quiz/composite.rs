//! Multi-source quizzes.
//!
//! [`combine_sources`] loads several datasets concurrently, tags every item
//! with its source and a namespaced `sourceId::rawKey`, and remaps each
//! source's example map into the same namespace. [`CompositeQuiz`] plays the
//! merged pool and redraws distractors from the answer's own source.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::loader::{DatasetLoader, LoadError};
use super::picker::{RoundPicker, StandardQuiz};
use super::selector::{pick_unique_choices, RoundSelector};
use super::types::{Example, ExampleMap, QuizItem, Round, RoundContext, SharedItem, Symbol};
use crate::constants::COMPOSITE_KEY_SEPARATOR;

/// Per-source info handed to descriptor callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub source_id: String,
    pub quiz_id: Option<String>,
    pub index: usize,
}

pub type ItemFilter = Arc<dyn Fn(&QuizItem, usize, &SourceContext) -> bool + Send + Sync>;
pub type ItemMap = Arc<dyn Fn(QuizItem, usize, &SourceContext) -> QuizItem + Send + Sync>;
pub type ExampleKeyFn = Arc<dyn Fn(&QuizItem, usize, &SourceContext) -> Option<String> + Send + Sync>;
pub type DataFetchFn =
    Arc<dyn Fn(SourceContext) -> BoxFuture<'static, Result<Vec<Value>, LoadError>> + Send + Sync>;
pub type ExamplesFetchFn =
    Arc<dyn Fn(SourceContext) -> BoxFuture<'static, Result<Option<ExampleMap>, LoadError>> + Send + Sync>;

#[derive(Clone, Default)]
pub enum DataSource {
    /// `data/<quizId>.json` when a quiz id is set, otherwise nothing.
    #[default]
    Default,
    Inline(Vec<Value>),
    Url(String),
    Fetch(DataFetchFn),
}

#[derive(Clone, Default)]
pub enum ExamplesSource {
    #[default]
    None,
    Inline(ExampleMap),
    Url(String),
    Fetch(ExamplesFetchFn),
}

#[derive(Clone)]
pub struct SourceDescriptor {
    pub source_id: Option<String>,
    pub quiz_id: Option<String>,
    pub data: DataSource,
    pub examples: ExamplesSource,
    pub filter: Option<ItemFilter>,
    pub map: Option<ItemMap>,
    pub example_key: Option<ExampleKeyFn>,
    /// Bypasses the loader cache when false.
    pub cache: bool,
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("source_id", &self.source_id)
            .field("quiz_id", &self.quiz_id)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Default for SourceDescriptor {
    fn default() -> Self {
        Self {
            source_id: None,
            quiz_id: None,
            data: DataSource::Default,
            examples: ExamplesSource::None,
            filter: None,
            map: None,
            example_key: None,
            cache: true,
        }
    }
}

impl SourceDescriptor {
    pub fn quiz(quiz_id: &str) -> Self {
        Self {
            quiz_id: Some(quiz_id.to_string()),
            ..Self::default()
        }
    }

    pub fn inline(data: Vec<Value>) -> Self {
        Self {
            data: DataSource::Inline(data),
            ..Self::default()
        }
    }

    pub fn url(data_url: &str) -> Self {
        Self {
            data: DataSource::Url(data_url.to_string()),
            ..Self::default()
        }
    }

    pub fn with_source_id(mut self, source_id: &str) -> Self {
        self.source_id = Some(source_id.to_string());
        self
    }

    pub fn with_quiz_id(mut self, quiz_id: &str) -> Self {
        self.quiz_id = Some(quiz_id.to_string());
        self
    }

    pub fn with_examples(mut self, examples: ExamplesSource) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_filter(mut self, filter: ItemFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_map(mut self, map: ItemMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_example_key(mut self, key: ExampleKeyFn) -> Self {
        self.example_key = Some(key);
        self
    }

    pub fn uncached(mut self) -> Self {
        self.cache = false;
        self
    }

    fn data_location(&self) -> Option<String> {
        match &self.data {
            DataSource::Url(url) => Some(url.clone()),
            DataSource::Default => self.quiz_id.as_ref().map(|id| format!("data/{id}.json")),
            _ => None,
        }
    }

    fn resolved_source_id(&self, index: usize) -> String {
        if let Some(id) = self.source_id.as_ref().filter(|s| !s.is_empty()) {
            return id.clone();
        }
        if let Some(id) = self.quiz_id.as_ref().filter(|s| !s.is_empty()) {
            return id.clone();
        }
        if let DataSource::Url(url) = &self.data {
            return url.clone();
        }
        format!("source-{index}")
    }
}

#[derive(Clone, Default)]
pub struct CombineOptions {
    pub sources: Vec<SourceDescriptor>,
    /// Raw example key used when a descriptor has none.
    pub example_key: Option<ExampleKeyFn>,
    /// Runs after the descriptor's own map.
    pub map_item: Option<ItemMap>,
}

impl CombineOptions {
    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    pub source_id: String,
    pub quiz_id: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub source_id: String,
    pub error: LoadError,
}

#[derive(Debug, Clone, Default)]
pub struct CombinedSources {
    pub data: Vec<QuizItem>,
    pub examples: Option<ExampleMap>,
    pub sources: Vec<SourceMeta>,
    pub errors: Vec<SourceError>,
}

struct LoadedSource {
    data: Vec<QuizItem>,
    examples: Option<ExampleMap>,
    meta: SourceMeta,
    error: Option<LoadError>,
}

/// `id`, `exampleKey`, `english`, `thai`, `phonetic`, `symbol`, else the index.
pub fn default_example_key(item: &QuizItem, index: usize) -> String {
    ["id", "exampleKey", "english", "thai", "phonetic", "symbol"]
        .iter()
        .find_map(|field| item.text(field))
        .unwrap_or_else(|| index.to_string())
}

pub fn namespaced_key(source_id: &str, raw_key: &str) -> String {
    format!("{source_id}{COMPOSITE_KEY_SEPARATOR}{raw_key}")
}

pub async fn combine_sources(loader: &DatasetLoader, options: CombineOptions) -> CombinedSources {
    if options.sources.is_empty() {
        return CombinedSources::default();
    }

    let tasks = options
        .sources
        .iter()
        .enumerate()
        .map(|(index, descriptor)| load_source(loader, &options, descriptor, index));
    let parts = join_all(tasks).await;

    let mut combined = CombinedSources::default();
    let mut examples = ExampleMap::new();
    let mut has_examples = false;
    for part in parts {
        if let Some(part_examples) = part.examples {
            has_examples = true;
            examples.extend(part_examples);
        }
        if let Some(error) = part.error {
            combined.errors.push(SourceError {
                source_id: part.meta.source_id.clone(),
                error,
            });
        }
        combined.data.extend(part.data);
        combined.sources.push(part.meta);
    }
    combined.examples = has_examples.then_some(examples);
    combined
}

async fn load_source(
    loader: &DatasetLoader,
    options: &CombineOptions,
    descriptor: &SourceDescriptor,
    index: usize,
) -> LoadedSource {
    let ctx = SourceContext {
        source_id: descriptor.resolved_source_id(index),
        quiz_id: descriptor.quiz_id.clone(),
        index,
    };

    let raw = match load_data(loader, descriptor, &ctx).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(source_id = %ctx.source_id, error = %e, "Composite source failed to load");
            return LoadedSource {
                data: Vec::new(),
                examples: None,
                meta: SourceMeta {
                    source_id: ctx.source_id,
                    quiz_id: ctx.quiz_id,
                    count: 0,
                },
                error: Some(e),
            };
        }
    };

    let mut items: Vec<QuizItem> = raw.into_iter().map(QuizItem::from_value).collect();
    if let Some(filter) = &descriptor.filter {
        items = items
            .into_iter()
            .enumerate()
            .filter(|(idx, item)| filter(item, *idx, &ctx))
            .map(|(_, item)| item)
            .collect();
    }
    if let Some(map) = &descriptor.map {
        items = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| map(item, idx, &ctx))
            .collect();
    }
    if let Some(map) = &options.map_item {
        items = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| map(item, idx, &ctx))
            .collect();
    }

    let source_quiz_id = ctx.quiz_id.clone().unwrap_or_else(|| ctx.source_id.clone());
    let mut key_map: HashMap<String, String> = HashMap::with_capacity(items.len());
    let tagged: Vec<QuizItem> = items
        .into_iter()
        .enumerate()
        .map(|(idx, mut item)| {
            item.source_quiz_id = Some(source_quiz_id.clone());
            let key_fn = descriptor.example_key.as_ref().or(options.example_key.as_ref());
            let raw_key = key_fn
                .and_then(|f| f(&item, idx, &ctx))
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| default_example_key(&item, idx));
            let composite = namespaced_key(&ctx.source_id, &raw_key);
            key_map.insert(raw_key.clone(), composite.clone());
            item.composite_key_raw = Some(raw_key);
            item.composite_key = Some(composite);
            item
        })
        .collect();

    let examples = match load_examples(loader, descriptor, &ctx).await {
        Ok(examples) => examples.map(|map| remap_examples(map, &key_map, &ctx.source_id)),
        Err(e) => {
            tracing::warn!(source_id = %ctx.source_id, error = %e, "Examples failed to load, continuing without");
            None
        }
    };

    LoadedSource {
        meta: SourceMeta {
            source_id: ctx.source_id.clone(),
            quiz_id: ctx.quiz_id.clone(),
            count: tagged.len(),
        },
        data: tagged,
        examples,
        error: None,
    }
}

async fn load_data(
    loader: &DatasetLoader,
    descriptor: &SourceDescriptor,
    ctx: &SourceContext,
) -> Result<Vec<Value>, LoadError> {
    match &descriptor.data {
        DataSource::Inline(items) => Ok(items.clone()),
        DataSource::Fetch(fetch) => fetch(ctx.clone()).await,
        DataSource::Url(_) | DataSource::Default => match descriptor.data_location() {
            Some(location) => loader.fetch_dataset(&location, descriptor.cache).await,
            None => Ok(Vec::new()),
        },
    }
}

async fn load_examples(
    loader: &DatasetLoader,
    descriptor: &SourceDescriptor,
    ctx: &SourceContext,
) -> Result<Option<ExampleMap>, LoadError> {
    match &descriptor.examples {
        ExamplesSource::None => Ok(None),
        ExamplesSource::Inline(map) => Ok(Some(map.clone())),
        ExamplesSource::Fetch(fetch) => fetch(ctx.clone()).await,
        ExamplesSource::Url(url) => loader.fetch_examples(url, descriptor.cache).await.map(Some),
    }
}

fn remap_examples(
    examples: ExampleMap,
    key_map: &HashMap<String, String>,
    source_id: &str,
) -> ExampleMap {
    examples
        .into_iter()
        .map(|(raw, example)| {
            let key = key_map
                .get(&raw)
                .cloned()
                .unwrap_or_else(|| namespaced_key(source_id, &raw));
            (key, example)
        })
        .collect()
}

/// Merged-pool quiz. Examples are looked up by `__compositeKey`.
#[derive(Debug, Clone)]
pub struct CompositeQuiz {
    inner: StandardQuiz,
    by_source: HashMap<String, Vec<SharedItem>>,
    sources: Vec<SourceMeta>,
}

impl CompositeQuiz {
    pub fn new(combined: CombinedSources, selector: RoundSelector) -> Self {
        let CombinedSources {
            data,
            examples,
            sources,
            ..
        } = combined;
        let inner = StandardQuiz::new(data)
            .with_selector(selector)
            .with_examples(examples)
            .with_example_key(Arc::new(|item: &QuizItem| item.composite_key.clone()));

        let mut by_source: HashMap<String, Vec<SharedItem>> = HashMap::new();
        for item in inner.data() {
            if let Some(source) = &item.source_quiz_id {
                by_source
                    .entry(source.clone())
                    .or_default()
                    .push(Arc::clone(item));
            }
        }

        Self {
            inner,
            by_source,
            sources,
        }
    }

    /// Adjusts the merged quiz (symbol, correctness) after construction.
    pub fn map_inner(mut self, f: impl FnOnce(StandardQuiz) -> StandardQuiz) -> Self {
        self.inner = f(self.inner);
        self
    }

    pub fn data(&self) -> &[SharedItem] {
        self.inner.data()
    }

    pub fn sources(&self) -> &[SourceMeta] {
        &self.sources
    }

    pub fn source_pool(&self, source_id: &str) -> &[SharedItem] {
        self.by_source
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn redraw_key(item: &QuizItem) -> Option<String> {
    if let Some(key) = &item.composite_key {
        return Some(key.clone());
    }
    [("id", "id"), ("english", "en"), ("thai", "th"), ("phonetic", "ph")]
        .iter()
        .find_map(|(field, prefix)| item.text(field).map(|v| format!("{prefix}::{v}")))
}

impl RoundPicker for CompositeQuiz {
    fn pick_round(&self, ctx: &RoundContext<'_>, rng: &mut dyn RngCore) -> Option<Round> {
        let mut round = self.inner.pick_round(ctx, rng)?;
        let Some(source) = round.answer.source_quiz_id.as_deref() else {
            return Some(round);
        };
        let pool = self.source_pool(source);
        let target = self.inner.selector().target_choices(ctx.correct_answers);
        if pool.len() < target {
            return Some(round);
        }

        // Same-source items that would also be judged correct stay out of the distractors.
        let answer = Arc::clone(&round.answer);
        let distractor_pool: Vec<SharedItem> = pool
            .iter()
            .filter(|item| Arc::ptr_eq(item, &answer) || !self.inner.is_correct(item, &answer))
            .cloned()
            .collect();
        let choices = pick_unique_choices(&distractor_pool, target, redraw_key, Some(&answer), rng);
        if !choices.is_empty() {
            round.choices = choices;
        }
        Some(round)
    }

    fn is_correct(&self, choice: &QuizItem, answer: &QuizItem) -> bool {
        self.inner.is_correct(choice, answer)
    }

    fn choice_label(&self, choice: &QuizItem, locale: &str) -> String {
        self.inner.choice_label(choice, locale)
    }

    fn choice_aria_label(&self, choice: &QuizItem, locale: &str) -> String {
        self.inner.choice_aria_label(choice, locale)
    }

    fn symbol(&self, answer: &QuizItem) -> Symbol {
        self.inner.symbol(answer)
    }

    fn example_for(&self, answer: &QuizItem) -> Option<Example> {
        self.inner.example_for(answer)
    }

    fn has_examples(&self) -> bool {
        self.inner.has_examples()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_key_order() {
        let item = QuizItem::from_value(json!({"english": "red", "id": 7}));
        assert_eq!(default_example_key(&item, 3), "7");
        let item = QuizItem::from_value(json!({"thai": "แดง"}));
        assert_eq!(default_example_key(&item, 3), "แดง");
        let item = QuizItem::from_value(json!({"other": true}));
        assert_eq!(default_example_key(&item, 3), "3");
    }

    #[test]
    fn source_id_fallbacks() {
        assert_eq!(SourceDescriptor::quiz("colors").resolved_source_id(0), "colors");
        assert_eq!(
            SourceDescriptor::url("https://x/y.json").resolved_source_id(1),
            "https://x/y.json"
        );
        assert_eq!(SourceDescriptor::inline(vec![]).resolved_source_id(2), "source-2");
        assert_eq!(
            SourceDescriptor::quiz("colors")
                .with_source_id("c")
                .resolved_source_id(0),
            "c"
        );
    }

    #[test]
    fn default_location_uses_quiz_id() {
        assert_eq!(
            SourceDescriptor::quiz("numbers").data_location().as_deref(),
            Some("data/numbers.json")
        );
        assert_eq!(SourceDescriptor::inline(vec![]).data_location(), None);
    }

    #[test]
    fn unknown_example_keys_are_namespaced_too() {
        let mut key_map = HashMap::new();
        key_map.insert("1".to_string(), "a::1".to_string());
        let examples: ExampleMap =
            serde_json::from_value(json!({"1": "one", "orphan": "lost"})).unwrap();
        let remapped = remap_examples(examples, &key_map, "a");
        assert!(remapped.contains_key("a::1"));
        assert!(remapped.contains_key("a::orphan"));
    }
}
