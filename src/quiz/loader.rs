//! JSON dataset, example map and catalog loading.
//!
//! Locations starting with `http://` or `https://` are fetched with reqwest,
//! anything else is read from disk relative to the asset root. Cached loads
//! share one in-flight future per location; a failed load is evicted so the
//! next caller retries.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::answer::AnswerResolver;
use super::types::{ExampleMap, QuizItem};
use crate::constants::DEFAULT_FETCH_TIMEOUT_SECS;

pub const CATALOG_LOCATION: &str = "data/quizzes.json";

const MAX_BODY_BYTES: usize = 20 * 1_024 * 1_024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("request to {location} failed: {message}")]
    Request { location: String, message: String },
    #[error("{location} returned status {status}")]
    Status { location: String, status: u16 },
    #[error("{location} exceeds the {limit} byte limit")]
    TooLarge { location: String, limit: usize },
    #[error("failed to read {location}: {message}")]
    Io { location: String, message: String },
    #[error("invalid JSON in {location}: {message}")]
    Json { location: String, message: String },
    #[error("{location} is not a JSON array")]
    NotArray { location: String },
    #[error("{location} is not a JSON object")]
    NotObject { location: String },
    #[error("quiz {quiz_id} is not listed in the catalog")]
    UnknownQuiz { quiz_id: String },
}

/// One entry of `data/quizzes.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizMeta {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pro_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_phonetics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_locales: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<String>,
    /// Examples location, e.g. `data/foods-examples.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub example_fields: Vec<String>,
}

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Value>, LoadError>>>;

pub struct DatasetLoader {
    client: reqwest::Client,
    asset_root: PathBuf,
    cache: Mutex<HashMap<String, SharedLoad>>,
}

impl DatasetLoader {
    pub fn new(asset_root: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        let timeout = if timeout_secs == 0 {
            DEFAULT_FETCH_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            asset_root: asset_root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn asset_root(&self) -> &std::path::Path {
        &self.asset_root
    }

    /// Uncached load.
    pub async fn fetch_json(&self, location: &str) -> Result<Value, LoadError> {
        load_json(self.client.clone(), self.asset_root.clone(), location.to_string()).await
    }

    /// Shares in-flight and resolved loads per location.
    pub async fn fetch_json_cached(&self, location: &str) -> Result<Arc<Value>, LoadError> {
        let shared = {
            let mut cache = self.cache();
            match cache.get(location) {
                Some(existing) => existing.clone(),
                None => {
                    let client = self.client.clone();
                    let root = self.asset_root.clone();
                    let owned = location.to_string();
                    let fut: BoxFuture<'static, Result<Arc<Value>, LoadError>> =
                        async move { load_json(client, root, owned).await.map(Arc::new) }.boxed();
                    let shared = fut.shared();
                    cache.insert(location.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;
        if let Err(e) = &result {
            let mut cache = self.cache();
            // a retry may already have replaced the failed entry
            if cache.get(location).is_some_and(|current| current.ptr_eq(&shared)) {
                tracing::warn!(location, error = %e, "Load failed, evicting cache entry");
                cache.remove(location);
            }
        }
        result
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    pub async fn fetch_dataset(&self, location: &str, cached: bool) -> Result<Vec<Value>, LoadError> {
        let value = self.fetch(location, cached).await?;
        match &*value {
            Value::Array(items) => Ok(items.clone()),
            _ => Err(LoadError::NotArray {
                location: location.to_string(),
            }),
        }
    }

    pub async fn fetch_items(&self, location: &str) -> Result<Vec<QuizItem>, LoadError> {
        Ok(self
            .fetch_dataset(location, true)
            .await?
            .into_iter()
            .map(QuizItem::from_value)
            .collect())
    }

    pub async fn fetch_examples(&self, location: &str, cached: bool) -> Result<ExampleMap, LoadError> {
        let value = self.fetch(location, cached).await?;
        if !value.is_object() {
            return Err(LoadError::NotObject {
                location: location.to_string(),
            });
        }
        serde_json::from_value((*value).clone()).map_err(|e| LoadError::Json {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn fetch_catalog(&self) -> Result<Vec<QuizMeta>, LoadError> {
        let items = self.fetch_dataset(CATALOG_LOCATION, true).await?;
        let mut catalog = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<QuizMeta>(item) {
                Ok(meta) if !meta.id.is_empty() => catalog.push(meta),
                Ok(_) => tracing::warn!("Catalog entry without id skipped"),
                Err(e) => tracing::warn!(error = %e, "Malformed catalog entry skipped"),
            }
        }
        Ok(catalog)
    }

    pub async fn find_quiz_meta(&self, quiz_id: &str) -> Result<QuizMeta, LoadError> {
        self.fetch_catalog()
            .await?
            .into_iter()
            .find(|meta| meta.id == quiz_id)
            .ok_or_else(|| LoadError::UnknownQuiz {
                quiz_id: quiz_id.to_string(),
            })
    }

    async fn fetch(&self, location: &str, cached: bool) -> Result<Arc<Value>, LoadError> {
        if cached {
            self.fetch_json_cached(location).await
        } else {
            self.fetch_json(location).await.map(Arc::new)
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, SharedLoad>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

async fn load_json(
    client: reqwest::Client,
    asset_root: PathBuf,
    location: String,
) -> Result<Value, LoadError> {
    let bytes = if is_remote(&location) {
        fetch_remote(&client, &location).await?
    } else {
        let path = asset_root.join(location.trim_start_matches("./"));
        tokio::fs::read(&path).await.map_err(|e| LoadError::Io {
            location: location.clone(),
            message: e.to_string(),
        })?
    };
    serde_json::from_slice(&bytes).map_err(|e| LoadError::Json {
        location,
        message: e.to_string(),
    })
}

async fn fetch_remote(client: &reqwest::Client, location: &str) -> Result<Vec<u8>, LoadError> {
    let response = client
        .get(location)
        .send()
        .await
        .map_err(|e| LoadError::Request {
            location: location.to_string(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(LoadError::Status {
            location: location.to_string(),
            status: response.status().as_u16(),
        });
    }

    let too_large = || LoadError::TooLarge {
        location: location.to_string(),
        limit: MAX_BODY_BYTES,
    };
    if let Some(len) = response.content_length() {
        if len > MAX_BODY_BYTES as u64 {
            return Err(too_large());
        }
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LoadError::Request {
            location: location.to_string(),
            message: e.to_string(),
        })?;
        body.extend_from_slice(&chunk);
        if body.len() > MAX_BODY_BYTES {
            return Err(too_large());
        }
    }
    Ok(body)
}

/// Number of items missing at least one required key (null counts as missing).
pub fn validate_dataset(items: &[QuizItem], required_keys: &[&str]) -> usize {
    let missing = items
        .iter()
        .filter(|item| {
            required_keys
                .iter()
                .any(|key| item.get(key).map_or(true, Value::is_null))
        })
        .count();
    if missing > 0 {
        tracing::warn!(missing, ?required_keys, "Dataset items missing required keys");
    }
    missing
}

/// Items the resolver cannot read an answer from.
pub fn validate_answer_keys(items: &[QuizItem], resolver: &AnswerResolver) -> usize {
    let missing = items
        .iter()
        .filter(|item| resolver.equality_key(item).is_none())
        .count();
    if missing > 0 {
        tracing::warn!(missing, ?resolver, "Dataset items without an answer key");
    }
    missing
}

/// Example keys with no item whose `key` field matches, sorted.
pub fn validate_examples(items: &[QuizItem], examples: &ExampleMap, key: &str) -> Vec<String> {
    let known: HashSet<String> = items
        .iter()
        .map(|item| item.text(key).unwrap_or_default())
        .collect();
    let mut unknown: Vec<String> = examples
        .keys()
        .filter(|k| !known.contains(k.as_str()))
        .cloned()
        .collect();
    unknown.sort();
    if !unknown.is_empty() {
        let preview: Vec<&str> = unknown.iter().take(10).map(String::as_str).collect();
        tracing::warn!(
            count = unknown.len(),
            preview = %preview.join(", "),
            "Unmatched example keys"
        );
    }
    unknown
}
