pub mod keys;
pub mod operations;
pub mod trees;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

/// Key-value store behind quiz progress and player settings.
///
/// Values are UTF-8 strings (JSON for structured entries). When the durable
/// sled database is unavailable the store runs on the in-process map only,
/// which keeps a session consistent but does not survive a restart.
#[derive(Debug)]
pub struct Store {
    db: Option<Db>,
    kv: Option<sled::Tree>,
    memory: Mutex<BTreeMap<String, String>>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("value under key {key} is not valid UTF-8")]
    InvalidUtf8 { key: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let kv = db.open_tree(trees::LOCAL_STORAGE)?;
        probe(&kv)?;
        Ok(Self {
            db: Some(db),
            kv: Some(kv),
            memory: Mutex::new(BTreeMap::new()),
        })
    }

    /// Opens the durable store, or falls back to memory-only mode when that fails.
    pub fn open_or_memory(sled_path: &str) -> Self {
        match Self::open(sled_path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(
                    path = sled_path,
                    error = %e,
                    "Durable storage unavailable, progress will not survive restart"
                );
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            db: None,
            kv: None,
            memory: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn is_durable(&self) -> bool {
        self.kv.is_some()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(db) = &self.db {
            db.flush()?;
        }
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(kv) = &self.kv else {
            return Ok(self.memory_get(key));
        };
        match kv.get(key.as_bytes())? {
            Some(raw) => String::from_utf8(raw.to_vec())
                .map(Some)
                .map_err(|_| StoreError::InvalidUtf8 {
                    key: key.to_string(),
                }),
            None => Ok(self.memory_get(key)),
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match &self.kv {
            Some(kv) => {
                kv.insert(key.as_bytes(), value.as_bytes())?;
            }
            None => self.memory_set(key, value),
        }
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.memory().remove(key);
        if let Some(kv) = &self.kv {
            kv.remove(key.as_bytes())?;
        }
        Ok(())
    }

    /// All keys starting with `prefix`, durable and in-memory, without duplicates.
    pub fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut out: Vec<String> = Vec::new();
        if let Some(kv) = &self.kv {
            for item in kv.scan_prefix(prefix.as_bytes()) {
                let (k, _) = item?;
                if let Ok(key) = String::from_utf8(k.to_vec()) {
                    out.push(key);
                }
            }
        }
        for key in self.memory().keys() {
            if key.starts_with(prefix) && !out.contains(key) {
                out.push(key.clone());
            }
        }
        Ok(out)
    }

    pub fn clear_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let keys = self.keys(prefix)?;
        for key in &keys {
            self.remove_item(key)?;
        }
        Ok(keys.len())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_item(key)? {
            Some(raw) if !raw.is_empty() => Ok(Some(Self::deserialize(raw.as_bytes())?)),
            _ => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = Self::serialize(value)?;
        let raw = String::from_utf8(bytes).map_err(|_| StoreError::InvalidUtf8 {
            key: key.to_string(),
        })?;
        self.set_item(key, &raw)
    }

    /// Leading-integer parse of the stored value; `None` when missing or not numeric.
    pub fn get_number(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.get_item(key)?.as_deref().and_then(parse_leading_int))
    }

    pub fn set_number(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set_item(key, &value.to_string())
    }

    pub(crate) fn memory_get(&self, key: &str) -> Option<String> {
        self.memory().get(key).cloned()
    }

    pub(crate) fn memory_set(&self, key: &str, value: &str) {
        self.memory().insert(key.to_string(), value.to_string());
    }

    fn memory(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Write-then-remove probe; a tree that cannot take a write is treated as unavailable.
fn probe(kv: &sled::Tree) -> Result<(), StoreError> {
    let probe_key = format!(
        "{}{}",
        keys::STORAGE_PROBE_PREFIX,
        chrono::Utc::now().timestamp_millis()
    );
    kv.insert(probe_key.as_bytes(), b"1".as_slice())?;
    kv.remove(probe_key.as_bytes())?;
    Ok(())
}

/// `parseInt`-style parse: optional sign followed by leading digits.
pub(crate) fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .as_bytes()
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
