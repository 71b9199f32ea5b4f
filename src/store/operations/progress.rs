use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::keys;
use crate::store::{parse_leading_int, Store, StoreError};

/// Persisted per-quiz counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub questions_answered: u32,
    pub correct_answers: u32,
}

impl Progress {
    pub const ZERO: Progress = Progress {
        questions_answered: 0,
        correct_answers: 0,
    };

    pub fn new(questions_answered: u32, correct_answers: u32) -> Self {
        Self {
            questions_answered,
            correct_answers,
        }
    }

    /// Coerces an arbitrary stored blob into a valid progress pair.
    ///
    /// Each field goes through an integer coercion (integers, floored floats,
    /// numeric strings); anything else, including negatives, becomes 0.
    pub fn from_value(value: &Value) -> Self {
        Self {
            questions_answered: coerce_count(value.get("questionsAnswered")),
            correct_answers: coerce_count(value.get("correctAnswers")),
        }
    }

    /// Caps answered at `cap` and correct at answered.
    pub fn clamped(self, cap: u32) -> Self {
        let questions_answered = self.questions_answered.min(cap);
        Self {
            questions_answered,
            correct_answers: self.correct_answers.min(questions_answered),
        }
    }
}

fn coerce_count(field: Option<&Value>) -> u32 {
    let parsed: Option<i64> = match field {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            }),
        Some(Value::String(s)) => parse_leading_int(s),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub quiz_id: String,
    pub questions_answered: u32,
    pub correct_answers: u32,
}

impl ProgressEntry {
    pub fn progress(&self) -> Progress {
        Progress::new(self.questions_answered, self.correct_answers)
    }
}

impl Store {
    /// Strict read: storage and parse failures are returned to the caller.
    pub fn try_get_quiz_progress(&self, quiz_id: &str) -> Result<Progress, StoreError> {
        let key = keys::progress_key(quiz_id);
        let value: Option<Value> = self.get_json(&key)?;
        Ok(value.map(|v| Progress::from_value(&v)).unwrap_or_default())
    }

    /// Never fails; missing, corrupt or unreadable data reads as zero progress.
    pub fn get_quiz_progress(&self, quiz_id: &str) -> Progress {
        if quiz_id.is_empty() {
            return Progress::ZERO;
        }
        match self.try_get_quiz_progress(quiz_id) {
            Ok(progress) => progress,
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(quiz_id, error = %e, "Corrupt progress entry, treating as empty");
                Progress::ZERO
            }
            Err(e) => {
                tracing::warn!(quiz_id, error = %e, "Progress read failed, using in-memory copy");
                self.memory_get(&keys::progress_key(quiz_id))
                    .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
                    .map(|v| Progress::from_value(&v))
                    .unwrap_or_default()
            }
        }
    }

    /// Persists progress and stamps the last-attempt time. Storage failures are
    /// absorbed by keeping the value in memory for the rest of the process.
    pub fn save_quiz_progress(&self, quiz_id: &str, progress: Progress) {
        if quiz_id.is_empty() {
            return;
        }
        let key = keys::progress_key(quiz_id);
        if let Err(e) = self.set_json(&key, &progress) {
            tracing::warn!(quiz_id, error = %e, "Progress write failed, keeping in memory");
            if let Ok(raw) = serde_json::to_string(&progress) {
                self.memory_set(&key, &raw);
            }
        }
        let now_ms = chrono::Utc::now().timestamp_millis();
        let attempt_key = keys::last_attempt_key(quiz_id);
        if let Err(e) = self.set_number(&attempt_key, now_ms) {
            tracing::debug!(quiz_id, error = %e, "Last-attempt write failed");
            self.memory_set(&attempt_key, &now_ms.to_string());
        }
    }

    pub fn list_all_progress_entries(&self) -> Vec<ProgressEntry> {
        let keys = match self.keys(keys::PROGRESS_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to scan progress entries");
                return Vec::new();
            }
        };
        keys.iter()
            .filter_map(|key| keys::quiz_id_from_key(key, keys::PROGRESS_PREFIX))
            .map(|quiz_id| {
                let progress = self.get_quiz_progress(quiz_id);
                ProgressEntry {
                    quiz_id: quiz_id.to_string(),
                    questions_answered: progress.questions_answered,
                    correct_answers: progress.correct_answers,
                }
            })
            .collect()
    }

    /// Removes every progress entry, every last-attempt stamp and the custom player name.
    pub fn reset_all_progress(&self) {
        for prefix in [keys::PROGRESS_PREFIX, keys::LAST_ATTEMPT_PREFIX] {
            if let Err(e) = self.clear_prefix(prefix) {
                tracing::warn!(prefix, error = %e, "Failed to clear entries");
            }
        }
        if let Err(e) = self.remove_item(keys::CUSTOM_NAME_KEY) {
            tracing::warn!(error = %e, "Failed to clear custom player name");
        }
    }
}
