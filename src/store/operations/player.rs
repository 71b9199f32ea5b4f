use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::DEFAULT_PHONETIC_LOCALE;
use crate::quiz::phonetics::normalize_locale;
use crate::store::keys;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAttempt {
    pub quiz_id: String,
    /// 0 when derived from progress alone (no timestamp recorded yet)
    pub last_attempt_ms: i64,
}

fn machine_fingerprint() -> String {
    let var = |name: &str| std::env::var(name).unwrap_or_default();
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    [
        var("USER") + &var("USERNAME"),
        var("LANG"),
        var("HOSTNAME") + &var("COMPUTERNAME"),
        cpus,
        std::env::consts::OS.to_string(),
        std::env::consts::ARCH.to_string(),
    ]
    .join("|")
}

fn player_id_from_fingerprint(fingerprint: &str) -> String {
    let digest = Sha256::digest(fingerprint.as_bytes());
    format!("Player_{}", hex::encode_upper(&digest[..4]))
}

impl Store {
    /// Stable anonymous id, generated on first use and then persisted.
    pub fn player_id(&self) -> String {
        match self.get_item(keys::PLAYER_ID_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => return id,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read player id");
                let fallback = uuid::Uuid::new_v4().simple().to_string();
                return format!("Player_{}", &fallback[..8].to_ascii_uppercase());
            }
        }
        let id = player_id_from_fingerprint(&machine_fingerprint());
        if let Err(e) = self.set_item(keys::PLAYER_ID_KEY, &id) {
            tracing::warn!(error = %e, "Failed to persist player id");
            self.memory_set(keys::PLAYER_ID_KEY, &id);
        }
        id
    }

    pub fn custom_player_name(&self) -> Option<String> {
        self.get_item(keys::CUSTOM_NAME_KEY)
            .ok()
            .flatten()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    /// A blank name removes the custom name. Returns false when storage refused the change.
    pub fn set_custom_player_name(&self, name: &str) -> bool {
        let trimmed = name.trim();
        let result = if trimmed.is_empty() {
            self.remove_item(keys::CUSTOM_NAME_KEY)
        } else {
            self.set_item(keys::CUSTOM_NAME_KEY, trimmed)
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to update custom player name");
                false
            }
        }
    }

    pub fn player_display_name(&self) -> String {
        self.custom_player_name()
            .unwrap_or_else(|| self.player_id())
    }

    /// Quiz with the newest last-attempt stamp, else the one with the most answers.
    pub fn latest_attempt(&self) -> Option<LatestAttempt> {
        let stamped = self
            .keys(keys::LAST_ATTEMPT_PREFIX)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|key| {
                let quiz_id = keys::quiz_id_from_key(&key, keys::LAST_ATTEMPT_PREFIX)?.to_string();
                let ms = self.get_number(&key).ok().flatten()?;
                (ms > 0).then_some(LatestAttempt {
                    quiz_id,
                    last_attempt_ms: ms,
                })
            })
            .max_by_key(|attempt| attempt.last_attempt_ms);
        if stamped.is_some() {
            return stamped;
        }

        self.list_all_progress_entries()
            .into_iter()
            .filter(|entry| entry.questions_answered > 0)
            .max_by_key(|entry| entry.questions_answered)
            .map(|entry| LatestAttempt {
                quiz_id: entry.quiz_id,
                last_attempt_ms: 0,
            })
    }

    pub fn preferred_phonetic_locale(&self) -> String {
        self.get_item(keys::PHONETIC_LOCALE_KEY)
            .ok()
            .flatten()
            .map(|raw| normalize_locale(&raw))
            .filter(|locale| !locale.is_empty())
            .unwrap_or_else(|| DEFAULT_PHONETIC_LOCALE.to_string())
    }

    /// Stores the normalized locale (default `en` when it normalizes to nothing) and returns it.
    pub fn set_preferred_phonetic_locale(&self, locale: &str) -> String {
        let mut normalized = normalize_locale(locale);
        if normalized.is_empty() {
            normalized = DEFAULT_PHONETIC_LOCALE.to_string();
        }
        if let Err(e) = self.set_item(keys::PHONETIC_LOCALE_KEY, &normalized) {
            tracing::warn!(error = %e, "Failed to persist phonetic locale");
            self.memory_set(keys::PHONETIC_LOCALE_KEY, &normalized);
        }
        normalized
    }
}
