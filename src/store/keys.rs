pub const PROGRESS_PREFIX: &str = "thaiQuest.progress.";
pub const LAST_ATTEMPT_PREFIX: &str = "thaiQuest.lastAttempt.";
pub const PLAYER_ID_KEY: &str = "thaiQuestPlayerID";
pub const CUSTOM_NAME_KEY: &str = "thaiQuestCustomName";
pub const PHONETIC_LOCALE_KEY: &str = "thaiQuest.settings.phoneticLocale";
pub const STORAGE_PROBE_PREFIX: &str = "__thaiQuest_storage_test__";

pub fn progress_key(quiz_id: &str) -> String {
    format!("{}{}", PROGRESS_PREFIX, quiz_id)
}

pub fn last_attempt_key(quiz_id: &str) -> String {
    format!("{}{}", LAST_ATTEMPT_PREFIX, quiz_id)
}

/// Inverse of [`progress_key`] / [`last_attempt_key`] for a given prefix.
pub fn quiz_id_from_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|id| !id.is_empty())
}
