use std::env;
use std::str::FromStr;

use crate::constants::{
    AUTO_ADVANCE_MS, AUTO_ADVANCE_WITH_EXAMPLE_MS, DEFAULT_BASE_CHOICES,
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_PHONETIC_LOCALE, DEFAULT_QUESTION_CAP,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    /// Root that relative dataset locations such as `data/colors.json` resolve against
    pub asset_root: String,
    pub quiz: QuizEnvConfig,
    pub speech: SpeechConfig,
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct QuizEnvConfig {
    pub question_cap: u32,
    pub base_choices: usize,
    pub progressive_difficulty: bool,
    pub phonetic_locale: String,
    pub auto_advance_ms: u64,
    pub auto_advance_with_example_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Program invoked with the Thai text as its last argument
    pub command: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/progress.sled"),
            asset_root: env_or("ASSET_ROOT", "."),
            quiz: QuizEnvConfig {
                question_cap: env_or_parse("QUESTION_CAP", DEFAULT_QUESTION_CAP).max(1),
                base_choices: env_or_parse("BASE_CHOICES", DEFAULT_BASE_CHOICES).max(1),
                progressive_difficulty: env_or_bool("PROGRESSIVE_DIFFICULTY", true),
                phonetic_locale: env_or("PHONETIC_LOCALE", DEFAULT_PHONETIC_LOCALE),
                auto_advance_ms: env_or_parse("AUTO_ADVANCE_MS", AUTO_ADVANCE_MS),
                auto_advance_with_example_ms: env_or_parse(
                    "AUTO_ADVANCE_WITH_EXAMPLE_MS",
                    AUTO_ADVANCE_WITH_EXAMPLE_MS,
                ),
            },
            speech: SpeechConfig {
                enabled: env_or_bool("SOUND_ENABLED", false),
                command: env_or("TTS_COMMAND", "espeak-ng -v th"),
            },
            fetch_timeout_secs: env_or_parse("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
