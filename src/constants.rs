/// Number of counted answers per quiz before the session caps
pub const DEFAULT_QUESTION_CAP: u32 = 100;

/// Correct answers required before a quiz can earn stars or count as completed.
/// Deliberately independent of the configured question cap.
pub const COMPLETION_CORRECT_THRESHOLD: u32 = 100;

/// Base number of choices shown per round
pub const DEFAULT_BASE_CHOICES: usize = 4;

/// Default answer field
pub const DEFAULT_ANSWER_KEY: &str = "phonetic";

/// Auto-advance delay after a correct answer (milliseconds)
pub const AUTO_ADVANCE_MS: u64 = 1_500;

/// Auto-advance delay when an on-answered hook (worked example) is configured
pub const AUTO_ADVANCE_WITH_EXAMPLE_MS: u64 = 3_000;

/// Highest keyboard digit that maps to a choice
pub const MAX_KEYBOARD_CHOICE: u32 = 9;

/// Default phonetic display locale
pub const DEFAULT_PHONETIC_LOCALE: &str = "en";

/// Separator between a source id and its raw example key
pub const COMPOSITE_KEY_SEPARATOR: &str = "::";

/// Shown when a quiz has nothing to ask
pub const NO_DATA_MESSAGE: &str = "No data available for this quiz.";

/// Shown when a dataset could not be fetched
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data.";

/// XP curve coefficient (`A` in `A * L^p`)
pub const XP_CURVE_A: f64 = 80.0;

/// XP curve exponent (`p` in `A * L^p`)
pub const XP_CURVE_P: f64 = 1.9;

/// Dataset fetch timeout (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
