use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceThreshold {
    pub correct_answers: u32,
    pub choices: usize,
}

/// Step function from cumulative correct answers to the number of choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveDifficulty {
    pub choices_thresholds: Vec<ChoiceThreshold>,
}

impl Default for ProgressiveDifficulty {
    fn default() -> Self {
        Self {
            choices_thresholds: vec![
                ChoiceThreshold { correct_answers: 20, choices: 5 },
                ChoiceThreshold { correct_answers: 40, choices: 6 },
                ChoiceThreshold { correct_answers: 60, choices: 7 },
                ChoiceThreshold { correct_answers: 80, choices: 8 },
            ],
        }
    }
}

impl ProgressiveDifficulty {
    /// Choices for the highest threshold met, else `base`.
    pub fn choices_for(&self, correct_answers: u32, base: usize) -> usize {
        self.choices_thresholds
            .iter()
            .filter(|t| correct_answers >= t.correct_answers)
            .max_by_key(|t| t.correct_answers)
            .map(|t| t.choices)
            .unwrap_or(base)
    }
}

/// `None` disables scaling and always yields the base count (at least 1).
pub fn choices_count(
    correct_answers: u32,
    progressive: Option<&ProgressiveDifficulty>,
    base_choices: usize,
) -> usize {
    let base = if base_choices > 0 { base_choices } else { 4 };
    match progressive {
        Some(table) => table.choices_for(correct_answers, base).max(1),
        None => base,
    }
}
