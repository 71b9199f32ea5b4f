//! Rendering seam between a quiz session and whatever draws it.

use std::fmt;

use thiserror::Error;

use super::rating::format_stars;
use super::types::{Example, Symbol};

/// Anchors a view must provide before a session can run.
pub const REQUIRED_ANCHORS: [&str; 5] = ["symbol", "options", "feedback", "nextBtn", "stats"];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render target {0} is unavailable")]
    Unavailable(&'static str),
    #[error("render failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoiceMark {
    #[default]
    None,
    Correct,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    /// 1-based, matches the keyboard digit
    pub position: usize,
    pub label: String,
    pub aria_label: String,
    pub disabled: bool,
    pub mark: ChoiceMark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundView {
    pub symbol: Symbol,
    pub symbol_aria_label: String,
    pub choices: Vec<ChoiceView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Clear,
    Correct,
    Wrong,
    Example(Example),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsLine {
    pub questions_answered: u32,
    pub max_questions: u32,
    pub correct_answers: u32,
    pub accuracy: u32,
    pub stars: u8,
}

impl fmt::Display for StatsLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Questions: {}/{} | Correct: {} | Accuracy: {}% | {}",
            self.questions_answered,
            self.max_questions,
            self.correct_answers,
            self.accuracy,
            format_stars(self.stars)
        )
    }
}

pub trait QuizView {
    /// Names from [`REQUIRED_ANCHORS`] this view cannot render into.
    fn missing_anchors(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn render_round(&mut self, round: &RoundView) -> Result<(), RenderError>;

    fn update_choices(&mut self, choices: &[ChoiceView]) -> Result<(), RenderError>;

    fn show_feedback(&mut self, feedback: &Feedback) -> Result<(), RenderError>;

    fn show_no_data(&mut self, message: &str) -> Result<(), RenderError>;

    fn update_stats(&mut self, stats: &StatsLine) -> Result<(), RenderError>;

    fn set_restart_visible(&mut self, visible: bool) -> Result<(), RenderError>;
}
