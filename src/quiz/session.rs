//! One quiz screen: the live round, capped counters, scoring, persistence
//! and the auto-advance timer.
//!
//! The session is driven by a single owner. Clicks and key presses come in
//! through [`QuizSession::click`] and [`QuizSession::press_key`]; elapsed
//! timers come back as [`AdvanceTicket`]s through [`QuizSession::on_advance`].

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use super::phonetics::normalize_locale;
use super::picker::{RoundPicker, SYMBOL_LABEL_PREFIX};
use super::rating::{accuracy_percent, compute_star_rating};
use super::timer::{AdvanceHandle, AdvanceScheduler, AdvanceTicket};
use super::types::{QuizItem, Round, RoundContext, SharedItem, Symbol};
use super::view::{ChoiceMark, ChoiceView, Feedback, QuizView, RenderError, RoundView, StatsLine};
use crate::constants::{
    AUTO_ADVANCE_MS, AUTO_ADVANCE_WITH_EXAMPLE_MS, DEFAULT_PHONETIC_LOCALE, DEFAULT_QUESTION_CAP,
    MAX_KEYBOARD_CHOICE, NO_DATA_MESSAGE,
};
use crate::services::speech::Speaker;
use crate::store::operations::progress::Progress;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("quiz view is missing required anchors: {}", .missing.join(", "))]
    ConfigMissing { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub quiz_id: String,
    pub max_questions: u32,
    pub sound_enabled: bool,
    pub phonetic_locale: String,
    pub auto_advance_ms: u64,
    pub auto_advance_with_example_ms: u64,
    pub enable_keyboard: bool,
}

impl SessionOptions {
    pub fn new(quiz_id: &str) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            max_questions: DEFAULT_QUESTION_CAP,
            sound_enabled: false,
            phonetic_locale: DEFAULT_PHONETIC_LOCALE.to_string(),
            auto_advance_ms: AUTO_ADVANCE_MS,
            auto_advance_with_example_ms: AUTO_ADVANCE_WITH_EXAMPLE_MS,
            enable_keyboard: true,
        }
    }

    pub fn with_max_questions(mut self, max_questions: u32) -> Self {
        self.max_questions = max_questions;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingAnswer,
    AutoAdvancing,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoRound,
    NotAwaiting,
    OutOfRange,
    Disabled,
    AlreadyClicked,
    KeyboardDisabled,
    NotAChoiceKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// `counted` is false once the cap is reached.
    Correct { counted: bool },
    Wrong { counted: bool },
    Ignored(IgnoreReason),
}

/// Snapshot of the session for callers and hooks.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub current_answer: Option<SharedItem>,
    pub current_choices: Vec<SharedItem>,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub is_awaiting_answer: bool,
    pub auto_advance: bool,
    pub max_questions: u32,
}

pub struct AnsweredEvent<'a> {
    pub correct: bool,
    pub counted: bool,
    pub choice: &'a QuizItem,
    pub answer: &'a QuizItem,
    pub progress: Progress,
}

pub type AnsweredHook = Box<dyn FnMut(&AnsweredEvent<'_>) + Send>;
pub type RoundStartHook = Box<dyn FnMut(&Round) + Send>;

#[derive(Debug, Clone, Copy, Default)]
struct ChoiceSlot {
    mark: ChoiceMark,
    disabled: bool,
}

pub struct QuizSession<V: QuizView> {
    picker: Box<dyn RoundPicker>,
    store: Arc<Store>,
    view: V,
    scheduler: Box<dyn AdvanceScheduler>,
    speaker: Option<Arc<dyn Speaker>>,
    on_answered: Option<AnsweredHook>,
    on_round_start: Option<RoundStartHook>,
    rng: StdRng,
    options: SessionOptions,
    locale: String,
    progress: Progress,
    phase: SessionPhase,
    round: Option<Round>,
    slots: Vec<ChoiceSlot>,
    generation: u64,
    pending: Option<Box<dyn AdvanceHandle>>,
}

impl<V: QuizView> QuizSession<V> {
    /// Seeds counters from the store. Nothing is rendered until [`start`](Self::start).
    pub fn new(
        picker: Box<dyn RoundPicker>,
        store: Arc<Store>,
        view: V,
        scheduler: Box<dyn AdvanceScheduler>,
        mut options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let missing: Vec<String> = view
            .missing_anchors()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(SessionError::ConfigMissing { missing });
        }

        options.max_questions = options.max_questions.max(1);
        let progress = store
            .get_quiz_progress(&options.quiz_id)
            .clamped(options.max_questions);
        let locale = locale_or_default(&options.phonetic_locale);

        Ok(Self {
            picker,
            store,
            view,
            scheduler,
            speaker: None,
            on_answered: None,
            on_round_start: None,
            rng: StdRng::from_entropy(),
            options,
            locale,
            progress,
            phase: SessionPhase::NoData,
            round: None,
            slots: Vec::new(),
            generation: 0,
            pending: None,
        })
    }

    pub fn with_speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_on_answered(mut self, hook: AnsweredHook) -> Self {
        self.on_answered = Some(hook);
        self
    }

    pub fn with_on_round_start(mut self, hook: RoundStartHook) -> Self {
        self.on_round_start = Some(hook);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn start(&mut self) {
        tracing::debug!(
            quiz_id = %self.options.quiz_id,
            questions_answered = self.progress.questions_answered,
            correct_answers = self.progress.correct_answers,
            "Quiz session started"
        );
        self.pick_question();
        self.refresh_stats();
    }

    /// Manual advance; drops any pending auto-advance.
    pub fn next(&mut self) {
        self.pick_question();
    }

    /// Zeroes the counters here and in the store, then draws a new round.
    pub fn restart(&mut self) {
        self.cancel_pending();
        self.progress = Progress::ZERO;
        self.store
            .save_quiz_progress(&self.options.quiz_id, Progress::ZERO);
        tracing::info!(quiz_id = %self.options.quiz_id, "Quiz progress restarted");
        self.pick_question();
        self.refresh_stats();
    }

    /// Scores the choice at `index` (0-based, display order).
    pub fn click(&mut self, index: usize) -> ClickOutcome {
        match self.phase {
            SessionPhase::AwaitingAnswer => {}
            SessionPhase::AutoAdvancing => return ClickOutcome::Ignored(IgnoreReason::NotAwaiting),
            SessionPhase::NoData => return ClickOutcome::Ignored(IgnoreReason::NoRound),
        }
        let Some(round) = self.round.as_ref() else {
            return ClickOutcome::Ignored(IgnoreReason::NoRound);
        };
        let Some(slot) = self.slots.get(index) else {
            return ClickOutcome::Ignored(IgnoreReason::OutOfRange);
        };
        if slot.disabled {
            return ClickOutcome::Ignored(IgnoreReason::Disabled);
        }
        if slot.mark != ChoiceMark::None {
            return ClickOutcome::Ignored(IgnoreReason::AlreadyClicked);
        }

        let choice = Arc::clone(&round.choices[index]);
        let answer = Arc::clone(&round.answer);
        let correct = self.picker.is_correct(&choice, &answer);
        let counted = self.progress.questions_answered < self.options.max_questions;
        if counted {
            self.progress.questions_answered += 1;
            if correct {
                self.progress.correct_answers += 1;
            }
        }

        if correct {
            for slot in &mut self.slots {
                slot.disabled = true;
            }
            self.slots[index].mark = ChoiceMark::Correct;
            self.phase = SessionPhase::AutoAdvancing;
            self.speak(&answer);
            self.arm_auto_advance();
        } else {
            self.slots[index].mark = ChoiceMark::Wrong;
        }

        self.persist();

        let choices = self.choice_views();
        report(self.view.update_choices(&choices), "update_choices");
        let feedback = if correct {
            self.picker
                .example_for(&answer)
                .map(Feedback::Example)
                .unwrap_or(Feedback::Correct)
        } else {
            Feedback::Wrong
        };
        report(self.view.show_feedback(&feedback), "show_feedback");
        self.refresh_stats();

        if let Some(hook) = self.on_answered.as_mut() {
            hook(&AnsweredEvent {
                correct,
                counted,
                choice: &choice,
                answer: &answer,
                progress: self.progress,
            });
        }

        if correct {
            ClickOutcome::Correct { counted }
        } else {
            ClickOutcome::Wrong { counted }
        }
    }

    /// Digits 1-9 activate the choice at that position when it is enabled.
    pub fn press_key(&mut self, key: char) -> ClickOutcome {
        if !self.options.enable_keyboard {
            return ClickOutcome::Ignored(IgnoreReason::KeyboardDisabled);
        }
        let Some(digit) = key
            .to_digit(10)
            .filter(|d| (1..=MAX_KEYBOARD_CHOICE).contains(d))
        else {
            return ClickOutcome::Ignored(IgnoreReason::NotAChoiceKey);
        };
        let index = (digit - 1) as usize;
        match self.slots.get(index) {
            Some(slot) if slot.disabled => ClickOutcome::Ignored(IgnoreReason::Disabled),
            Some(_) => self.click(index),
            None => ClickOutcome::Ignored(IgnoreReason::OutOfRange),
        }
    }

    /// Returns false for tickets from a superseded round.
    pub fn on_advance(&mut self, ticket: AdvanceTicket) -> bool {
        if ticket.generation != self.generation || self.phase != SessionPhase::AutoAdvancing {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Stale auto-advance ticket ignored"
            );
            return false;
        }
        self.pending = None;
        self.pick_question();
        true
    }

    /// Re-renders the live round in the new locale while it is still unanswered.
    ///
    /// `quiz_filter` limits the change to one quiz id. Returns whether the
    /// round was re-rendered.
    pub fn set_phonetic_locale(&mut self, locale: &str, quiz_filter: Option<&str>) -> bool {
        if quiz_filter.is_some_and(|quiz_id| quiz_id != self.options.quiz_id) {
            return false;
        }
        self.locale = locale_or_default(locale);
        let can_rerender = self.phase == SessionPhase::AwaitingAnswer
            && self.pending.is_none()
            && self.round.is_some();
        if can_rerender {
            self.render_round();
        }
        can_rerender
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            current_answer: self.round.as_ref().map(|r| Arc::clone(&r.answer)),
            current_choices: self
                .round
                .as_ref()
                .map(|r| r.choices.clone())
                .unwrap_or_default(),
            questions_answered: self.progress.questions_answered,
            correct_answers: self.progress.correct_answers,
            is_awaiting_answer: self.phase == SessionPhase::AwaitingAnswer,
            auto_advance: self.pending.is_some(),
            max_questions: self.options.max_questions,
        }
    }

    pub fn stats_line(&self) -> StatsLine {
        let Progress {
            questions_answered,
            correct_answers,
        } = self.progress;
        StatsLine {
            questions_answered,
            max_questions: self.options.max_questions,
            correct_answers,
            accuracy: accuracy_percent(correct_answers as u64, questions_answered as u64),
            stars: compute_star_rating(correct_answers, questions_answered),
        }
    }

    pub fn is_capped(&self) -> bool {
        self.progress.questions_answered >= self.options.max_questions
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn quiz_id(&self) -> &str {
        &self.options.quiz_id
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    fn pick_question(&mut self) {
        self.cancel_pending();
        self.generation = self.generation.wrapping_add(1);
        report(self.view.show_feedback(&Feedback::Clear), "show_feedback");

        let previous = self.round.take().map(|r| r.answer);
        let ctx = RoundContext {
            correct_answers: self.progress.correct_answers,
            previous_answer: previous.as_deref(),
        };
        let picked = self
            .picker
            .pick_round(&ctx, &mut self.rng)
            .filter(|round| !round.choices.is_empty());

        let Some(mut round) = picked else {
            self.phase = SessionPhase::NoData;
            self.slots.clear();
            tracing::warn!(quiz_id = %self.options.quiz_id, "No round available");
            report(self.view.show_no_data(NO_DATA_MESSAGE), "show_no_data");
            self.refresh_restart();
            return;
        };

        round.choices.shuffle(&mut self.rng);
        if let Some(hook) = self.on_round_start.as_mut() {
            hook(&round);
        }
        self.slots = vec![ChoiceSlot::default(); round.choices.len()];
        self.round = Some(round);
        self.phase = SessionPhase::AwaitingAnswer;
        self.render_round();
        self.refresh_restart();
    }

    fn render_round(&mut self) {
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let symbol = self.picker.symbol(&round.answer);
        let view = RoundView {
            symbol_aria_label: symbol_aria_label(&symbol),
            symbol,
            choices: self.choice_views(),
        };
        report(self.view.render_round(&view), "render_round");
    }

    fn choice_views(&self) -> Vec<ChoiceView> {
        let Some(round) = self.round.as_ref() else {
            return Vec::new();
        };
        round
            .choices
            .iter()
            .zip(&self.slots)
            .enumerate()
            .map(|(idx, (choice, slot))| ChoiceView {
                position: idx + 1,
                label: self.picker.choice_label(choice, &self.locale),
                aria_label: self.picker.choice_aria_label(choice, &self.locale),
                disabled: slot.disabled,
                mark: slot.mark,
            })
            .collect()
    }

    fn refresh_stats(&mut self) {
        let line = self.stats_line();
        report(self.view.update_stats(&line), "update_stats");
        self.refresh_restart();
    }

    fn refresh_restart(&mut self) {
        let capped = self.is_capped();
        report(self.view.set_restart_visible(capped), "set_restart_visible");
    }

    fn auto_advance_delay(&self) -> Duration {
        let ms = if self.on_answered.is_some() || self.picker.has_examples() {
            self.options.auto_advance_with_example_ms
        } else {
            self.options.auto_advance_ms
        };
        Duration::from_millis(ms)
    }

    fn arm_auto_advance(&mut self) {
        self.cancel_pending();
        let delay = self.auto_advance_delay();
        let ticket = AdvanceTicket {
            generation: self.generation,
        };
        self.pending = Some(self.scheduler.schedule(delay, ticket));
    }

    fn cancel_pending(&mut self) {
        if let Some(mut handle) = self.pending.take() {
            handle.cancel();
        }
    }

    fn speak(&self, answer: &QuizItem) {
        if !self.options.sound_enabled {
            return;
        }
        let Some(speaker) = self.speaker.as_ref() else {
            return;
        };
        let text = answer.thai();
        if text.trim().is_empty() {
            return;
        }
        if let Err(e) = speaker.speak_thai(&text) {
            tracing::debug!(quiz_id = %self.options.quiz_id, error = %e, "Speech failed");
        }
    }

    fn persist(&self) {
        self.store.save_quiz_progress(
            &self.options.quiz_id,
            self.progress.clamped(self.options.max_questions),
        );
    }
}

impl<V: QuizView> Drop for QuizSession<V> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn locale_or_default(locale: &str) -> String {
    let normalized = normalize_locale(locale);
    if normalized.is_empty() {
        DEFAULT_PHONETIC_LOCALE.to_string()
    } else {
        normalized
    }
}

fn symbol_aria_label(symbol: &Symbol) -> String {
    format!("{SYMBOL_LABEL_PREFIX}{} {}", symbol.english, symbol.thai)
        .trim_end()
        .to_string()
}

fn report(result: Result<(), RenderError>, operation: &'static str) {
    if let Err(e) = result {
        tracing::warn!(operation, error = %e, "View update failed");
    }
}
