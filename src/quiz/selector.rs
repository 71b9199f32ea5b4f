//! Round drawing: answer choice with an anti-repeat rule, then unique distractors.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::answer::AnswerResolver;
use super::progressive::{choices_count, ProgressiveDifficulty};
use super::types::{QuizItem, Round, RoundContext, SharedItem};
use crate::constants::DEFAULT_BASE_CHOICES;

/// Seed first, then random pool items with keys not seen yet, up to `count`.
///
/// Items whose key is `None` are skipped. The pool is visited in a random
/// order exactly once, so a pool with fewer distinct keys than `count`
/// simply yields fewer choices.
pub fn pick_unique_choices<R, F>(
    pool: &[SharedItem],
    count: usize,
    key_fn: F,
    seed: Option<&SharedItem>,
    rng: &mut R,
) -> Vec<SharedItem>
where
    R: Rng + ?Sized,
    F: Fn(&QuizItem) -> Option<String>,
{
    let mut choices: Vec<SharedItem> = Vec::with_capacity(count);
    let mut used: HashSet<String> = HashSet::new();

    if let Some(seed) = seed {
        choices.push(Arc::clone(seed));
        if let Some(key) = key_fn(seed) {
            used.insert(key);
        }
    }

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.shuffle(rng);

    for idx in order {
        if choices.len() >= count {
            break;
        }
        let candidate = &pool[idx];
        if seed.is_some_and(|s| Arc::ptr_eq(s, candidate)) {
            continue;
        }
        let Some(key) = key_fn(candidate) else {
            continue;
        };
        if used.insert(key) {
            choices.push(Arc::clone(candidate));
        }
    }

    choices
}

#[derive(Debug, Clone)]
pub struct RoundSelector {
    pub resolver: AnswerResolver,
    pub base_choices: usize,
    pub progressive: Option<ProgressiveDifficulty>,
}

impl Default for RoundSelector {
    fn default() -> Self {
        Self {
            resolver: AnswerResolver::default(),
            base_choices: DEFAULT_BASE_CHOICES,
            progressive: Some(ProgressiveDifficulty::default()),
        }
    }
}

impl RoundSelector {
    pub fn new(resolver: AnswerResolver) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }

    pub fn with_base_choices(mut self, base_choices: usize) -> Self {
        self.base_choices = base_choices;
        self
    }

    pub fn with_progressive(mut self, progressive: Option<ProgressiveDifficulty>) -> Self {
        self.progressive = progressive;
        self
    }

    pub fn target_choices(&self, correct_answers: u32) -> usize {
        choices_count(correct_answers, self.progressive.as_ref(), self.base_choices)
    }

    /// Keyed items except those sharing the previous answer's key.
    ///
    /// Keyless items are only drawn when nothing in the pool has a key, and
    /// the previous-answer rule is dropped when it would leave nothing.
    pub fn candidate_pool(
        &self,
        pool: &[SharedItem],
        previous: Option<&QuizItem>,
    ) -> Vec<SharedItem> {
        let keyed: Vec<SharedItem> = pool
            .iter()
            .filter(|item| self.resolver.equality_key(item).is_some())
            .cloned()
            .collect();
        let base = if keyed.is_empty() { pool.to_vec() } else { keyed };

        let previous_key = previous.and_then(|p| self.resolver.equality_key(p));
        match previous_key {
            Some(prev) if base.len() > 1 => {
                let filtered: Vec<SharedItem> = base
                    .iter()
                    .filter(|item| self.resolver.equality_key(item).as_deref() != Some(prev.as_str()))
                    .cloned()
                    .collect();
                if filtered.is_empty() {
                    base
                } else {
                    filtered
                }
            }
            _ => base,
        }
    }

    pub fn pick_round<R: Rng + ?Sized>(
        &self,
        ctx: &RoundContext<'_>,
        pool: &[SharedItem],
        rng: &mut R,
    ) -> Option<Round> {
        if pool.is_empty() {
            return None;
        }
        let target = self.target_choices(ctx.correct_answers);
        let candidates = self.candidate_pool(pool, ctx.previous_answer);
        let answer = candidates.choose(rng)?.clone();
        let choices = pick_unique_choices(
            pool,
            target,
            |item| self.resolver.equality_key(item),
            Some(&answer),
            rng,
        );
        Some(Round { answer, choices })
    }
}
