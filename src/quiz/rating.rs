//! Star ratings per quiz and the level/XP meta-game built on top of them.

use serde::{Deserialize, Serialize};

use crate::constants::{COMPLETION_CORRECT_THRESHOLD, XP_CURVE_A, XP_CURVE_P};
use crate::store::operations::progress::ProgressEntry;

pub const MAX_STARS: u8 = 3;

/// 0..=3 stars. Nothing below the completion threshold, then by accuracy.
pub fn compute_star_rating(correct_answers: u32, questions_answered: u32) -> u8 {
    if correct_answers < COMPLETION_CORRECT_THRESHOLD {
        return 0;
    }
    let accuracy = accuracy_ratio(correct_answers as u64, questions_answered as u64) * 100.0;
    if accuracy > 95.0 {
        3
    } else if accuracy > 85.0 {
        2
    } else if accuracy > 75.0 {
        1
    } else {
        0
    }
}

/// Rounded percentage; 0 when nothing was answered.
pub fn accuracy_percent(correct: u64, answered: u64) -> u32 {
    (accuracy_ratio(correct, answered) * 100.0).round() as u32
}

fn accuracy_ratio(correct: u64, answered: u64) -> f64 {
    if answered == 0 {
        return 0.0;
    }
    correct as f64 / answered as f64
}

pub fn xp_for_stars(stars: u8) -> u32 {
    match stars.min(MAX_STARS) {
        3 => 40,
        2 => 20,
        1 => 10,
        _ => 0,
    }
}

pub fn format_stars(stars: u8) -> String {
    let filled = stars.min(MAX_STARS) as usize;
    format!(
        "{}{}",
        "★".repeat(filled),
        "☆".repeat(MAX_STARS as usize - filled)
    )
}

pub fn star_rules_tooltip() -> &'static str {
    "Star rules: 3★ = 100 right with >95% accuracy; 2★ = 100 right with >85% accuracy; 1★ = 100 right with >75% accuracy; 0★ otherwise."
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingModel {
    /// `A` in `A * L^p`
    pub xp_curve_a: f64,
    /// `p` in `A * L^p`
    pub xp_curve_p: f64,
}

impl Default for RatingModel {
    fn default() -> Self {
        Self {
            xp_curve_a: XP_CURVE_A,
            xp_curve_p: XP_CURVE_P,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_questions_answered: u64,
    pub total_correct_answers: u64,
    pub total_accuracy: u32,
    pub quizzes_completed: u32,
    pub total_stars_earned: u32,
    pub total_xp_from_stars: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// Displayed level, starting at 1
    pub level: u32,
    pub xp: u32,
    pub max_xp: u32,
    pub progress_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCard {
    pub display_name: String,
    pub level: u32,
    pub xp: u32,
    pub max_xp: u32,
    pub progress_percent: u32,
    pub accuracy: u32,
    pub quizzes_completed: u32,
    pub total_stars: u32,
}

impl RatingModel {
    pub fn xp_total_for_level(&self, level_index: u32) -> f64 {
        self.xp_curve_a * (level_index as f64).powf(self.xp_curve_p)
    }

    pub fn xp_delta_for_level(&self, level_index: u32) -> f64 {
        self.xp_total_for_level(level_index + 1) - self.xp_total_for_level(level_index)
    }

    pub fn level_index_from_total_xp(&self, total_xp: f64) -> u32 {
        let xp = if total_xp.is_finite() { total_xp.max(0.0) } else { 0.0 };
        let mut index = (xp / self.xp_curve_a).powf(1.0 / self.xp_curve_p).floor() as u32;
        // powf can land a hair under an exact level boundary
        if self.xp_total_for_level(index + 1) <= xp {
            index += 1;
        }
        index
    }

    pub fn level_progress(&self, total_xp: u32) -> LevelProgress {
        let total = total_xp as f64;
        let index = self.level_index_from_total_xp(total);
        let xp = (total - self.xp_total_for_level(index)).round().max(0.0) as u32;
        let max_xp = (self.xp_delta_for_level(index).round() as u32).max(1);
        let progress_percent = ((100.0 * xp as f64 / max_xp as f64).round() as u32).min(100);
        LevelProgress {
            level: index + 1,
            xp,
            max_xp,
            progress_percent,
        }
    }

    pub fn aggregate(&self, entries: &[ProgressEntry]) -> AggregateStats {
        let mut stats = AggregateStats::default();
        for entry in entries {
            stats.total_questions_answered += entry.questions_answered as u64;
            stats.total_correct_answers += entry.correct_answers as u64;
            if entry.correct_answers >= COMPLETION_CORRECT_THRESHOLD {
                stats.quizzes_completed += 1;
            }
            let stars = compute_star_rating(entry.correct_answers, entry.questions_answered);
            stats.total_stars_earned += stars as u32;
            stats.total_xp_from_stars += xp_for_stars(stars);
        }
        stats.total_accuracy =
            accuracy_percent(stats.total_correct_answers, stats.total_questions_answered);
        stats
    }

    pub fn player_card(&self, display_name: String, entries: &[ProgressEntry]) -> PlayerCard {
        let stats = self.aggregate(entries);
        let level = self.level_progress(stats.total_xp_from_stars);
        PlayerCard {
            display_name,
            level: level.level,
            xp: level.xp,
            max_xp: level.max_xp,
            progress_percent: level.progress_percent,
            accuracy: stats.total_accuracy,
            quizzes_completed: stats.quizzes_completed,
            total_stars: stats.total_stars_earned,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn entry(quiz_id: &str, answered: u32, correct: u32) -> ProgressEntry {
        ProgressEntry {
            quiz_id: quiz_id.to_string(),
            questions_answered: answered,
            correct_answers: correct,
        }
    }

    #[test]
    fn star_rating_boundaries() {
        assert_eq!(compute_star_rating(99, 99), 0);
        assert_eq!(compute_star_rating(100, 100), 3);
        assert_eq!(compute_star_rating(100, 105), 3);
        assert_eq!(compute_star_rating(100, 106), 2);
        assert_eq!(compute_star_rating(100, 117), 2);
        assert_eq!(compute_star_rating(100, 118), 1);
        assert_eq!(compute_star_rating(100, 133), 1);
        assert_eq!(compute_star_rating(100, 134), 0);
        assert_eq!(compute_star_rating(100, 0), 0);
    }

    #[test]
    fn xp_per_star_and_formatting() {
        assert_eq!([0, 1, 2, 3, 9].map(xp_for_stars), [0, 10, 20, 40, 40]);
        assert_eq!(format_stars(2), "★★☆");
        assert_eq!(format_stars(0), "☆☆☆");
        assert_eq!(format_stars(7), "★★★");
        assert!(star_rules_tooltip().starts_with("Star rules:"));
    }

    #[test]
    fn level_progress_from_fresh_player() {
        let model = RatingModel::default();
        let level = model.level_progress(0);
        assert_eq!(level.level, 1);
        assert_eq!(level.xp, 0);
        assert_eq!(level.max_xp, 80);
        assert_eq!(level.progress_percent, 0);

        let level = model.level_progress(40);
        assert_eq!(level.level, 1);
        assert_eq!(level.xp, 40);
        assert_eq!(level.progress_percent, 50);
    }

    #[test]
    fn exact_level_boundary_advances() {
        let model = RatingModel::default();
        let level = model.level_progress(80);
        assert_eq!(level.level, 2);
        assert_eq!(level.xp, 0);
    }

    #[test]
    fn aggregate_sums_in_one_pass() {
        let model = RatingModel::default();
        let entries = vec![
            entry("colors", 100, 100),
            entry("numbers", 120, 100),
            entry("animals", 10, 5),
        ];
        let stats = model.aggregate(&entries);
        assert_eq!(stats.total_questions_answered, 230);
        assert_eq!(stats.total_correct_answers, 205);
        assert_eq!(stats.total_accuracy, 89);
        assert_eq!(stats.quizzes_completed, 2);
        assert_eq!(stats.total_stars_earned, 4);
        assert_eq!(stats.total_xp_from_stars, 50);

        let card = model.player_card("Player_ABCD".into(), &entries);
        assert_eq!(card.level, 1);
        assert_eq!(card.xp, 50);
        assert_eq!(card.total_stars, 4);
    }

    #[test]
    fn empty_aggregate_is_zero() {
        let stats = RatingModel::default().aggregate(&[]);
        assert_eq!(stats, AggregateStats::default());
    }

    proptest! {
        #[test]
        fn stars_zero_below_threshold(correct in 0u32..100, extra in 0u32..500) {
            prop_assert_eq!(compute_star_rating(correct, correct + extra), 0);
        }

        #[test]
        fn xp_total_strictly_increasing(level in 0u32..500) {
            let model = RatingModel::default();
            prop_assert!(model.xp_total_for_level(level + 1) > model.xp_total_for_level(level));
        }

        #[test]
        fn level_non_decreasing_as_stars_grow(xp in 0u32..100_000, added in prop::sample::select(vec![0u32, 10, 20, 40])) {
            let model = RatingModel::default();
            prop_assert!(model.level_progress(xp + added).level >= model.level_progress(xp).level);
        }

        #[test]
        fn progress_percent_is_bounded(xp in 0u32..1_000_000) {
            let level = RatingModel::default().level_progress(xp);
            prop_assert!(level.progress_percent <= 100);
            prop_assert!(level.max_xp >= 1);
        }
    }
}
