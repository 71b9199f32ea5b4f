mod common;

use std::sync::Arc;

use proptest::prelude::*;

use common::fixtures::{five_items, session_for};
use thaiquest::quiz::picker::StandardQuiz;
use thaiquest::quiz::rating::{compute_star_rating, RatingModel};
use thaiquest::quiz::selector::pick_unique_choices;
use thaiquest::quiz::session::SessionOptions;
use thaiquest::quiz::types::{QuizItem, SharedItem};
use thaiquest::store::operations::progress::{Progress, ProgressEntry};
use thaiquest::store::Store;

#[derive(Debug, Clone)]
enum Action {
    Click(usize),
    Key(u32),
    Advance,
    Next,
    Restart,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => (0_usize..8).prop_map(Action::Click),
        2 => (0_u32..10).prop_map(Action::Key),
        2 => Just(Action::Advance),
        1 => Just(Action::Next),
        1 => Just(Action::Restart),
    ]
}

proptest! {
    #[test]
    fn pt_counters_stay_within_cap(
        cap in 1_u32..12,
        seeded in (0_u32..20, 0_u32..20),
        actions in prop::collection::vec(action(), 0..60),
    ) {
        let store = Arc::new(Store::in_memory());
        store.save_quiz_progress("numbers", Progress::new(seeded.0, seeded.1));
        let (mut session, scheduler) = session_for(
            StandardQuiz::new(five_items()),
            Arc::clone(&store),
            SessionOptions::new("numbers").with_max_questions(cap),
        );
        session.start();

        for action in actions {
            let before = session.progress();
            match &action {
                Action::Click(idx) => { session.click(*idx); }
                Action::Key(digit) => {
                    if let Some(key) = char::from_digit(*digit, 10) {
                        session.press_key(key);
                    }
                }
                Action::Advance => {
                    for ticket in scheduler.pending() {
                        session.on_advance(ticket);
                    }
                }
                Action::Next => session.next(),
                Action::Restart => session.restart(),
            }
            let after = session.progress();
            prop_assert!(after.correct_answers <= after.questions_answered);
            prop_assert!(after.questions_answered <= cap);
            if before.questions_answered == cap && !matches!(action, Action::Restart) {
                prop_assert_eq!(after, before);
            }
            prop_assert_eq!(store.get_quiz_progress("numbers").clamped(cap), after);
        }
    }

    #[test]
    fn pt_unique_choices_never_repeat_a_key(
        keys in prop::collection::vec(0_u8..6, 1..20),
        count in 1_usize..10,
        seed in any::<u64>(),
    ) {
        let pool: Vec<SharedItem> = keys
            .iter()
            .map(|k| Arc::new(QuizItem::from_value(serde_json::json!({"phonetic": format!("k{k}")}))))
            .collect();
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(seed);
        let seed_item = Arc::clone(&pool[0]);
        let picked = pick_unique_choices(&pool, count, |i| i.text("phonetic"), Some(&seed_item), &mut rng);

        let mut seen = std::collections::HashSet::new();
        for item in &picked {
            prop_assert!(seen.insert(item.text("phonetic")));
        }
        prop_assert!(picked.len() <= count);
        prop_assert_eq!(picked.iter().filter(|i| Arc::ptr_eq(i, &seed_item)).count(), 1);
        let distinct: std::collections::HashSet<_> = keys.iter().collect();
        prop_assert_eq!(picked.len(), count.min(distinct.len()));
    }

    #[test]
    fn pt_level_never_drops_as_quizzes_complete(
        results in prop::collection::vec((100_u32..140, 0_u32..40), 0..12),
    ) {
        let model = RatingModel::default();
        let mut entries: Vec<ProgressEntry> = Vec::new();
        let mut last_level = model.player_card("p".into(), &entries).level;
        for (idx, (answered, wrong)) in results.into_iter().enumerate() {
            let correct = answered.saturating_sub(wrong).max(100).min(answered);
            entries.push(ProgressEntry {
                quiz_id: format!("q{idx}"),
                questions_answered: answered,
                correct_answers: correct,
            });
            let card = model.player_card("p".into(), &entries);
            prop_assert!(card.level >= last_level);
            prop_assert!(card.total_stars as usize <= entries.len() * 3);
            last_level = card.level;
        }
    }

    #[test]
    fn pt_stars_need_one_hundred_correct(correct in 0_u32..100, extra in 0_u32..500) {
        prop_assert_eq!(compute_star_rating(correct, correct + extra), 0);
    }
}
