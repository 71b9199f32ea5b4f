use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use thaiquest::quiz::picker::StandardQuiz;
use thaiquest::quiz::session::{QuizSession, SessionOptions};
use thaiquest::quiz::timer::ManualScheduler;
use thaiquest::quiz::types::QuizItem;
use thaiquest::store::Store;

use super::view::RecordingView;

pub fn item(english: &str, thai: &str, phonetic: &str) -> QuizItem {
    QuizItem::from_value(json!({"english": english, "thai": thai, "phonetic": phonetic}))
}

/// The five-item dataset used by the progressive difficulty checks.
pub fn five_items() -> Vec<QuizItem> {
    vec![
        item("one", "หนึ่ง", "nueng"),
        item("two", "สอง", "song"),
        item("three", "สาม", "saam"),
        item("four", "สี่", "sii"),
        item("five", "ห้า", "haa"),
    ]
}

pub fn colors() -> Vec<QuizItem> {
    [
        ("red", "สีแดง", "daeng", "แดง"),
        ("green", "สีเขียว", "khiao", "เขียว"),
        ("blue", "สีน้ำเงิน", "nam-ngoen", "น้ำเงิน"),
        ("black", "สีดำ", "dam", "ดำ"),
    ]
    .iter()
    .map(|(english, thai, en, th)| {
        QuizItem::from_value(json!({
            "english": english,
            "thai": thai,
            "phonetics": {"en": en, "th": th},
        }))
    })
    .collect()
}

pub fn temp_store() -> (TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.sled");
    let store = Store::open(path.to_str().expect("utf-8 path")).expect("open sled store");
    (dir, Arc::new(store))
}

pub fn write_json(root: &Path, relative: &str, value: &Value) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create data dir");
    }
    std::fs::write(&path, serde_json::to_vec(value).expect("encode json")).expect("write json");
}

pub fn session_for(
    quiz: StandardQuiz,
    store: Arc<Store>,
    options: SessionOptions,
) -> (QuizSession<RecordingView>, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let session = QuizSession::new(
        Box::new(quiz),
        store,
        RecordingView::default(),
        Box::new(scheduler.clone()),
        options,
    )
    .expect("session")
    .with_rng_seed(7);
    (session, scheduler)
}

pub fn correct_index(session: &QuizSession<RecordingView>) -> usize {
    session
        .current_round()
        .and_then(|round| round.answer_position())
        .expect("live round")
}

pub fn wrong_indices(session: &QuizSession<RecordingView>) -> Vec<usize> {
    let correct = correct_index(session);
    let len = session.current_round().map_or(0, |r| r.choices.len());
    (0..len).filter(|idx| *idx != correct).collect()
}
