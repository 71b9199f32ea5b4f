mod common;

use std::sync::Arc;

use common::fixtures::{five_items, write_json};
use serde_json::json;
use thaiquest::engine::{EngineConfig, QuizEngine, QuizRecipe};
use thaiquest::quiz::loader::DatasetLoader;
use thaiquest::quiz::picker::StandardQuiz;
use thaiquest::quiz::timer::TokioScheduler;
use thaiquest::store::operations::progress::Progress;
use thaiquest::store::Store;
use thaiquest::terminal::{self, TerminalView};

fn engine(store: Arc<Store>) -> QuizEngine {
    QuizEngine::new(store, Arc::new(DatasetLoader::new(".", 1)), EngineConfig::default())
}

#[tokio::test]
async fn scripted_input_drives_a_session() {
    let store = Arc::new(Store::in_memory());
    let engine = engine(Arc::clone(&store));
    let (scheduler, mut advances) = TokioScheduler::new();
    let mut session = engine
        .session(
            "numbers",
            Box::new(StandardQuiz::new(five_items())),
            TerminalView::new(Vec::new()),
            Box::new(scheduler),
            None,
        )
        .unwrap();

    let input: &[u8] = b"\nhelp\n1\n2\n3\n4\np\nl th\nq\n1\n";
    terminal::run(&mut session, &engine, &mut advances, input).await;

    let progress = session.progress();
    assert!(progress.questions_answered >= 1);
    assert_eq!(progress.correct_answers, 1);
    assert_eq!(store.get_quiz_progress("numbers"), progress);
    assert_eq!(store.preferred_phonetic_locale(), "th");

    let out = String::from_utf8(session.view().writer().clone()).unwrap();
    assert!(out.contains("1-9 choose"));
    assert!(out.contains("Correct!"));
    assert!(out.contains("Level 1"));
    assert!(out.contains("Questions: "));
}

#[tokio::test]
async fn restart_command_clears_progress() {
    let store = Arc::new(Store::in_memory());
    store.save_quiz_progress("numbers", Progress::new(100, 96));
    let engine = engine(Arc::clone(&store));
    let (scheduler, mut advances) = TokioScheduler::new();
    let mut session = engine
        .session(
            "numbers",
            Box::new(StandardQuiz::new(five_items())),
            TerminalView::new(Vec::new()),
            Box::new(scheduler),
            None,
        )
        .unwrap();

    terminal::run(&mut session, &engine, &mut advances, &b"r\n"[..]).await;
    assert_eq!(store.get_quiz_progress("numbers"), Progress::ZERO);
    let out = String::from_utf8(session.view().writer().clone()).unwrap();
    assert!(out.contains("All questions answered. Press r to restart."));
    assert!(out.contains("Questions: 0/100 | Correct: 0 | Accuracy: 0% | ☆☆☆"));
}

#[tokio::test]
async fn standard_quiz_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "data/finals.json",
        &json!([
            {"symbol": "ก", "final": "k", "english": "ko kai"},
            {"symbol": "ง", "final": "ng", "english": "ngo ngu"},
            {"symbol": "น", "final": "n", "english": "no nu"}
        ]),
    );
    let engine = QuizEngine::new(
        Arc::new(Store::in_memory()),
        Arc::new(DatasetLoader::new(dir.path(), 5)),
        EngineConfig::default(),
    );
    let quiz = engine
        .standard_quiz(&QuizRecipe::new("finals").with_answer_key("final"))
        .await
        .unwrap();
    assert_eq!(quiz.data().len(), 3);
    assert_eq!(quiz.resolver().equality_key(&quiz.data()[1]).as_deref(), Some("ng"));
    assert!(engine.standard_quiz(&QuizRecipe::new("absent")).await.is_err());
}
