use std::sync::Arc;

use thaiquest::config::Config;
use thaiquest::constants::LOAD_FAILED_MESSAGE;
use thaiquest::engine::{combined_quiz_id, EngineConfig, QuizEngine};
use thaiquest::logging::{init_tracing, LogConfig};
use thaiquest::quiz::loader::DatasetLoader;
use thaiquest::quiz::timer::TokioScheduler;
use thaiquest::services::speech::{CommandSpeaker, Speaker};
use thaiquest::store::Store;
use thaiquest::terminal::{self, TerminalView};

const USAGE: &str = "usage: thaiquest <quizId>[,<quizId>...]";

fn quiz_ids_from_args() -> Vec<String> {
    std::env::args()
        .skip(1)
        .flat_map(|arg| {
            arg.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: config.enable_file_logs,
        log_dir: config.log_dir.clone(),
    });
    tracing::info!("Starting thaiquest");

    let store = Arc::new(Store::open_or_memory(&config.sled_path));
    let loader = Arc::new(DatasetLoader::new(
        config.asset_root.clone(),
        config.fetch_timeout_secs,
    ));
    let engine = QuizEngine::new(
        Arc::clone(&store),
        loader,
        EngineConfig::from_env_config(&config.quiz, &config.speech),
    );

    let mut quiz_ids = quiz_ids_from_args();
    if quiz_ids.is_empty() {
        // resume the most recent quiz
        match engine.latest_attempt() {
            Some(latest) => {
                tracing::info!(quiz_id = %latest.quiz_id, "Resuming latest quiz");
                quiz_ids = latest.quiz_id.split('+').map(str::to_string).collect();
            }
            None => {
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        }
    }

    let recipes = engine.recipes(&quiz_ids).await;
    let picker = match engine.quiz(&recipes).await {
        Ok(picker) => picker,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load quiz");
            eprintln!("{LOAD_FAILED_MESSAGE}");
            std::process::exit(1);
        }
    };

    let (scheduler, mut advances) = TokioScheduler::new();
    let speaker = CommandSpeaker::new(&config.speech);
    let speaker: Option<Arc<dyn Speaker>> = if speaker.is_enabled() {
        Some(Arc::new(speaker))
    } else {
        None
    };

    let quiz_id = combined_quiz_id(&recipes);
    let mut session = match engine.session(
        &quiz_id,
        picker,
        TerminalView::new(std::io::stdout()),
        Box::new(scheduler),
        speaker,
    ) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start quiz session");
            std::process::exit(1);
        }
    };

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        _ = terminal::run(&mut session, &engine, &mut advances, input) => {},
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }
    drop(session);

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
}
