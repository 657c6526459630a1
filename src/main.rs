mod cli;
mod state;
mod tui;
mod ui;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};

use ieltsroom::client::{ExamBackend, HttpBackend};
use ieltsroom::config::Config;
use ieltsroom::error::AppError;
use ieltsroom::normalize::{normalize, ExamSource};
use ieltsroom::persist::{self, DraftCache};
use ieltsroom::room::{ExamRoom, RoomSettings};
use ieltsroom::runtime::Dispatcher;

use crate::cli::Cli;
use crate::state::AppState;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(url) = cli.api_url.clone() {
        config.api_url = url;
    }
    if let Some(token) = cli.token.clone() {
        config.token = Some(token);
    }
    if let Some(dir) = cli.log_dir.clone() {
        config.log_dir = Some(dir);
    }

    let log_dir = config
        .log_dir
        .clone()
        .unwrap_or_else(persist::default_log_dir);
    let _guard = ieltsroom::logging::init(&log_dir, &config.log_filter)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Config(format!("cannot start async runtime: {}", e)))?;

    let backend = Arc::new(HttpBackend::new(&config)?);

    // Resolve source
    let source = match (cli.task_id, cli.mock) {
        (_, Some(mock_id)) => runtime
            .block_on(backend.fetch_mock(mock_id))
            .map(ExamSource::Mock)?,
        (Some(task_id), None) => runtime
            .block_on(backend.fetch_task_bundle(task_id))
            .map(ExamSource::Task)?,
        (None, None) => {
            return Err(AppError::Config(
                "a TASK_ID or --mock is required".to_string(),
            ))
        }
    };
    let data = normalize(&source)?;
    info!(title = %data.meta.title, questions = data.total_questions, "exam loaded");

    let cache = DraftCache::new(persist::default_draft_dir(), &data);

    // Handle --clear
    if cli.clear {
        cache.clear()?;
        eprintln!("Local draft cleared.");
    }

    let draft = match cache.load() {
        Ok(draft) => draft,
        Err(e) => {
            warn!(error = %e, "ignoring local draft");
            eprintln!("Warning: {}", e);
            None
        }
    };

    // Handle --status
    if cli.status {
        persist::print_status(&data, draft.as_ref());
        return Ok(());
    }

    // Handle --export
    if let Some(ref export_path) = cli.export {
        match &draft {
            Some(d) => {
                persist::export_answers(d, export_path)?;
                eprintln!("Answers exported to {}", export_path.display());
            }
            None => eprintln!("No local draft to export."),
        }
        return Ok(());
    }

    let settings = RoomSettings {
        practice: cli.practice,
        autosave_debounce: config.autosave_debounce,
        audio_countdown_secs: config.audio_countdown_secs,
        poll_every_secs: config.poll_every_secs,
    };
    let mut room = ExamRoom::new(data, settings);
    if let Some(d) = &draft {
        room.restore_local(&d.answers, Instant::now());
    }

    let (mut dispatcher, events) = Dispatcher::new(backend, runtime.handle().clone());
    dispatcher.start_ticker();
    dispatcher.dispatch_all(room.mount(chrono::Utc::now()));

    let state = AppState::new(room, config.grace_window, config.essay_debounce);
    let result = tui::run_tui(state, dispatcher, events, cache);

    // In-flight requests are not cancelled, but nobody listens any more.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}
