use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppError;

/// Installs the global subscriber. The terminal belongs to the exam room, so
/// logs only go to a daily rolling file. Keep the guard alive until exit.
pub fn init(dir: &Path, filter: &str) -> Result<WorkerGuard, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::Config(format!("cannot create log dir {}: {}", dir.display(), e)))?;

    let file_appender = tracing_appender::rolling::daily(dir, "ieltsroom.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_new(filter)
        .map_err(|e| AppError::Config(format!("invalid log filter {:?}: {}", filter, e)))?;
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialised: {}", e)))?;
    Ok(guard)
}
