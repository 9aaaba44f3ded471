use anyhow::{anyhow, Result};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

/// Log files bigger than this are started over.
const MAX_LOG_FILE_SIZE: u64 = 8 * 1024 * 1024;

fn max_level(configured: &str, quiet: bool) -> tracing::Level {
    if quiet {
        return tracing::Level::ERROR;
    }
    configured.parse().unwrap_or(tracing::Level::INFO)
}

/// Installs the global subscriber, writing to `log_file` or to stderr.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init(log_file: Option<PathBuf>, configured_level: &str, quiet: bool) -> Result<Option<WorkerGuard>> {
    let max_level = max_level(configured_level, quiet);

    let Some(log_path) = log_file else {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(max_level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(None);
    };

    if let Ok(metadata) = std::fs::metadata(&log_path) {
        if log_path.is_file() && metadata.len() > MAX_LOG_FILE_SIZE {
            std::fs::remove_file(&log_path)?;
        }
    }

    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {log_path:?}"))?;

    let directory = log_path
        .parent()
        .ok_or_else(|| anyhow!("{log_path:?} has no parent"))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Some(guard))
}
