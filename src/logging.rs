use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use std::path::Path;
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "tasktrack";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unsupported log level '{0}' (expected one of: off, error, warn, info, debug, trace)")]
    InvalidLevel(String),
    #[error("Failed to create log directory: {0}")]
    DirectoryError(String),
    #[error("Failed to start logger: {0}")]
    StartError(#[from] flexi_logger::FlexiLoggerError),
}

/// Lower-case `level` and check it names a log level
pub fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "error" => Ok("error"),
        "warn" | "warning" => Ok("warn"),
        "info" => Ok("info"),
        "debug" => Ok("debug"),
        "trace" => Ok("trace"),
        _ => Err(LoggingError::InvalidLevel(level.to_string())),
    }
}

/// Start rotating file logging under `log_dir`.
///
/// The terminal belongs to the TUI, so nothing is written to stderr. Logging
/// stops when the returned handle is dropped; keep it alive for the whole run.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<LoggerHandle, LoggingError> {
    let level = normalize_level(level)?;

    std::fs::create_dir_all(log_dir)
        .map_err(|e| LoggingError::DirectoryError(format!("{}: {}", log_dir.display(), e)))?;

    let handle = Logger::try_with_str(level)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    info!(
        "event=app_start status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        level,
        log_dir.display()
    );

    Ok(handle)
}
