//! Logging system initialization
//!
//! Sets up tracing-based logging with file output to
//! `%APPDATA%\ReplayUploader\app.log`. Each launch rotates the previous
//! session's log, keeping the last ten sessions.

use crate::config::SettingsStore;
use crate::error::{Result, StringError, UploaderError};
use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of historical log files to keep (app.log.1 through app.log.9)
const MAX_LOG_FILES: u8 = 9;

const LOG_FILE_PREFIX: &str = "app";
const LOG_FILE_SUFFIX: &str = "log";

/// Initialize the logging system in the application data directory
///
/// Log level defaults to INFO but can be configured via the `RUST_LOG`
/// environment variable.
pub fn init_logging() -> Result<()> {
    init_logging_in(&SettingsStore::app_data_dir())
}

/// Initialize the logging system writing to `<log_dir>/app.log`
pub fn init_logging_in(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)?;

    let log_path = log_dir.join(format!("{LOG_FILE_PREFIX}.{LOG_FILE_SUFFIX}"));
    let rotated = rotate_logs_on_startup(&log_path)?;

    // Rotation is handled above, once per launch
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)
        .map_err(|e| UploaderError::LoggingError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| UploaderError::LoggingError(Box::new(e)))?;

    if rotated {
        tracing::debug!("Previous session log rotated to {}.1", log_path.display());
    }
    Ok(())
}

/// Shift `app.log` → `app.log.1` → … → `app.log.9`, dropping the oldest.
///
/// Returns whether there was a log to rotate. A fresh `app.log` is created
/// by the appender afterwards.
fn rotate_logs_on_startup(log_path: &Path) -> Result<bool> {
    if !log_path.exists() {
        return Ok(false);
    }

    let log_dir = log_path
        .parent()
        .ok_or_else(|| UploaderError::LoggingError(StringError::new("Invalid log path")))?;
    let log_name = log_path
        .file_name()
        .ok_or_else(|| UploaderError::LoggingError(StringError::new("Invalid log filename")))?
        .to_string_lossy();

    let oldest_log = log_dir.join(format!("{log_name}.{MAX_LOG_FILES}"));
    if oldest_log.exists() {
        fs::remove_file(&oldest_log)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let current_log = log_dir.join(format!("{log_name}.{i}"));
        if current_log.exists() {
            fs::rename(&current_log, log_dir.join(format!("{log_name}.{}", i + 1)))?;
        }
    }

    fs::rename(log_path, log_dir.join(format!("{log_name}.1")))?;
    Ok(true)
}
