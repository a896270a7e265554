//! Error types for the replay uploader
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains so that the
//! exception reporter can log the full failure detail.

use std::path::PathBuf;
use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for the replay uploader
#[derive(Debug, Error)]
pub enum UploaderError {
    /// Settings could not be loaded, parsed or saved
    #[error("Settings error: {0}")]
    SettingsError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Copying the settings store to the backup location failed
    #[error("Failed to back up settings to {path}: {source}")]
    BackupFailed {
        /// Destination of the backup copy
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Restoring the settings backup failed
    #[error("Failed to restore settings: {0}")]
    RestoreFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The update transport client could not be constructed or queried
    #[error("Update transport error: {0}")]
    UpdateTransportError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The repository locator could not be understood
    #[error("Invalid update repository locator: {0}")]
    InvalidRepositoryLocator(String),

    /// Registering or removing the run-at-login entry failed
    #[error("Login startup registration error: {0}")]
    LoginStartupError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The UI shell failed to show a window or create the tray affordance
    #[error("Presentation error: {0}")]
    PresentationError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A shared collection was mutated from a foreign thread before it was
    /// registered for cross-thread access
    #[error("Collection '{0}' mutated from another thread before synchronization was enabled")]
    CollectionNotSynchronized(String),

    /// The log file or the global subscriber could not be set up
    #[error("Logging initialization error: {0}")]
    LoggingError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for uploader operations
pub type Result<T> = std::result::Result<T, UploaderError>;

/// Convert an error to a user-friendly message
///
/// Used for the body of the modal notice shown by the exception reporter and
/// by the binary when startup fails.
pub fn get_user_friendly_error(error: &UploaderError) -> String {
    match error {
        UploaderError::SettingsError(_) | UploaderError::JsonError(_) => {
            "Failed to load or save settings.\n\n\
             Your settings may not persist.\n\
             Check that you have write permissions to:\n\
             %APPDATA%\\ReplayUploader"
                .to_string()
        }
        UploaderError::BackupFailed { path, .. } => {
            format!(
                "Failed to back up your settings to:\n{}\n\n\
                 Your settings may be lost when the application updates.",
                path.display()
            )
        }
        UploaderError::RestoreFailed(_) => "Failed to restore settings from the previous version.\n\n\
             Default settings will be used."
            .to_string(),
        UploaderError::UpdateTransportError(_) | UploaderError::InvalidRepositoryLocator(_) => {
            "Unable to check for updates.\n\n\
             The application will try again later."
                .to_string()
        }
        UploaderError::LoginStartupError(e) => {
            format!(
                "Unable to change the start-with-Windows setting:\n\n{e}\n\n\
                 Please check your account permissions."
            )
        }
        UploaderError::PresentationError(e) => {
            format!("Unable to display the application window:\n\n{e}")
        }
        UploaderError::CollectionNotSynchronized(name) => {
            format!("Internal error: the '{name}' list was modified unsafely.")
        }
        UploaderError::LoggingError(e) => {
            format!(
                "Unable to write the application log:\n\n{e}\n\n\
                 Check that you have write permissions to:\n\
                 %APPDATA%\\ReplayUploader"
            )
        }
        UploaderError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
    }
}
