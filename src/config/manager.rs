//! Settings store for loading and saving the persisted settings record
//!
//! Settings live in %APPDATA%\ReplayUploader\user.config as JSON and are written
//! atomically (temporary file in the same directory, then rename) so a crash
//! mid-save never leaves a truncated store behind.

use crate::config::models::AppSettings;
use crate::error::{StringError, UploaderError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name under %APPDATA% holding settings and logs
pub const APP_DIR_NAME: &str = "ReplayUploader";

/// File name of the primary settings store
pub const SETTINGS_FILE_NAME: &str = "user.config";

/// Primary settings store bound to a file path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    current_version: String,
}

impl SettingsStore {
    /// Create a store at `path` for the running application version
    pub fn new(path: impl Into<PathBuf>, current_version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            current_version: current_version.into(),
        }
    }

    /// Store at the per-user roaming location for the running version
    pub fn at_default_location() -> Self {
        Self::new(
            Self::default_path(),
            crate::version::AppVersion::current().to_semver().to_string(),
        )
    }

    /// Per-user roaming data directory
    ///
    /// Returns: %APPDATA%\ReplayUploader
    pub fn app_data_dir() -> PathBuf {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME)
    }

    /// Get the path to the settings file
    ///
    /// Returns: %APPDATA%\ReplayUploader\user.config
    pub fn default_path() -> PathBuf {
        Self::app_data_dir().join(SETTINGS_FILE_NAME)
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version string stamped into saved records
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Load settings, falling back to defaults for a missing or corrupt file
    pub fn load(&self) -> Result<AppSettings> {
        if !self.path.exists() {
            info!("Settings file not found, using defaults");
            return Ok(self.mark_version_change(AppSettings::default()));
        }

        match self.read() {
            Ok(settings) => {
                info!("Settings loaded successfully");
                Ok(settings)
            }
            Err(UploaderError::JsonError(e)) => {
                warn!("Failed to parse settings, using defaults: {}", e);
                Ok(self.mark_version_change(AppSettings::default()))
            }
            Err(e) => Err(e),
        }
    }

    /// Load settings, failing on a missing or unparsable file
    pub fn read(&self) -> Result<AppSettings> {
        let json = std::fs::read_to_string(&self.path)?;
        let settings: AppSettings = serde_json::from_str(&json)?;
        Ok(self.mark_version_change(settings))
    }

    /// A record last saved by a different version must go through restore
    fn mark_version_change(&self, mut settings: AppSettings) -> AppSettings {
        if settings.app_version != self.current_version && !settings.upgrade_required {
            debug!(
                "Settings were saved by version '{}', running '{}'; marking upgrade required",
                settings.app_version, self.current_version
            );
            settings.upgrade_required = true;
        }
        settings
    }

    /// Save settings with an atomic write, stamping the running version
    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        std::fs::create_dir_all(&dir)?;

        let mut stamped = settings.clone();
        stamped.app_version.clone_from(&self.current_version);
        let json = serde_json::to_string_pretty(&stamped)?;

        // Atomic write: write to temp file, then rename over the store
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| {
            UploaderError::SettingsError(StringError::new(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e.error
            )))
        })?;

        debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}
