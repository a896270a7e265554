//! Configuration data models
//!
//! This module defines the persisted application settings record.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Current on-disk schema version of [`AppSettings`]
pub const SETTINGS_SCHEMA_VERSION: u32 = 2;

/// Repository the application updates from unless the user overrides it
pub const DEFAULT_UPDATE_REPOSITORY: &str = "https://github.com/Poma/HotsApi.Uploader";

/// Settings shared between lifecycle components
///
/// Constructed once at startup and handed to every component that needs it.
pub type SharedSettings = Arc<Mutex<AppSettings>>;

/// Persisted user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Schema version the record was written with
    pub schema_version: u32,
    /// Application version that last saved this record (`MAJOR.MINOR.BUILD`)
    pub app_version: String,
    /// Whether the periodic update check runs
    pub auto_update: bool,
    /// Whether an autorun launch starts in the tray instead of the main window
    pub minimize_to_tray: bool,
    /// Locator of the repository updates are fetched from
    pub update_repository: String,
    /// Whether settings from the previous version still need to be restored
    pub upgrade_required: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            app_version: String::new(),
            auto_update: true,
            minimize_to_tray: true,
            update_repository: DEFAULT_UPDATE_REPOSITORY.to_string(),
            upgrade_required: true,
        }
    }
}

impl AppSettings {
    /// Wrap the settings for sharing between components
    pub fn into_shared(self) -> SharedSettings {
        Arc::new(Mutex::new(self))
    }

    /// Bring a record written by an older version up to the current format
    ///
    /// Schema 1 had no repository field; an empty locator is replaced with the
    /// default repository.
    pub fn upgrade(&mut self, current_version: &str) {
        if self.schema_version < 2 && self.update_repository.trim().is_empty() {
            self.update_repository = DEFAULT_UPDATE_REPOSITORY.to_string();
        }
        if self.schema_version != SETTINGS_SCHEMA_VERSION {
            info!(
                "Upgraded settings schema {} -> {}",
                self.schema_version, SETTINGS_SCHEMA_VERSION
            );
            self.schema_version = SETTINGS_SCHEMA_VERSION;
        }
        self.app_version = current_version.to_string();
    }
}
