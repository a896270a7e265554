//! Settings backup and restore across version upgrades
//!
//! An update installs the new version into a fresh directory, so the running
//! version copies its settings store to `<installDir>/../last.config` whenever it
//! might be replaced (update found, shutdown). The next version restores that
//! copy once on its first launch, gated by `upgrade_required`.

use crate::config::manager::SettingsStore;
use crate::config::models::SharedSettings;
use crate::error::{Result, UploaderError};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Backs up and restores the settings store
#[derive(Debug, Clone)]
pub struct SettingsMigrator {
    store: SettingsStore,
    backup_path: PathBuf,
    settings: SharedSettings,
}

impl SettingsMigrator {
    /// Create a migrator for `store`, backing up to `backup_path`
    pub fn new(store: SettingsStore, backup_path: impl Into<PathBuf>, settings: SharedSettings) -> Self {
        Self {
            store,
            backup_path: backup_path.into(),
            settings,
        }
    }

    /// Location of the backup copy
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Save the current settings, then copy the store file to the backup path.
    ///
    /// Failures propagate to the caller.
    pub fn backup(&self) -> Result<()> {
        {
            let settings = self.settings.lock();
            self.store.save(&settings)?;
        }

        std::fs::copy(self.store.path(), &self.backup_path).map_err(|source| {
            UploaderError::BackupFailed {
                path: self.backup_path.clone(),
                source,
            }
        })?;

        info!("Settings backed up to {}", self.backup_path.display());
        Ok(())
    }

    /// Restore the backup if one exists, then clear `upgrade_required`.
    ///
    /// Any failure while copying or upgrading is logged and swallowed; the
    /// flag is cleared and settings saved regardless. Only that final save can
    /// fail this call.
    pub fn restore(&self) -> Result<()> {
        if self.backup_path.exists() {
            if let Err(e) = self.restore_from_backup() {
                error!("Error upgrading settings: {}", e);
            }
        } else {
            info!("No settings backup found at {}", self.backup_path.display());
        }

        let mut settings = self.settings.lock();
        settings.upgrade_required = false;
        self.store.save(&settings)
    }

    fn restore_from_backup(&self) -> Result<()> {
        let dest = self.store.path();
        if let Some(dir) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(&self.backup_path, dest)?;

        let mut reloaded = self
            .store
            .read()
            .map_err(|e| UploaderError::RestoreFailed(Box::new(e)))?;
        reloaded.upgrade(self.store.current_version());
        *self.settings.lock() = reloaded;

        info!("Settings restored from {}", self.backup_path.display());
        Ok(())
    }
}
