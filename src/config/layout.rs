//! Install-relative file locations
//!
//! The application is installed into a versioned directory
//! (`<root>\app-1.4.2\`), so anything that must survive an update lives one
//! level up, next to the version directories.

use std::path::{Path, PathBuf};

/// File name of the settings backup copy
pub const BACKUP_FILE_NAME: &str = "last.config";

/// File name of the replay storage
pub const REPLAY_STORAGE_FILE_NAME: &str = "replays.xml";

/// Directory name where downloaded update packages are staged
pub const PACKAGES_DIR_NAME: &str = "packages";

/// Locations derived from the install directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    install_dir: PathBuf,
}

impl InstallLayout {
    /// Layout rooted at `install_dir` (the directory holding the executable)
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    /// Layout for the running executable
    pub fn from_current_exe() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self::new(dir))
    }

    /// Directory holding the executable
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// `<installDir>/../last.config`
    pub fn backup_path(&self) -> PathBuf {
        self.install_dir.join("..").join(BACKUP_FILE_NAME)
    }

    /// `<installDir>/../replays.xml`
    pub fn replay_storage_path(&self) -> PathBuf {
        self.install_dir.join("..").join(REPLAY_STORAGE_FILE_NAME)
    }

    /// `<installDir>/../packages`
    pub fn packages_dir(&self) -> PathBuf {
        self.install_dir.join("..").join(PACKAGES_DIR_NAME)
    }
}
