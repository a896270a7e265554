//! Run-at-login registration
//!
//! On Windows the entry is a value under
//! `HKCU\Software\Microsoft\Windows\CurrentVersion\Run` keyed by the
//! executable's file name, launching it with `--autorun`. Other platforms get
//! an in-memory registration so the setting still behaves consistently.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Argument marking a launch triggered by the OS login mechanism
pub const AUTORUN_ARG: &str = "--autorun";

/// OS login-startup registration for one executable
pub trait LoginStartup: Send + Sync {
    /// Whether an entry currently exists for the executable
    fn is_registered(&self) -> Result<bool>;

    /// Create or overwrite the entry
    fn register(&self) -> Result<()>;

    /// Remove the entry if present
    fn unregister(&self) -> Result<()>;
}

/// Command line stored in the login entry
pub fn autorun_command(exe_path: &Path) -> String {
    format!("\"{}\" {AUTORUN_ARG}", exe_path.display())
}

/// Registry-backed login entry (Windows)
#[cfg(windows)]
pub struct AutoStartManager {
    exe_path: PathBuf,
    value_name: String,
}

#[cfg(windows)]
impl AutoStartManager {
    const RUN_KEY: &'static str = r"Software\Microsoft\Windows\CurrentVersion\Run";

    /// Registration for `exe_path`, keyed by its file name
    pub fn new(exe_path: impl Into<PathBuf>) -> Self {
        let exe_path = exe_path.into();
        let value_name = exe_path
            .file_stem()
            .map_or_else(|| "ReplayUploader".to_string(), |s| s.to_string_lossy().into_owned());
        Self {
            exe_path,
            value_name,
        }
    }

    fn open_run_key(&self, access: u32) -> std::io::Result<winreg::RegKey> {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        RegKey::predef(HKEY_CURRENT_USER).open_subkey_with_flags(Self::RUN_KEY, access)
    }
}

#[cfg(windows)]
impl LoginStartup for AutoStartManager {
    fn is_registered(&self) -> Result<bool> {
        use winreg::enums::KEY_READ;

        let key = self.open_run_key(KEY_READ).map_err(login_error)?;
        match key.get_value::<String, _>(&self.value_name) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(login_error(e)),
        }
    }

    fn register(&self) -> Result<()> {
        use tracing::info;
        use winreg::enums::KEY_SET_VALUE;

        let key = self.open_run_key(KEY_SET_VALUE).map_err(login_error)?;
        key.set_value(&self.value_name, &autorun_command(&self.exe_path))
            .map_err(login_error)?;
        info!("Registered login startup entry '{}'", self.value_name);
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        use tracing::info;
        use winreg::enums::KEY_SET_VALUE;

        let key = self.open_run_key(KEY_SET_VALUE).map_err(login_error)?;
        match key.delete_value(&self.value_name) {
            Ok(()) => {
                info!("Removed login startup entry '{}'", self.value_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(login_error(e)),
        }
    }
}

#[cfg(windows)]
fn login_error(e: std::io::Error) -> crate::error::UploaderError {
    crate::error::UploaderError::LoginStartupError(Box::new(e))
}

/// In-memory login entry for platforms without a registry
#[cfg(not(windows))]
pub struct AutoStartManager {
    exe_path: PathBuf,
    command: parking_lot::Mutex<Option<String>>,
}

#[cfg(not(windows))]
impl AutoStartManager {
    /// Registration for `exe_path`
    pub fn new(exe_path: impl Into<PathBuf>) -> Self {
        Self {
            exe_path: exe_path.into(),
            command: parking_lot::Mutex::new(None),
        }
    }
}

#[cfg(not(windows))]
impl LoginStartup for AutoStartManager {
    fn is_registered(&self) -> Result<bool> {
        Ok(self.command.lock().is_some())
    }

    fn register(&self) -> Result<()> {
        *self.command.lock() = Some(autorun_command(&self.exe_path));
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        *self.command.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autorun_command_quotes_path() {
        let command = autorun_command(Path::new("C:\\Program Files\\Uploader\\uploader.exe"));
        assert_eq!(
            command,
            "\"C:\\Program Files\\Uploader\\uploader.exe\" --autorun"
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn test_in_memory_registration_toggles() {
        let manager = AutoStartManager::new("/opt/uploader/uploader");
        assert!(!manager.is_registered().unwrap());

        manager.register().unwrap();
        assert!(manager.is_registered().unwrap());

        manager.unregister().unwrap();
        assert!(!manager.is_registered().unwrap());
    }
}
