//! Configuration management module
//!
//! This module handles the persisted settings record: loading and saving it
//! (%APPDATA%\ReplayUploader\user.config, atomic writes), the install-relative
//! file layout, and backing settings up and restoring them across updates.

pub mod layout;
pub mod manager;
pub mod migrator;
pub mod models;

pub use layout::InstallLayout;
pub use manager::SettingsStore;
pub use migrator::SettingsMigrator;
pub use models::{AppSettings, SharedSettings};
