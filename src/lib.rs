//! `ReplayUploader` - application lifecycle for the replay upload client
//!
//! Coordinates startup and shutdown around the background replay manager:
//! per-version settings migration through a backup file, an hourly
//! self-update check, tray-versus-window presentation for autorun launches,
//! and reporting of unhandled failures on three channels.
//!
//! # Threading
//!
//! Background work runs on plain threads. The update check and its timer
//! each get their own thread, and failures inside them are reported on the
//! task channel. Shared state is passed explicitly as
//! `Arc<parking_lot::Mutex<_>>` rather than held in globals.

// Module declarations
pub mod config;
pub mod controller;
pub mod error;
pub mod manager;
pub mod observable;
pub mod reporter;
pub mod update;
pub mod utils;
pub mod version;
pub mod visibility;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use error::{Result, UploaderError};
