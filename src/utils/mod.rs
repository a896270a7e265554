//! Utility modules
//!
//! Provides run-at-login registration and logging setup.

pub mod autostart;
pub mod logging;

pub use autostart::{AUTORUN_ARG, AutoStartManager, LoginStartup};
pub use logging::init_logging;
