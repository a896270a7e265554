//! Application lifecycle controller
//!
//! Coordinates the startup sequence, the recurring update check and the
//! shutdown release path.
//!
//! # Startup order
//!
//! ```text
//! shutdown policy → reporter → load settings → restore (if upgrading)
//!     → visibility coordinator → manager → collection registration
//!     → initial presentation → manager start → update check + hourly timer
//! ```
//!
//! # Shutdown
//!
//! Stops the timer, saves and backs up settings, releases the update client
//! and then the tray. Runs on [`AppController::shutdown`] or on drop.

pub mod app_controller;
pub mod scheduler;

pub use app_controller::{AppController, Collaborators, StartupOptions};
pub use scheduler::{RecurringTimer, UPDATE_CHECK_INTERVAL};
