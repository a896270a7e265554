//! Startup presentation and the tray-to-window transition
//!
//! An autorun launch with `minimize_to_tray` enabled starts with only the tray
//! affordance visible; every other launch shows the main window. Activating
//! the tray shows the window and hides the tray. Nothing here ever moves the
//! window back into the tray.

use crate::error::Result;
use crate::observable::Observable;
use crate::utils::autostart::{AUTORUN_ARG, LoginStartup};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Whether closing the last window ends the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Exit when the last window closes
    OnLastWindowClose,
    /// Exit only on an explicit request
    OnExplicitShutdown,
}

/// Minimal background presence usable while the main window is hidden
pub trait TrayAffordance: Send {
    /// Show or hide the tray icon
    fn set_visible(&mut self, visible: bool);

    /// Whether the tray icon is shown
    fn is_visible(&self) -> bool;
}

/// Host UI the lifecycle drives (window, tray, shutdown policy)
pub trait UiShell: Send + Sync {
    /// Configure when the process exits
    fn set_shutdown_mode(&self, mode: ShutdownMode);

    /// Create the tray affordance, initially hidden
    fn create_tray(&self) -> Result<Box<dyn TrayAffordance>>;

    /// Create and show a main window
    fn show_main_window(&self) -> Result<()>;
}

/// What to show when the process starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPresentation {
    /// Only the tray affordance
    TrayOnly,
    /// The main window
    MainWindow,
}

/// Decide the initial presentation from the launch arguments
pub fn resolve_initial_presentation<S: AsRef<str>>(
    args: &[S],
    minimize_to_tray: bool,
) -> InitialPresentation {
    let autorun = args.iter().any(|arg| arg.as_ref() == AUTORUN_ARG);
    if autorun && minimize_to_tray {
        InitialPresentation::TrayOnly
    } else {
        InitialPresentation::MainWindow
    }
}

/// Owns the tray affordance and the start-with-Windows property
pub struct VisibilityCoordinator {
    shell: Arc<dyn UiShell>,
    tray: Mutex<Option<Box<dyn TrayAffordance>>>,
    login_startup: Arc<dyn LoginStartup>,
    start_with_windows: Observable<bool>,
}

impl VisibilityCoordinator {
    /// Create the coordinator and its hidden tray affordance
    pub fn new(shell: Arc<dyn UiShell>, login_startup: Arc<dyn LoginStartup>) -> Result<Self> {
        let mut tray = shell.create_tray()?;
        tray.set_visible(false);
        let registered = login_startup.is_registered().unwrap_or(false);

        Ok(Self {
            shell,
            tray: Mutex::new(Some(tray)),
            login_startup,
            start_with_windows: Observable::new(registered),
        })
    }

    /// Apply the initial presentation decision
    pub fn present(&self, presentation: InitialPresentation) -> Result<()> {
        info!("Initial presentation: {:?}", presentation);
        match presentation {
            InitialPresentation::TrayOnly => {
                self.set_tray_visible(true);
                Ok(())
            }
            InitialPresentation::MainWindow => self.shell.show_main_window(),
        }
    }

    /// Handle a tray activation: show the main window and hide the tray.
    ///
    /// Returns `false` if the tray was not visible, in which case nothing happens.
    pub fn on_tray_activated(&self) -> Result<bool> {
        if !self.is_tray_visible() {
            debug!("Tray activation ignored, tray is hidden");
            return Ok(false);
        }
        self.shell.show_main_window()?;
        self.set_tray_visible(false);
        Ok(true)
    }

    /// Whether the tray affordance is visible
    pub fn is_tray_visible(&self) -> bool {
        self.tray.lock().as_ref().is_some_and(|tray| tray.is_visible())
    }

    fn set_tray_visible(&self, visible: bool) {
        if let Some(tray) = self.tray.lock().as_mut() {
            tray.set_visible(visible);
        }
    }

    /// Whether a login-startup entry exists for this executable.
    ///
    /// Queries the OS every time; the registration is not owned by this process.
    pub fn start_with_windows(&self) -> Result<bool> {
        let registered = self.login_startup.is_registered()?;
        self.start_with_windows.set(registered);
        Ok(registered)
    }

    /// Create (`true`) or remove (`false`) the login-startup entry
    pub fn set_start_with_windows(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.login_startup.register()?;
        } else {
            self.login_startup.unregister()?;
        }
        self.start_with_windows()?;
        Ok(())
    }

    /// Observable start-with-Windows value for the UI
    pub fn start_with_windows_observable(&self) -> &Observable<bool> {
        &self.start_with_windows
    }

    /// Release the tray affordance
    pub fn release_tray(&self) {
        if let Some(mut tray) = self.tray.lock().take() {
            tray.set_visible(false);
            debug!("Tray affordance released");
        }
    }
}
