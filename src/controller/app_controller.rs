//! Startup sequencing and shutdown
//!
//! [`AppController::startup`] runs the launch sequence exactly once, in a fixed
//! order, and returns a controller whose release path (settings save and
//! backup, update client, tray) runs on [`AppController::shutdown`] or, failing
//! that, on drop.

use crate::config::{InstallLayout, SettingsMigrator, SettingsStore, SharedSettings};
use crate::controller::scheduler::{RecurringTimer, UPDATE_CHECK_INTERVAL};
use crate::error::Result;
use crate::manager::{Manager, ManagerFactory, SyncCollection};
use crate::observable::Observable;
use crate::reporter::{ExceptionReporter, FailureChannel, Notifier};
use crate::update::{CheckOutcome, UpdateCheckState, UpdateChecker, UpdateTransportFactory};
use crate::utils::autostart::LoginStartup;
use crate::version::AppVersion;
use crate::visibility::{ShutdownMode, UiShell, VisibilityCoordinator, resolve_initial_presentation};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

/// External collaborators the lifecycle drives
pub struct Collaborators {
    /// Window, tray and shutdown-policy host
    pub shell: Arc<dyn UiShell>,
    /// Builds the background replay manager
    pub manager_factory: Arc<dyn ManagerFactory>,
    /// Connects the update transport client
    pub transport_factory: Arc<dyn UpdateTransportFactory>,
    /// Run-at-login registration for this executable
    pub login_startup: Arc<dyn LoginStartup>,
    /// Displays failure notices
    pub notifier: Arc<dyn Notifier>,
}

/// Per-launch options
#[derive(Debug, Clone)]
pub struct StartupOptions {
    /// Process arguments (without the executable path)
    pub args: Vec<String>,
    /// Debug builds never self-update
    pub debug_build: bool,
    /// Period of the recurring update check
    pub update_interval: Duration,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            debug_build: cfg!(debug_assertions),
            update_interval: UPDATE_CHECK_INTERVAL,
        }
    }
}

/// Running application lifecycle
pub struct AppController {
    settings: SharedSettings,
    migrator: SettingsMigrator,
    reporter: Arc<ExceptionReporter>,
    visibility: Arc<VisibilityCoordinator>,
    manager: Arc<dyn Manager>,
    checker: Arc<UpdateChecker>,
    update_timer: Option<RecurringTimer>,
    /// Held only while registering collections for cross-thread access
    registration_lock: Mutex<()>,
    version: AppVersion,
    released: bool,
}

impl AppController {
    /// Run the launch sequence
    pub fn startup(
        store: SettingsStore,
        layout: &InstallLayout,
        collaborators: Collaborators,
        options: StartupOptions,
    ) -> Result<Self> {
        let Collaborators {
            shell,
            manager_factory,
            transport_factory,
            login_startup,
            notifier,
        } = collaborators;

        // The process keeps running with no window open (tray only)
        shell.set_shutdown_mode(ShutdownMode::OnExplicitShutdown);

        let reporter = ExceptionReporter::new(notifier);
        reporter.install();
        let version = AppVersion::current();
        info!("App {} started", version);

        let settings = store.load()?.into_shared();
        let migrator = SettingsMigrator::new(store, layout.backup_path(), Arc::clone(&settings));

        if settings.lock().upgrade_required {
            info!("Settings upgrade required, restoring backup");
            if let Err(e) = migrator.restore() {
                reporter.report_error(FailureChannel::Dispatcher, &e);
            }
        }

        let visibility = Arc::new(VisibilityCoordinator::new(Arc::clone(&shell), login_startup)?);

        let storage_path = layout.replay_storage_path();
        info!("Creating manager with storage {}", storage_path.display());
        let manager = manager_factory.create(&storage_path)?;

        let checker = Arc::new(UpdateChecker::new(
            Arc::clone(&settings),
            migrator.clone(),
            transport_factory,
            options.debug_build,
        ));
        let mut controller = Self {
            settings,
            migrator,
            reporter,
            visibility,
            manager,
            checker,
            update_timer: None,
            registration_lock: Mutex::new(()),
            version,
            released: false,
        };

        // Manager threads may mutate the collection as soon as it starts
        let files = controller.manager.files();
        controller.register_for_cross_thread_access(files.as_ref());

        let minimize_to_tray = controller.settings.lock().minimize_to_tray;
        let presentation = resolve_initial_presentation(&options.args, minimize_to_tray);
        if let Err(e) = controller.visibility.present(presentation) {
            controller.reporter.report_error(FailureChannel::Dispatcher, &e);
        }

        if let Err(e) = controller.manager.start() {
            controller.reporter.report_error(FailureChannel::Dispatcher, &e);
        }

        // Check for updates on startup and then every interval
        controller.check_for_updates();
        let reporter = Arc::clone(&controller.reporter);
        let checker = Arc::clone(&controller.checker);
        controller.update_timer = Some(RecurringTimer::start(
            "update-timer",
            options.update_interval,
            move || {
                spawn_update_check(&reporter, &checker);
            },
        )?);

        info!("Startup sequence complete");
        Ok(controller)
    }

    /// Allow `collection` to be mutated from background threads
    pub fn register_for_cross_thread_access<T: Clone>(&self, collection: &SyncCollection<T>) {
        let _registration = self.registration_lock.lock();
        collection.enable_synchronization();
        debug!("Collection registered for cross-thread access");
    }

    /// Start an update check as a background task
    pub fn check_for_updates(&self) -> Option<JoinHandle<Option<CheckOutcome>>> {
        spawn_update_check(&self.reporter, &self.checker)
    }

    /// Shared settings record
    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Settings backup/restore
    pub fn migrator(&self) -> &SettingsMigrator {
        &self.migrator
    }

    /// Installed failure reporter
    pub fn reporter(&self) -> &Arc<ExceptionReporter> {
        &self.reporter
    }

    /// Window/tray coordinator
    pub fn visibility(&self) -> &Arc<VisibilityCoordinator> {
        &self.visibility
    }

    /// Background manager
    pub fn manager(&self) -> &Arc<dyn Manager> {
        &self.manager
    }

    /// Update checker
    pub fn update_checker(&self) -> &Arc<UpdateChecker> {
        &self.checker
    }

    /// Update state shared with the UI
    pub fn update_state(&self) -> Arc<UpdateCheckState> {
        self.checker.state()
    }

    /// Current value of the "update available" flag
    pub fn update_available(&self) -> bool {
        self.checker.state().update_available.get()
    }

    /// Subscribe to "update available" changes
    pub fn subscribe_update_available(&self) -> std::sync::mpsc::Receiver<bool> {
        self.checker.state().update_available.subscribe()
    }

    /// Observable start-with-Windows value
    pub fn start_with_windows(&self) -> &Observable<bool> {
        self.visibility.start_with_windows_observable()
    }

    /// Running version, e.g. `v1.4` or `v1.4.2`
    pub fn version_string(&self) -> String {
        self.version.version_string()
    }

    /// Save and back up settings, then release the update client and tray.
    ///
    /// The backup result is returned after every resource has been released.
    pub fn shutdown(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        info!("Shutting down");

        // In-flight checks are abandoned, only the timer is stopped
        if let Some(mut timer) = self.update_timer.take() {
            timer.stop();
        }

        let backup = self.migrator.backup();
        self.checker.release();
        self.visibility.release_tray();
        backup
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            self.reporter.report_error(FailureChannel::Domain, &e);
        }
    }
}

fn spawn_update_check(
    reporter: &Arc<ExceptionReporter>,
    checker: &Arc<UpdateChecker>,
) -> Option<JoinHandle<Option<CheckOutcome>>> {
    let checker = Arc::clone(checker);
    reporter.spawn_task("update-check", move || {
        let outcome = checker.run_once()?;
        debug!("Update check finished: {:?}", outcome);
        Ok::<_, crate::error::UploaderError>(outcome)
    })
}
