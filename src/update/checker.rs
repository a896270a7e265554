//! Periodic update check
//!
//! Each run is independent: the scheduler may start a new run while a previous
//! one is still waiting on the network. Client construction is serialized by
//! its own guard so overlapping runs never build two clients, while the client
//! state itself is only locked briefly. Releasing the checker at shutdown
//! therefore never waits on a connection attempt; a run still in flight when
//! that happens finds the checker shut down and discards its results. The
//! `update_available` flag only ever moves to `true`, so repeated detections
//! are harmless.

use crate::config::{SettingsMigrator, SharedSettings};
use crate::error::Result;
use crate::observable::Observable;
use crate::update::transport::{ReleaseInfo, UpdateTransport, UpdateTransportFactory};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Lifecycle of the lazily constructed transport client
#[derive(Clone)]
pub enum ClientState {
    /// No construction attempted yet, or released at shutdown
    Uninitialized,
    /// A run is constructing the client
    Connecting,
    /// Client connected and reusable by later runs
    Ready(Arc<dyn UpdateTransport>),
    /// Last construction attempt failed; the next run retries
    Failed,
}

impl std::fmt::Debug for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Uninitialized"),
            Self::Connecting => f.write_str("Connecting"),
            Self::Ready(_) => f.write_str("Ready"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Debug builds never self-update
    DebugBuild,
    /// The user turned automatic updates off
    AutoUpdateDisabled,
}

/// Result of a single update check run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The run did not query anything
    Skipped(SkipReason),
    /// The transport client could not be constructed
    ClientUnavailable,
    /// The running version is current
    UpToDate,
    /// A newer release was found and settings were backed up
    UpdateFound(ReleaseInfo),
    /// The query failed; state is unchanged
    QueryFailed,
    /// The checker was released while the run was in flight; nothing was changed
    Abandoned,
}

/// Transient update state observed by the UI
#[derive(Debug, Default)]
pub struct UpdateCheckState {
    /// Whether a transport client has been constructed
    pub update_manager_initialized: AtomicBool,
    /// Whether a newer release is pending
    pub update_available: Observable<bool>,
}

/// Runs update checks against the configured repository
pub struct UpdateChecker {
    settings: SharedSettings,
    migrator: SettingsMigrator,
    factory: Arc<dyn UpdateTransportFactory>,
    client: Mutex<ClientState>,
    /// Held for the duration of a connection attempt, never by `release`
    construction: Mutex<()>,
    shut_down: AtomicBool,
    state: Arc<UpdateCheckState>,
    debug_build: bool,
}

impl UpdateChecker {
    /// Create a checker. `debug_build` disables all checks.
    pub fn new(
        settings: SharedSettings,
        migrator: SettingsMigrator,
        factory: Arc<dyn UpdateTransportFactory>,
        debug_build: bool,
    ) -> Self {
        Self {
            settings,
            migrator,
            factory,
            client: Mutex::new(ClientState::Uninitialized),
            construction: Mutex::new(()),
            shut_down: AtomicBool::new(false),
            state: Arc::new(UpdateCheckState::default()),
            debug_build,
        }
    }

    /// Shared update state
    pub fn state(&self) -> Arc<UpdateCheckState> {
        Arc::clone(&self.state)
    }

    /// Current client lifecycle state
    pub fn client_state(&self) -> ClientState {
        self.client.lock().clone()
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Perform one update check.
    ///
    /// Transport failures are logged and reported as outcomes. Only a failed
    /// settings backup after finding an update is returned as an error.
    pub fn run_once(&self) -> Result<CheckOutcome> {
        if self.debug_build {
            debug!("Debug build, skipping update check");
            return Ok(CheckOutcome::Skipped(SkipReason::DebugBuild));
        }
        let repository = {
            let settings = self.settings.lock();
            if !settings.auto_update {
                debug!("Automatic updates disabled, skipping update check");
                return Ok(CheckOutcome::Skipped(SkipReason::AutoUpdateDisabled));
            }
            settings.update_repository.clone()
        };

        if self.is_shut_down() {
            return Ok(CheckOutcome::Abandoned);
        }
        let Some(client) = self.ensure_client(&repository) else {
            if self.is_shut_down() {
                return Ok(CheckOutcome::Abandoned);
            }
            return Ok(CheckOutcome::ClientUnavailable);
        };

        let response = client.check_and_apply_update();
        if self.is_shut_down() {
            debug!("Update checker released during the query, discarding the result");
            return Ok(CheckOutcome::Abandoned);
        }

        match response {
            Ok(Some(release)) => {
                info!("Update {} is available", release.version);
                self.state.update_available.set(true);
                self.migrator.backup()?;
                Ok(CheckOutcome::UpdateFound(release))
            }
            Ok(None) => Ok(CheckOutcome::UpToDate),
            Err(e) => {
                warn!("Error checking for updates: {}", e);
                Ok(CheckOutcome::QueryFailed)
            }
        }
    }

    fn ready_client(&self) -> Option<Arc<dyn UpdateTransport>> {
        match &*self.client.lock() {
            ClientState::Ready(existing) => Some(Arc::clone(existing)),
            _ => None,
        }
    }

    /// Return the connected client, constructing it on first use.
    ///
    /// Concurrent runs wait on the construction guard for a single attempt
    /// instead of racing. The state lock is never held across `connect`.
    fn ensure_client(&self, repository: &str) -> Option<Arc<dyn UpdateTransport>> {
        if let Some(existing) = self.ready_client() {
            return Some(existing);
        }

        let _construction = self.construction.lock();
        // Another run may have connected while this one waited
        if let Some(existing) = self.ready_client() {
            return Some(existing);
        }
        {
            let mut client = self.client.lock();
            if self.is_shut_down() {
                return None;
            }
            *client = ClientState::Connecting;
        }

        let connected = self.factory.connect(repository);

        let mut client = self.client.lock();
        if self.is_shut_down() {
            debug!("Update checker released while connecting, dropping the client");
            return None;
        }
        match connected {
            Ok(connected) => {
                *client = ClientState::Ready(Arc::clone(&connected));
                self.state
                    .update_manager_initialized
                    .store(true, Ordering::SeqCst);
                Some(connected)
            }
            Err(e) => {
                warn!("Error checking for updates: failed to create update client: {}", e);
                *client = ClientState::Failed;
                None
            }
        }
    }

    /// Drop the transport client (shutdown).
    ///
    /// Returns without waiting for runs in flight; they are abandoned.
    pub fn release(&self) {
        let mut client = self.client.lock();
        self.shut_down.store(true, Ordering::SeqCst);
        if matches!(*client, ClientState::Ready(_)) {
            debug!("Releasing update transport client");
        }
        *client = ClientState::Uninitialized;
        self.state
            .update_manager_initialized
            .store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppSettings, SettingsStore};
    use crate::error::{StringError, UploaderError};
    use crate::test_utils::create_test_dir;
    use semver::Version;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    struct FakeTransport {
        response: fn() -> Result<Option<ReleaseInfo>>,
    }

    impl UpdateTransport for FakeTransport {
        fn check_and_apply_update(&self) -> Result<Option<ReleaseInfo>> {
            (self.response)()
        }
    }

    struct FakeFactory {
        fail_first: usize,
        connects: AtomicUsize,
        response: fn() -> Result<Option<ReleaseInfo>>,
    }

    impl UpdateTransportFactory for FakeFactory {
        fn connect(&self, _repository_locator: &str) -> Result<Arc<dyn UpdateTransport>> {
            let attempt = self.connects.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(UploaderError::UpdateTransportError(StringError::new("offline")));
            }
            Ok(Arc::new(FakeTransport {
                response: self.response,
            }))
        }
    }

    /// Blocks every `connect` until the test lets it through
    struct GatedFactory {
        entered: Mutex<mpsc::Sender<()>>,
        proceed: Mutex<mpsc::Receiver<()>>,
    }

    impl UpdateTransportFactory for GatedFactory {
        fn connect(&self, _repository_locator: &str) -> Result<Arc<dyn UpdateTransport>> {
            let _ = self.entered.lock().send(());
            let _ = self.proceed.lock().recv();
            Ok(Arc::new(FakeTransport { response: release }))
        }
    }

    fn release() -> Result<Option<ReleaseInfo>> {
        Ok(Some(ReleaseInfo {
            version: Version::new(9, 0, 0),
            release_url: "https://example.invalid/release".to_string(),
            staged_package: None,
        }))
    }

    fn up_to_date() -> Result<Option<ReleaseInfo>> {
        Ok(None)
    }

    fn broken() -> Result<Option<ReleaseInfo>> {
        Err(UploaderError::UpdateTransportError(StringError::new("500")))
    }

    fn checker(
        temp_dir: &TempDir,
        settings: AppSettings,
        fail_first: usize,
        response: fn() -> Result<Option<ReleaseInfo>>,
    ) -> (UpdateChecker, Arc<FakeFactory>) {
        let shared = settings.into_shared();
        let store = SettingsStore::new(temp_dir.path().join("user.config"), "1.0.0");
        let migrator = SettingsMigrator::new(store, temp_dir.path().join("last.config"), shared.clone());
        let factory = Arc::new(FakeFactory {
            fail_first,
            connects: AtomicUsize::new(0),
            response,
        });
        let checker = UpdateChecker::new(shared, migrator, factory.clone(), false);
        (checker, factory)
    }

    #[test]
    fn test_debug_build_skips() {
        let temp_dir = create_test_dir();
        let (mut checker, factory) = checker(&temp_dir, AppSettings::default(), 0, release);
        checker.debug_build = true;

        assert_eq!(
            checker.run_once().unwrap(),
            CheckOutcome::Skipped(SkipReason::DebugBuild)
        );
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_auto_update_skips() {
        let temp_dir = create_test_dir();
        let settings = AppSettings {
            auto_update: false,
            ..AppSettings::default()
        };
        let (checker, _) = checker(&temp_dir, settings, 0, release);

        assert_eq!(
            checker.run_once().unwrap(),
            CheckOutcome::Skipped(SkipReason::AutoUpdateDisabled)
        );
        assert!(!checker.state().update_available.get());
    }

    #[test]
    fn test_update_found_sets_flag_and_backs_up() {
        let temp_dir = create_test_dir();
        let (checker, _) = checker(&temp_dir, AppSettings::default(), 0, release);
        let rx = checker.state().update_available.subscribe();

        let outcome = checker.run_once().unwrap();

        assert!(matches!(outcome, CheckOutcome::UpdateFound(_)));
        assert_eq!(rx.try_recv(), Ok(true));
        assert!(temp_dir.path().join("last.config").exists());
    }

    #[test]
    fn test_query_failure_leaves_state_untouched() {
        let temp_dir = create_test_dir();
        let (checker, _) = checker(&temp_dir, AppSettings::default(), 0, broken);

        assert_eq!(checker.run_once().unwrap(), CheckOutcome::QueryFailed);
        assert!(!checker.state().update_available.get());
        assert!(!temp_dir.path().join("last.config").exists());
    }

    #[test]
    fn test_construction_failure_retries_next_run() {
        let temp_dir = create_test_dir();
        let (checker, factory) = checker(&temp_dir, AppSettings::default(), 1, up_to_date);

        assert_eq!(checker.run_once().unwrap(), CheckOutcome::ClientUnavailable);
        assert!(matches!(checker.client_state(), ClientState::Failed));

        assert_eq!(checker.run_once().unwrap(), CheckOutcome::UpToDate);
        assert!(matches!(checker.client_state(), ClientState::Ready(_)));
        assert!(
            checker
                .state()
                .update_manager_initialized
                .load(Ordering::SeqCst)
        );

        // Ready client is reused
        checker.run_once().unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_runs_construct_once() {
        let temp_dir = create_test_dir();
        let (checker, factory) = checker(&temp_dir, AppSettings::default(), 0, release);
        let checker = Arc::new(checker);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let checker = Arc::clone(&checker);
                std::thread::spawn(move || checker.run_once())
            })
            .collect();
        for handle in handles {
            assert!(matches!(
                handle.join().unwrap().unwrap(),
                CheckOutcome::UpdateFound(_)
            ));
        }

        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
        assert!(checker.state().update_available.get());
    }

    #[test]
    fn test_release_resets_client() {
        let temp_dir = create_test_dir();
        let (checker, _) = checker(&temp_dir, AppSettings::default(), 0, up_to_date);
        checker.run_once().unwrap();

        checker.release();
        assert!(matches!(checker.client_state(), ClientState::Uninitialized));
    }

    #[test]
    fn test_release_does_not_wait_for_connection() {
        let temp_dir = create_test_dir();
        let shared = AppSettings::default().into_shared();
        let store = SettingsStore::new(temp_dir.path().join("user.config"), "1.0.0");
        let backup_path = temp_dir.path().join("last.config");
        let migrator = SettingsMigrator::new(store, backup_path.clone(), shared.clone());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (proceed_tx, proceed_rx) = mpsc::channel();
        let factory = Arc::new(GatedFactory {
            entered: Mutex::new(entered_tx),
            proceed: Mutex::new(proceed_rx),
        });
        let checker = Arc::new(UpdateChecker::new(shared, migrator, factory, false));

        let run = {
            let checker = Arc::clone(&checker);
            std::thread::spawn(move || checker.run_once())
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(checker.client_state(), ClientState::Connecting));

        let started = Instant::now();
        checker.release();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(checker.client_state(), ClientState::Uninitialized));

        // The late connection finds a newer release but must not act on it
        proceed_tx.send(()).unwrap();
        assert_eq!(run.join().unwrap().unwrap(), CheckOutcome::Abandoned);
        assert!(matches!(checker.client_state(), ClientState::Uninitialized));
        assert!(!checker.state().update_available.get());
        assert!(
            !checker
                .state()
                .update_manager_initialized
                .load(Ordering::SeqCst)
        );
        assert!(!backup_path.exists());
    }

    #[test]
    fn test_runs_after_release_are_abandoned() {
        let temp_dir = create_test_dir();
        let (checker, factory) = checker(&temp_dir, AppSettings::default(), 0, release);
        checker.release();

        assert_eq!(checker.run_once().unwrap(), CheckOutcome::Abandoned);
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
        assert!(!temp_dir.path().join("last.config").exists());
    }
}
