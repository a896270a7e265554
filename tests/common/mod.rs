//! Test doubles for the lifecycle collaborators

#![allow(dead_code)]

use parking_lot::Mutex;
use replay_uploader::config::{InstallLayout, SettingsStore};
use replay_uploader::controller::{AppController, Collaborators, StartupOptions};
use replay_uploader::error::{Result, StringError, UploaderError};
use replay_uploader::manager::{ManagedFile, Manager, ManagerFactory, SyncCollection};
use replay_uploader::reporter::Notifier;
use replay_uploader::update::{ReleaseInfo, UpdateTransport, UpdateTransportFactory};
use replay_uploader::utils::LoginStartup;
use replay_uploader::visibility::{ShutdownMode, TrayAffordance, UiShell};
use semver::Version;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Version string the test stores are bound to
pub const RUNNING_VERSION: &str = "1.4.0";

pub struct FakeTray(Arc<Mutex<bool>>);

impl TrayAffordance for FakeTray {
    fn set_visible(&mut self, visible: bool) {
        *self.0.lock() = visible;
    }

    fn is_visible(&self) -> bool {
        *self.0.lock()
    }
}

#[derive(Default)]
pub struct FakeShell {
    pub shutdown_mode: Mutex<Option<ShutdownMode>>,
    pub windows: AtomicUsize,
    pub tray_visible: Arc<Mutex<bool>>,
    pub fail_window: AtomicBool,
}

impl UiShell for FakeShell {
    fn set_shutdown_mode(&self, mode: ShutdownMode) {
        *self.shutdown_mode.lock() = Some(mode);
    }

    fn create_tray(&self) -> Result<Box<dyn TrayAffordance>> {
        Ok(Box::new(FakeTray(Arc::clone(&self.tray_visible))))
    }

    fn show_main_window(&self) -> Result<()> {
        if self.fail_window.load(Ordering::SeqCst) {
            return Err(UploaderError::PresentationError(StringError::new(
                "window resources missing",
            )));
        }
        self.windows.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeManager {
    files: Arc<SyncCollection<ManagedFile>>,
    pub started: AtomicBool,
    pub synchronized_at_start: AtomicBool,
}

impl Manager for FakeManager {
    fn files(&self) -> Arc<SyncCollection<ManagedFile>> {
        Arc::clone(&self.files)
    }

    fn start(&self) -> Result<()> {
        self.synchronized_at_start
            .store(self.files.is_synchronized(), Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeManagerFactory {
    pub created: Mutex<Option<(PathBuf, Arc<FakeManager>)>>,
}

impl FakeManagerFactory {
    pub fn manager(&self) -> Arc<FakeManager> {
        let created = self.created.lock();
        let (_, manager) = created.as_ref().unwrap();
        Arc::clone(manager)
    }

    pub fn storage_path(&self) -> PathBuf {
        self.created.lock().as_ref().unwrap().0.clone()
    }
}

impl ManagerFactory for FakeManagerFactory {
    fn create(&self, storage_path: &Path) -> Result<Arc<dyn Manager>> {
        let manager = Arc::new(FakeManager {
            files: Arc::new(SyncCollection::new("files")),
            started: AtomicBool::new(false),
            synchronized_at_start: AtomicBool::new(false),
        });
        *self.created.lock() = Some((storage_path.to_path_buf(), Arc::clone(&manager)));
        Ok(manager)
    }
}

/// What the fake transport answers to every check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportResponse {
    UpToDate,
    NewRelease,
    Fails,
}

pub struct FakeTransport {
    response: TransportResponse,
    pub checks: Arc<AtomicUsize>,
}

impl UpdateTransport for FakeTransport {
    fn check_and_apply_update(&self) -> Result<Option<ReleaseInfo>> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match self.response {
            TransportResponse::UpToDate => Ok(None),
            TransportResponse::NewRelease => Ok(Some(ReleaseInfo {
                version: Version::new(1, 5, 0),
                release_url: "https://example.invalid/releases/v1.5".to_string(),
                staged_package: None,
            })),
            TransportResponse::Fails => Err(UploaderError::UpdateTransportError(
                StringError::new("network unreachable"),
            )),
        }
    }
}

pub struct FakeTransportFactory {
    response: TransportResponse,
    connect_delay: Duration,
    pub connects: AtomicUsize,
    /// Connection attempts that returned
    pub connected: AtomicUsize,
    pub checks: Arc<AtomicUsize>,
    pub locators: Mutex<Vec<String>>,
}

impl FakeTransportFactory {
    pub fn new(response: TransportResponse) -> Self {
        Self::with_connect_delay(response, Duration::ZERO)
    }

    /// Factory whose `connect` takes `connect_delay` to return
    pub fn with_connect_delay(response: TransportResponse, connect_delay: Duration) -> Self {
        Self {
            response,
            connect_delay,
            connects: AtomicUsize::new(0),
            connected: AtomicUsize::new(0),
            checks: Arc::new(AtomicUsize::new(0)),
            locators: Mutex::new(Vec::new()),
        }
    }
}

impl UpdateTransportFactory for FakeTransportFactory {
    fn connect(&self, repository_locator: &str) -> Result<Arc<dyn UpdateTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.locators.lock().push(repository_locator.to_string());
        std::thread::sleep(self.connect_delay);
        self.connected.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeTransport {
            response: self.response,
            checks: Arc::clone(&self.checks),
        }))
    }
}

#[derive(Default)]
pub struct FakeLogin {
    pub registered: Mutex<bool>,
}

impl LoginStartup for FakeLogin {
    fn is_registered(&self) -> Result<bool> {
        Ok(*self.registered.lock())
    }

    fn register(&self) -> Result<()> {
        *self.registered.lock() = true;
        Ok(())
    }

    fn unregister(&self) -> Result<()> {
        *self.registered.lock() = false;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notices.lock().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show_notice(&self, title: &str, detail: &str) -> Result<()> {
        self.notices
            .lock()
            .push((title.to_string(), detail.to_string()));
        Ok(())
    }
}

/// Log sink for a thread-scoped subscriber
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Plain-text subscriber writing into this capture
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish()
    }

    /// Everything logged so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

/// Isolated install/roaming directories plus recording collaborators
pub struct Harness {
    pub temp_dir: TempDir,
    pub layout: InstallLayout,
    pub store_path: PathBuf,
    pub shell: Arc<FakeShell>,
    pub managers: Arc<FakeManagerFactory>,
    pub transports: Arc<FakeTransportFactory>,
    pub login: Arc<FakeLogin>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(response: TransportResponse) -> Self {
        Self::with_transports(FakeTransportFactory::new(response))
    }

    pub fn with_transports(transports: FakeTransportFactory) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let install_dir = temp_dir.path().join("app-1.4.0");
        std::fs::create_dir_all(&install_dir).unwrap();
        let store_path = temp_dir.path().join("roaming").join("user.config");

        Self {
            layout: InstallLayout::new(install_dir),
            store_path,
            temp_dir,
            shell: Arc::new(FakeShell::default()),
            managers: Arc::new(FakeManagerFactory::default()),
            transports: Arc::new(transports),
            login: Arc::new(FakeLogin::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn store(&self) -> SettingsStore {
        SettingsStore::new(&self.store_path, RUNNING_VERSION)
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            shell: self.shell.clone(),
            manager_factory: self.managers.clone(),
            transport_factory: self.transports.clone(),
            login_startup: self.login.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn start(&self, args: &[&str]) -> AppController {
        let options = StartupOptions {
            args: args.iter().map(ToString::to_string).collect(),
            debug_build: false,
            update_interval: Duration::from_secs(3600),
        };
        AppController::startup(self.store(), &self.layout, self.collaborators(), options).unwrap()
    }

    pub fn backup_path(&self) -> PathBuf {
        self.layout.backup_path()
    }
}
