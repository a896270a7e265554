//! Console implementation of the UI shell
//!
//! The "main window" is a status banner on stdout and the tray is a flag
//! whose changes are logged. A tray-only launch stays silent until the user
//! types `show`.

use replay_uploader::error::Result;
use replay_uploader::manager::{ManagedFile, Manager, ManagerFactory, SyncCollection};
use replay_uploader::visibility::{ShutdownMode, TrayAffordance, UiShell};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Activate the tray (show the main window)
    Show,
    /// Set the start-with-Windows property
    AutoStart(bool),
    /// Print the current state
    Status,
    /// Shut down
    Exit,
}

impl ConsoleCommand {
    /// Parse one input line, `None` for anything unrecognized
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next()?, words.next()) {
            ("show", None) => Self::Show,
            ("status", None) => Self::Status,
            ("exit" | "quit", None) => Self::Exit,
            ("autostart", Some("on")) => Self::AutoStart(true),
            ("autostart", Some("off")) => Self::AutoStart(false),
            _ => return None,
        };
        words.next().is_none().then_some(command)
    }
}

/// Why the command reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEnd {
    /// The user asked to shut down
    Exit,
    /// Input ended or failed without an exit request
    Closed,
}

/// Feed every recognized command from `input` to `handle` until `exit`.
///
/// Closing the input is not a shutdown request; the caller decides what a
/// closed console means.
pub fn read_commands<R: BufRead>(input: R, mut handle: impl FnMut(ConsoleCommand)) -> InputEnd {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match ConsoleCommand::parse(&line) {
            Some(ConsoleCommand::Exit) => return InputEnd::Exit,
            Some(command) => handle(command),
            None if !line.trim().is_empty() => println!("Unknown command: {}", line.trim()),
            None => {}
        }
    }
    InputEnd::Closed
}

struct ConsoleTray {
    visible: bool,
}

impl TrayAffordance for ConsoleTray {
    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            info!("Tray icon {}", if visible { "shown" } else { "hidden" });
        }
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Stdout-backed shell
#[derive(Debug)]
pub struct ConsoleShell {
    title: String,
}

impl ConsoleShell {
    /// Shell whose main window banner shows `title`
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl UiShell for ConsoleShell {
    fn set_shutdown_mode(&self, mode: ShutdownMode) {
        info!("Shutdown mode set to {:?}", mode);
    }

    fn create_tray(&self) -> Result<Box<dyn TrayAffordance>> {
        Ok(Box::new(ConsoleTray { visible: false }))
    }

    fn show_main_window(&self) -> Result<()> {
        info!("Main window shown");
        println!("{}", self.title);
        println!("Commands: show, autostart on|off, status, exit");
        Ok(())
    }
}

/// Manager with an empty collection that never does any work
struct IdleManager {
    storage_path: PathBuf,
    files: Arc<SyncCollection<ManagedFile>>,
}

impl Manager for IdleManager {
    fn files(&self) -> Arc<SyncCollection<ManagedFile>> {
        Arc::clone(&self.files)
    }

    fn start(&self) -> Result<()> {
        info!("Idle manager started (storage {})", self.storage_path.display());
        Ok(())
    }
}

/// Builds the idle placeholder manager
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleManagerFactory;

impl ManagerFactory for IdleManagerFactory {
    fn create(&self, storage_path: &Path) -> Result<Arc<dyn Manager>> {
        Ok(Arc::new(IdleManager {
            storage_path: storage_path.to_path_buf(),
            files: Arc::new(SyncCollection::new("files")),
        }))
    }
}
