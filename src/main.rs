//! Replay Uploader - background replay upload client
//!
//! Runs the application lifecycle (settings migration, update checks, tray
//! presentation, failure reporting) around the replay manager, driven from a
//! console shell.

mod gui;

use anyhow::{Context, Result};
use gui::{ConsoleCommand, ConsoleShell, IdleManagerFactory, InputEnd};
use replay_uploader::{
    config::{InstallLayout, SettingsStore},
    controller::{AppController, Collaborators, StartupOptions},
    error::get_user_friendly_error,
    reporter::{DialogNotifier, FailureChannel},
    update::GitHubTransportFactory,
    utils::{self, AutoStartManager},
    version::AppVersion,
};
use std::ffi::OsString;
use std::io;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> Result<()> {
    utils::init_logging().context("Failed to initialize logging system")?;

    let exe_path = std::env::current_exe().context("Failed to locate the running executable")?;
    let layout = InstallLayout::from_current_exe().context("Failed to resolve install directory")?;
    let version = AppVersion::current();

    let collaborators = Collaborators {
        shell: Arc::new(ConsoleShell::new(format!("Replay Uploader {version}"))),
        manager_factory: Arc::new(IdleManagerFactory),
        transport_factory: Arc::new(GitHubTransportFactory::new(
            version.to_semver(),
            layout.packages_dir(),
        )),
        login_startup: Arc::new(AutoStartManager::new(exe_path)),
        notifier: Arc::new(DialogNotifier),
    };
    let options = StartupOptions {
        args: launch_args(std::env::args_os().skip(1)),
        ..StartupOptions::default()
    };

    let app = match AppController::startup(
        SettingsStore::at_default_location(),
        &layout,
        collaborators,
        options,
    ) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:?}", e);
            show_error(&format!(
                "Replay Uploader failed to start:\n\n{}",
                get_user_friendly_error(&e)
            ));
            return Err(e).context("Startup sequence failed");
        }
    };

    if run_command_loop(&app) == InputEnd::Closed {
        // Without a console the app keeps running in the tray until terminated
        info!("Console input closed, continuing without commands");
        loop {
            std::thread::park();
        }
    }

    info!("Replay Uploader shutting down");
    app.shutdown().context("Failed to back up settings on shutdown")?;
    Ok(())
}

/// Launch arguments as text; arguments that are not valid Unicode are
/// converted lossily instead of aborting the launch
fn launch_args(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Dispatch stdin commands until `exit` or end of input
fn run_command_loop(app: &AppController) -> InputEnd {
    gui::read_commands(io::stdin().lock(), |command| {
        app.reporter()
            .run_guarded(FailureChannel::Dispatcher, || handle_command(app, command));
    })
}

fn handle_command(app: &AppController, command: ConsoleCommand) -> replay_uploader::Result<()> {
    match command {
        ConsoleCommand::Show => {
            if !app.visibility().on_tray_activated()? {
                println!("Main window is already open");
            }
        }
        ConsoleCommand::AutoStart(enabled) => {
            app.visibility().set_start_with_windows(enabled)?;
            println!("Start with Windows: {}", on_off(enabled));
        }
        ConsoleCommand::Status => {
            let settings = app.settings().lock().clone();
            println!("Version:            {}", app.version_string());
            println!("Update available:   {}", app.update_available());
            println!("Auto update:        {}", on_off(settings.auto_update));
            println!("Minimize to tray:   {}", on_off(settings.minimize_to_tray));
            println!(
                "Start with Windows: {}",
                on_off(app.visibility().start_with_windows()?)
            );
            println!("Tracked files:      {}", app.manager().files().len());
        }
        ConsoleCommand::Exit => {}
    }
    Ok(())
}

const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Shows a startup error dialog.
#[cfg(windows)]
fn show_error(message: &str) {
    use rfd::MessageDialog;

    MessageDialog::new()
        .set_title("Replay Uploader - Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .set_level(rfd::MessageLevel::Error)
        .show();
}

/// Shows a startup error (non-Windows fallback).
#[cfg(not(windows))]
fn show_error(message: &str) {
    eprintln!("ERROR: {message}");
}
