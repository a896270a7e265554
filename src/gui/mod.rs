//! Headless user interface host
//!
//! Provides the console shell the binary runs with: window and tray requests
//! are logged and printed, and user actions arrive as stdin commands.

pub mod console_shell;

pub use console_shell::{ConsoleCommand, ConsoleShell, IdleManagerFactory, InputEnd, read_commands};
