//! Unhandled failure reporting
//!
//! Failures reach the reporter through three independent channels:
//!
//! - **dispatcher**: UI callbacks run through [`ExceptionReporter::run_guarded`]
//! - **task**: background work started with [`ExceptionReporter::spawn_task`]
//! - **domain**: any panic no guarded scope caught, via the process panic hook
//!
//! Every failure is logged once with its channel tag and a best-effort modal
//! notice is shown. Showing the notice happens on a helper thread whose panic
//! is discarded, so reporting can never raise a second failure (this matters
//! inside the panic hook, where a nested panic would abort the process).

use crate::error::{Result, UploaderError, get_user_friendly_error};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Source of an unhandled failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureChannel {
    /// Raised on the UI/presentation context
    Dispatcher,
    /// Raised inside a background task
    Task,
    /// Escaped every other handler
    Domain,
}

impl FailureChannel {
    /// Tag used in logs and notice titles
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Dispatcher => "dispatcher",
            Self::Task => "task",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for FailureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Displays a modal notice to the user
pub trait Notifier: Send + Sync {
    /// Show `detail` in a notice titled `title`
    fn show_notice(&self, title: &str, detail: &str) -> Result<()>;
}

/// Native message box notice
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogNotifier;

#[cfg(windows)]
impl Notifier for DialogNotifier {
    fn show_notice(&self, title: &str, detail: &str) -> Result<()> {
        use rfd::MessageDialog;

        MessageDialog::new()
            .set_title(title)
            .set_description(detail)
            .set_buttons(rfd::MessageButtons::Ok)
            .set_level(rfd::MessageLevel::Error)
            .show();
        Ok(())
    }
}

#[cfg(not(windows))]
impl Notifier for DialogNotifier {
    fn show_notice(&self, title: &str, detail: &str) -> Result<()> {
        eprintln!("{title}\n{detail}");
        Ok(())
    }
}

static GLOBAL_REPORTER: OnceLock<Arc<ExceptionReporter>> = OnceLock::new();

thread_local! {
    /// Depth of guarded scopes active on this thread
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    /// Panic detail captured by the hook for the innermost guarded scope
    static CAPTURED_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Logs unhandled failures and notifies the user
pub struct ExceptionReporter {
    notifier: Arc<dyn Notifier>,
}

impl ExceptionReporter {
    /// Create a reporter that shows notices through `notifier`
    pub fn new(notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self { notifier })
    }

    /// Install the process panic hook for the domain channel.
    ///
    /// Only the first installation in a process takes effect; returns whether
    /// this call installed the hook.
    pub fn install(self: &Arc<Self>) -> bool {
        let mut first = false;
        GLOBAL_REPORTER.get_or_init(|| {
            first = true;
            Arc::clone(self)
        });

        if !first {
            debug!("Exception reporter already installed");
            return false;
        }

        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                // A guarded scope will report this on its own channel
                let detail = describe_panic(info);
                CAPTURED_PANIC.with(|slot| *slot.borrow_mut() = Some(detail));
                return;
            }
            if let Some(reporter) = GLOBAL_REPORTER.get() {
                reporter.report(FailureChannel::Domain, &describe_panic(info));
            }
            previous(info);
        }));
        debug!("Exception reporter installed");
        true
    }

    /// Log a failure on `channel` and show a best-effort notice
    pub fn report(&self, channel: FailureChannel, detail: &str) {
        error!(channel = channel.tag(), "Unhandled {} exception: {}", channel, detail);

        let title = format!("Unhandled {channel} exception");
        let notifier = Arc::clone(&self.notifier);
        let body = detail.to_string();
        let shown = thread::Builder::new()
            .name("failure-notice".to_string())
            .spawn(move || {
                // Keep the hook from reporting a panic in the notice itself
                GUARD_DEPTH.with(|depth| depth.set(1));
                notifier.show_notice(&title, &body)
            })
            .map(JoinHandle::join);

        // Probably not on a UI-capable thread; nothing more to do
        if !matches!(shown, Ok(Ok(Ok(())))) {
            debug!("Failure notice could not be displayed");
        }
    }

    /// Report an application error on `channel` with its user-facing text
    pub fn report_error(&self, channel: FailureChannel, err: &UploaderError) {
        let detail = format!("{}\n\n{err:?}", get_user_friendly_error(err));
        self.report(channel, &detail);
    }

    /// Run `f` on the current thread, reporting an error or panic on `channel`.
    ///
    /// Returns the value on success, `None` if a failure was reported.
    pub fn run_guarded<T, E, F>(&self, channel: FailureChannel, f: F) -> Option<T>
    where
        E: fmt::Debug,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        GUARD_DEPTH.with(|depth| depth.set(depth.get() - 1));

        match outcome {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.report(channel, &format!("{e:?}"));
                None
            }
            Err(payload) => {
                let detail = CAPTURED_PANIC
                    .with(|slot| slot.borrow_mut().take())
                    .unwrap_or_else(|| payload_message(payload.as_ref()));
                self.report(channel, &detail);
                None
            }
        }
    }

    /// Run `f` on a new background thread, reporting failures on the task channel
    pub fn spawn_task<T, E, F>(self: &Arc<Self>, name: &str, f: F) -> Option<JoinHandle<Option<T>>>
    where
        T: Send + 'static,
        E: fmt::Debug,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    {
        let reporter = Arc::clone(self);
        match thread::Builder::new()
            .name(name.to_string())
            .spawn(move || reporter.run_guarded(FailureChannel::Task, f))
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.report(FailureChannel::Task, &format!("Failed to spawn task '{name}': {e}"));
                None
            }
        }
    }
}

impl fmt::Debug for ExceptionReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionReporter").finish_non_exhaustive()
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn describe_panic(info: &PanicHookInfo<'_>) -> String {
    let thread = thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_default();
    let backtrace = std::backtrace::Backtrace::capture();

    format!(
        "panic on thread '{thread_name}' at {location}: {}\n\n{backtrace}",
        payload_message(info.payload())
    )
}
