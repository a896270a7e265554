//! Recurring timer for the update check
//!
//! A dedicated thread waits on a stop channel with the tick interval as the
//! timeout. Each timeout fires the tick callback, which is expected to hand
//! the real work off to its own task so a slow check never delays the timer.
//! Dropping the scheduler stops the timer; ticks already running are not
//! waited for.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between update checks
pub const UPDATE_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Fires a callback on a fixed period until dropped
pub struct RecurringTimer {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RecurringTimer {
    /// Start firing `tick` every `interval`, first after one full interval
    pub fn start<F>(name: &str, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let timer_name = name.to_string();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            info!("Timer '{}' started with interval {:?}", timer_name, interval);
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("Timer '{}' tick", timer_name);
                        tick();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("Timer '{}' stopped", timer_name);
        })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the timer and wait for its thread to exit
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The thread may already be gone; either way it will exit
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Timer thread panicked");
            }
        }
    }
}

impl Drop for RecurringTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
