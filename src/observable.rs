//! Observable values with change notification
//!
//! The UI layer subscribes to an [`Observable`] and receives every new value over
//! an `mpsc` channel, the same way state updates flow to the GUI elsewhere in the
//! application. Setting a value equal to the current one is a no-op, so
//! repeated writes from overlapping background tasks stay idempotent.

use parking_lot::Mutex;
use std::sync::mpsc;

/// A value that notifies subscribers when it changes
#[derive(Debug)]
pub struct Observable<T> {
    inner: Mutex<ObservableInner<T>>,
}

#[derive(Debug)]
struct ObservableInner<T> {
    value: T,
    subscribers: Vec<mpsc::Sender<T>>,
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Create a new observable holding `value`
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(ObservableInner {
                value,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Store `value` and notify subscribers if it differs from the current value.
    ///
    /// Returns `true` when the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.value == value {
            return false;
        }
        inner.value = value.clone();
        // Drop subscribers whose receiver has gone away
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        true
    }

    /// Subscribe to future changes
    pub fn subscribe(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    /// Number of live subscribers (pruned lazily on the next notification)
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl<T: Clone + PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
