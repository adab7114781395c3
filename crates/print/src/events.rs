//! Listener registry for list lifecycle events.
//!
//! Dispatch takes a snapshot of the registered listeners before invoking
//! any callback, so a listener may add or remove listeners (itself
//! included) from inside a notification without affecting the in-progress
//! dispatch, and no lock is held across a callback.

use std::sync::Arc;

use hostlink_core::Error;
use parking_lot::Mutex;

use crate::object::PrintObject;

/// Receives list lifecycle notifications.
///
/// Callbacks fire on whichever thread runs the build loop: the caller's
/// thread for a synchronous open, the background thread for an
/// asynchronous one. Default implementations ignore every event.
pub trait PrintObjectListListener: Send + Sync {
    /// The list was opened and the build is starting.
    fn opened(&self) {}

    /// One object arrived and was appended to the list.
    fn object_added(&self, _object: &PrintObject) {}

    /// The build failed; the error is also stored for waiters.
    fn error_occurred(&self, _error: &Error) {}

    /// The build finished, successfully or not.
    fn completed(&self) {}

    /// The list was closed and its cache discarded.
    fn closed(&self) {}
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Mutex<Vec<Arc<dyn PrintObjectListListener>>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Arc<dyn PrintObjectListListener>) {
        self.listeners.lock().push(listener);
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn PrintObjectListListener>) {
        self.listeners
            .lock()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn snapshot(&self) -> Vec<Arc<dyn PrintObjectListListener>> {
        self.listeners.lock().clone()
    }

    pub(crate) fn fire_opened(&self) {
        for l in self.snapshot() {
            l.opened();
        }
    }

    pub(crate) fn fire_object_added(&self, object: &PrintObject) {
        for l in self.snapshot() {
            l.object_added(object);
        }
    }

    pub(crate) fn fire_error_occurred(&self, error: &Error) {
        for l in self.snapshot() {
            l.error_occurred(error);
        }
    }

    pub(crate) fn fire_completed(&self) {
        for l in self.snapshot() {
            l.completed();
        }
    }

    pub(crate) fn fire_closed(&self) {
        for l in self.snapshot() {
            l.closed();
        }
    }
}
