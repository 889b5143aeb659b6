//! Alert collaborator used to surface rejected edits.

use std::cell::RefCell;
use tracing::warn;

/// Receives user-facing validation messages.
pub trait Notifier {
    fn notify(&self, message: &str, title: &str);
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, message: &str, title: &str) {
        (**self).notify(message, title)
    }
}

/// Reports notifications as tracing warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, title: &str) {
        warn!(title, "{}", message);
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Keeps every notification in memory. Useful for scripted edits and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.borrow().is_empty()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, title: &str) {
        self.seen.borrow_mut().push(Notification {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
