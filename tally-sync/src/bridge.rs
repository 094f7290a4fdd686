//! Notification bridge
//!
//! The controller reports what happened to the tracked job through this
//! trait; rendering (toasts, terminal lines) lives on the other side.

use tally_core::domain::job::JobHandle;

use crate::machine::TransitionEvent;

pub trait NotificationBridge: Send + Sync {
    /// Called exactly once per change of status value of the tracked job
    fn transition(&self, event: &TransitionEvent);

    /// Called when a new job replaced `previous` before it finished
    ///
    /// `previous` is still running remotely; only tracking stopped.
    fn retired(&self, previous: &JobHandle, replacement: &JobHandle) {
        let _ = (previous, replacement);
    }
}

/// Bridge that discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBridge;

impl NotificationBridge for NoopBridge {
    fn transition(&self, _event: &TransitionEvent) {}
}
